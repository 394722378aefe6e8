//! Directory containers.
//!
//! Gateways and pinning tools often wrap an uploaded object in a directory
//! listing. A container is a small JSON document:
//!
//! ```json
//! {"type":"directory","entries":[{"name":"data.json","pointer":"<hex>"}]}
//! ```
//!
//! Reads unwrap a container to the member named [`DEFAULT_MEMBER`], or to the
//! only `.json` member when the conventional name is absent.

use serde::{Deserialize, Serialize};
use tether_core::ContentPointer;

use crate::error::{Result, StoreError};

/// The conventional member name for wrapped documents.
pub const DEFAULT_MEMBER: &str = "data.json";

const DIRECTORY_TYPE: &str = "directory";

/// One named member of a directory container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub pointer: ContentPointer,
}

/// A directory container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(rename = "type")]
    pub kind: String,
    pub entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// A directory holding a single member.
    pub fn single(name: impl Into<String>, pointer: ContentPointer) -> Self {
        Self {
            kind: DIRECTORY_TYPE.to_string(),
            entries: vec![DirectoryEntry {
                name: name.into(),
                pointer,
            }],
        }
    }

    /// Try to interpret stored bytes as a container.
    ///
    /// Returns `None` for anything that is not a well-formed directory
    /// listing, in which case the bytes are the object itself.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first != b'{' {
            return None;
        }
        let dir: Directory = serde_json::from_slice(bytes).ok()?;
        (dir.kind == DIRECTORY_TYPE).then_some(dir)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Pick the member a read should resolve to.
    ///
    /// Prefers [`DEFAULT_MEMBER`], then the single `.json` entry. No JSON
    /// member is `NotFound`; several candidates is `InvalidData`.
    pub fn select_member(&self) -> Result<&DirectoryEntry> {
        if let Some(entry) = self.entries.iter().find(|e| e.name == DEFAULT_MEMBER) {
            return Ok(entry);
        }

        let mut json_members = self.entries.iter().filter(|e| e.name.ends_with(".json"));
        match (json_members.next(), json_members.next()) {
            (Some(entry), None) => Ok(entry),
            (None, _) => Err(StoreError::NotFound(format!(
                "directory has no {} member and no JSON member",
                DEFAULT_MEMBER
            ))),
            (Some(_), Some(_)) => Err(StoreError::InvalidData(format!(
                "directory has no {} member and several JSON members",
                DEFAULT_MEMBER
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, body: &[u8]) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            pointer: ContentPointer::of(body),
        }
    }

    #[test]
    fn test_parse_directory() {
        let dir = Directory::single(DEFAULT_MEMBER, ContentPointer::of(b"x"));
        let bytes = dir.to_json().unwrap();
        assert_eq!(Directory::parse(&bytes), Some(dir));
    }

    #[test]
    fn test_plain_json_is_not_a_directory() {
        assert!(Directory::parse(br#"{"title":"Survey"}"#).is_none());
        assert!(Directory::parse(br#"{"type":"form","entries":[]}"#).is_none());
        assert!(Directory::parse(b"not json at all").is_none());
        assert!(Directory::parse(b"").is_none());
    }

    #[test]
    fn test_prefers_conventional_member() {
        let dir = Directory {
            kind: DIRECTORY_TYPE.into(),
            entries: vec![entry("other.json", b"a"), entry(DEFAULT_MEMBER, b"b")],
        };
        assert_eq!(dir.select_member().unwrap().name, DEFAULT_MEMBER);
    }

    #[test]
    fn test_falls_back_to_single_json_member() {
        let dir = Directory {
            kind: DIRECTORY_TYPE.into(),
            entries: vec![entry("readme.txt", b"a"), entry("form.json", b"b")],
        };
        assert_eq!(dir.select_member().unwrap().name, "form.json");
    }

    #[test]
    fn test_no_json_member_is_not_found() {
        let dir = Directory {
            kind: DIRECTORY_TYPE.into(),
            entries: vec![entry("readme.txt", b"a")],
        };
        assert!(dir.select_member().unwrap_err().is_not_found());
    }

    #[test]
    fn test_ambiguous_json_members_rejected() {
        let dir = Directory {
            kind: DIRECTORY_TYPE.into(),
            entries: vec![entry("a.json", b"a"), entry("b.json", b"b")],
        };
        assert!(matches!(
            dir.select_member(),
            Err(StoreError::InvalidData(_))
        ));
    }
}
