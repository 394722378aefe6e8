//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tether_core::{Address, ContentPointer, Identity, Keypair, Revision, RevisionBuilder};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate an identity backed by a real keypair.
pub fn identity() -> impl Strategy<Value = Identity> {
    keypair().prop_map(|kp| kp.identity())
}

pub fn content_pointer() -> impl Strategy<Value = ContentPointer> {
    any::<[u8; 32]>().prop_map(ContentPointer::from_bytes)
}

/// Generate a non-zero address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>()
        .prop_filter("non-zero address", |b| b.iter().any(|x| *x != 0))
        .prop_map(Address::from_bytes)
}

/// Generate a valid alias: lowercase, 3 to 63 characters.
pub fn alias() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{1,61}[a-z0-9]".prop_map(String::from)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=1_900_000_000_000i64
}

/// Generate document bytes of at most `max_len`.
pub fn document(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating a revision.
#[derive(Debug, Clone)]
pub struct RevisionParams {
    pub seed: [u8; 32],
    pub sequence: u64,
    pub value: ContentPointer,
    pub timestamp: i64,
}

impl Arbitrary for RevisionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<[u8; 32]>(), 0u64..=10_000u64, content_pointer(), timestamp())
            .prop_map(|(seed, sequence, value, timestamp)| RevisionParams {
                seed,
                sequence,
                value,
                timestamp,
            })
            .boxed()
    }
}

/// Sign the revision described by `params`.
pub fn revision_from_params(params: &RevisionParams) -> Revision {
    let keypair = Keypair::from_seed(&params.seed);
    match RevisionBuilder::new(params.sequence, params.value)
        .timestamp(params.timestamp)
        .sign(&keypair)
    {
        Ok(revision) => revision,
        Err(e) => panic!("revision params failed to encode: {}", e),
    }
}
