//! HTTP naming service client.
//!
//! - `PUT {endpoint}/names/{identity}` with a [`PublishRequest`] body
//! - `GET {endpoint}/names/{identity}` returns a [`ResolveResponse`]
//!
//! Status mapping: 404 on resolve is "unpublished", 409 is a stale sequence,
//! 429 is retried after backoff with jitter. A 409 on a retried publish is
//! checked against the resolved head, since an earlier attempt may have
//! landed. Requests are paced by a client-side [`RateLimiter`].

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use tether_core::{validate_revision, Identity, Revision, ValidationError};
use tracing::{debug, warn};

use crate::error::{NamingError, Result};
use crate::messages::{ErrorResponse, PublishRequest, ResolveResponse};
use crate::rate_limit::RateLimiter;
use crate::service::NamingService;

/// Configuration for [`HttpNamingService`].
#[derive(Debug, Clone)]
pub struct HttpNamingConfig {
    /// Naming service base URL.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each attempt, plus jitter.
    pub backoff_base: Duration,
    /// Requests allowed per `rate_window`.
    pub rate_limit: usize,
    pub rate_window: Duration,
}

impl Default for HttpNamingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8081".to_string(),
            timeout: Duration::from_secs(15),
            max_attempts: 4,
            backoff_base: Duration::from_millis(500),
            rate_limit: 30,
            rate_window: Duration::from_secs(10),
        }
    }
}

/// Naming service reached over HTTP.
#[derive(Debug)]
pub struct HttpNamingService {
    client: Client,
    config: HttpNamingConfig,
    limiter: RateLimiter,
}

/// What one HTTP exchange produced.
enum Attempt<T> {
    Done(T),
    Retry(NamingError),
}

impl HttpNamingService {
    pub fn new(config: HttpNamingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NamingError::Network(format!("failed to build HTTP client: {}", e)))?;
        let limiter = RateLimiter::new(config.rate_limit, config.rate_window);
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    fn name_url(&self, identity: &Identity) -> String {
        format!(
            "{}/names/{}",
            self.config.endpoint.trim_end_matches('/'),
            identity.to_hex()
        )
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 2);
        base + Duration::from_millis(jitter_ms)
    }

    /// Run `once` until it returns `Done` or attempts are exhausted.
    /// `once` receives the 1-based attempt number.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut once: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<Attempt<T>>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire().await;

            let error = match once(attempt).await? {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry(error) => error,
            };

            if attempt >= max_attempts {
                return Err(error);
            }
            let delay = self.backoff(attempt);
            warn!(
                operation = what,
                attempt,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "naming request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Turn transport failures, 429 and 5xx into errors; pass other responses through.
fn classify_send(
    result: std::result::Result<reqwest::Response, reqwest::Error>,
) -> std::result::Result<reqwest::Response, NamingError> {
    let response = result.map_err(NamingError::from)?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(NamingError::RateLimited);
    }
    if status.is_server_error() {
        return Err(NamingError::Http {
            status: status.as_u16(),
            message: "naming service error".into(),
        });
    }
    Ok(response)
}

async fn error_body(response: reqwest::Response) -> Option<ErrorResponse> {
    let bytes = response.bytes().await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[async_trait]
impl NamingService for HttpNamingService {
    async fn publish(&self, revision: &Revision) -> Result<()> {
        let url = self.name_url(revision.identity());
        let body = PublishRequest {
            revision: revision.clone(),
        };
        let attempted = revision.sequence();
        let (url, body) = (&url, &body);

        self.with_retry("publish", move |attempt| async move {
            let response = match classify_send(self.client.put(url).json(body).send().await) {
                Ok(r) => r,
                Err(e) if e.is_retryable() => return Ok(Attempt::Retry(e)),
                Err(e) => return Err(e),
            };

            let status = response.status();
            if status.is_success() {
                debug!(
                    identity = %revision.identity(),
                    sequence = attempted,
                    "published revision"
                );
                return Ok(Attempt::Done(()));
            }

            let detail = error_body(response).await;
            match status {
                StatusCode::CONFLICT => {
                    if attempt > 1 {
                        if let Ok(Some(head)) = self.resolve(revision.identity()).await {
                            if head == *revision {
                                debug!(
                                    identity = %revision.identity(),
                                    sequence = attempted,
                                    "revision already stored by an earlier attempt"
                                );
                                return Ok(Attempt::Done(()));
                            }
                        }
                    }
                    Err(NamingError::StaleRevision {
                        current: detail.and_then(|d| d.current_sequence).unwrap_or(attempted),
                        attempted,
                    })
                }
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(NamingError::InvalidRevision(ValidationError::StructuralError(
                        detail
                            .map(|d| d.message)
                            .unwrap_or_else(|| "rejected by naming service".into()),
                    )))
                }
                s => Err(NamingError::Http {
                    status: s.as_u16(),
                    message: detail.map(|d| d.message).unwrap_or_default(),
                }),
            }
        })
        .await
    }

    async fn resolve(&self, identity: &Identity) -> Result<Option<Revision>> {
        let url = self.name_url(identity);
        let url = &url;

        let revision = self
            .with_retry("resolve", move |_| async move {
                let response = match classify_send(self.client.get(url).send().await) {
                    Ok(r) => r,
                    Err(e) if e.is_retryable() => return Ok(Attempt::Retry(e)),
                    Err(e) => return Err(e),
                };

                match response.status() {
                    StatusCode::NOT_FOUND => Ok(Attempt::Done(None)),
                    s if s.is_success() => {
                        let bytes = response.bytes().await?;
                        let body: ResolveResponse = serde_json::from_slice(&bytes)?;
                        Ok(Attempt::Done(Some(body.revision)))
                    }
                    s => Err(NamingError::Http {
                        status: s.as_u16(),
                        message: error_body(response)
                            .await
                            .map(|d| d.message)
                            .unwrap_or_default(),
                    }),
                }
            })
            .await?;

        if let Some(revision) = &revision {
            if revision.identity() != identity {
                return Err(NamingError::InvalidRevision(
                    ValidationError::IdentityMismatch {
                        expected: identity.to_hex(),
                        got: revision.identity().to_hex(),
                    },
                ));
            }
            validate_revision(revision)?;
        }
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ContentPointer, Keypair, RevisionBuilder};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> HttpNamingService {
        HttpNamingService::new(HttpNamingConfig {
            endpoint: server.uri(),
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            rate_limit: 100,
            rate_window: Duration::from_secs(1),
        })
        .unwrap()
    }

    fn rev(kp: &Keypair, seq: u64) -> Revision {
        RevisionBuilder::new(seq, ContentPointer::of(b"doc"))
            .timestamp(1)
            .sign(kp)
            .unwrap()
    }

    fn name_path(identity: &Identity) -> String {
        format!("/names/{}", identity.to_hex())
    }

    #[tokio::test]
    async fn test_resolve_unpublished() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(service.resolve(&kp.identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_validates_revision() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        let good = rev(&kp, 2);
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(200).set_body_json(ResolveResponse {
                revision: good.clone(),
            }))
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert_eq!(service.resolve(&kp.identity()).await.unwrap(), Some(good));
    }

    #[tokio::test]
    async fn test_resolve_rejects_forged_revision() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        let mut forged = rev(&kp, 2);
        forged.header.value = ContentPointer::of(b"evil");
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(ResolveResponse { revision: forged }),
            )
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.resolve(&kp.identity()).await,
            Err(NamingError::InvalidRevision(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_foreign_identity() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        let other = Keypair::generate();
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(200).set_body_json(ResolveResponse {
                revision: rev(&other, 0),
            }))
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.resolve(&kp.identity()).await,
            Err(NamingError::InvalidRevision(ValidationError::IdentityMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_publish_conflict_is_stale() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(409).set_body_json(ErrorResponse {
                code: crate::messages::NamingErrorCode::StaleSequence,
                message: "behind".into(),
                current_sequence: Some(5),
            }))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.publish(&rev(&kp, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            NamingError::StaleRevision { current: 5, attempted: 3 }
        ));
    }

    #[tokio::test]
    async fn test_retried_publish_already_stored_succeeds() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        let sent = rev(&kp, 4);
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(200).set_body_json(ResolveResponse {
                revision: sent.clone(),
            }))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        service.publish(&sent).await.unwrap();
    }

    #[tokio::test]
    async fn test_retried_publish_lost_race_is_stale() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(200).set_body_json(ResolveResponse {
                revision: rev(&kp, 5),
            }))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.publish(&rev(&kp, 4)).await.unwrap_err();
        assert!(matches!(
            err,
            NamingError::StaleRevision { current: 4, attempted: 4 }
        ));
    }

    #[tokio::test]
    async fn test_first_attempt_conflict_skips_resolve() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(service.publish(&rev(&kp, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limited_then_succeeds() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let service = service_for(&server);
        service.publish(&rev(&kp, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limited_exhausts_attempts() {
        let server = MockServer::start().await;
        let kp = Keypair::generate();
        Mock::given(method("GET"))
            .and(path(name_path(&kp.identity())))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(matches!(
            service.resolve(&kp.identity()).await,
            Err(NamingError::RateLimited)
        ));
    }
}
