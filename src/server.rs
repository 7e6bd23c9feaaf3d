use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{info, warn};

use crate::auth::InteractionVerifier;
use crate::client::metadata::RequestMetadata;
use crate::config::{ServerConfig, ServiceConfig};
use crate::delivery::{self, interactions};
use crate::delivery::interactions::{Interaction, InteractionQueue};
use crate::dispatch::Dispatcher;
use crate::error::{CommandError, DeliveryError, RelayError};
use crate::expiry::SystemClock;
use crate::reply::Theme;

const QUEUE_CAPACITY: usize = 64;

/// The platform drops interactions left unanswered for 3 seconds.
pub const INTERACTION_DEADLINE: Duration = Duration::from_millis(2500);

/// Shared state for the interactions endpoint.
pub struct Endpoint {
    pub queue: InteractionQueue,
    pub verifier: Option<InteractionVerifier>,
    /// Used for the reply sent when the relay misses `deadline`.
    pub theme: Theme,
    pub deadline: Duration,
}

/// Starts the interactions endpoint and the relay loop behind it.
///
/// # Returns
///
/// A `Result` which is `Ok` if the server runs successfully, or an `Err` if an error occurs.
///
/// # Errors
///
/// This function will return an error if the configuration is invalid (including a key service
/// timeout that does not fit within `INTERACTION_DEADLINE`), if the server fails to
/// bind to the specified address and port, or if there is an error while running the server.
pub async fn start_server(service: &ServiceConfig, server: &ServerConfig) -> Result<(), RelayError> {
    service.check_timeout_within(INTERACTION_DEADLINE)?;
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(service.key_service()?),
        Arc::new(SystemClock),
        service.theme(),
    ));
    let verifier = server.verifier()?;
    if verifier.is_none() {
        warn!("DISCORD_PUBLIC_KEY is not set; interaction signatures will not be checked");
    }

    let (queue, delivery) = interactions::queue(QUEUE_CAPACITY);
    tokio::spawn(delivery::run(delivery, dispatcher));

    let endpoint = Arc::new(Endpoint {
        queue,
        verifier,
        theme: service.theme(),
        deadline: INTERACTION_DEADLINE,
    });
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let endpoint = Arc::clone(&endpoint);
        let remote_addr = conn.remote_addr().to_string();

        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                handle_interaction(req, Arc::clone(&endpoint), remote_addr.clone())
            }))
        }
    });

    let addr = SocketAddr::new(server.address, server.port);
    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!("Interactions endpoint listening on http://{}", addr);

    server.await?;
    Ok(())
}

/// Handles one request to the interactions endpoint.
///
/// # Arguments
///
/// * `req` - The incoming HTTP request.
/// * `endpoint` - The queue feeding the relay loop and the optional signature verifier.
/// * `addr` - Peer address.
///
/// # Returns
///
/// * `Result<Response<Body>, hyper::Error>` - The interaction response, or an error status.
pub async fn handle_interaction(
    req: Request<Body>,
    endpoint: Arc<Endpoint>,
    addr: String,
) -> Result<Response<Body>, hyper::Error> {
    let metadata = RequestMetadata::from_request(req, addr).await?;

    if metadata.method != Method::POST {
        return Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    if let Some(verifier) = &endpoint.verifier {
        let verified = match (&metadata.signature, &metadata.timestamp) {
            (Some(signature), Some(timestamp)) => verifier.verify(timestamp, &metadata.body, signature),
            _ => false,
        };
        if !verified {
            warn!(
                "[{}]({}) Rejected interaction with a bad signature on {}",
                metadata.ip, metadata.client_ip, metadata.path
            );
            return Ok(plain(StatusCode::UNAUTHORIZED, "Invalid request signature"));
        }
    }

    let interaction: Interaction = match serde_json::from_slice(&metadata.body) {
        Ok(interaction) => interaction,
        Err(err) => {
            warn!("[{}] Malformed interaction: {}", metadata.client_ip, err);
            return Ok(plain(StatusCode::BAD_REQUEST, "Malformed interaction"));
        }
    };

    match interaction.kind {
        interactions::INTERACTION_PING => Ok(json(&interactions::pong())),
        interactions::INTERACTION_APPLICATION_COMMAND => {
            let command = interaction
                .data
                .as_ref()
                .ok_or_else(|| CommandError::UnknownCommand(String::new()))
                .and_then(interactions::parse_command);

            let receiver = match endpoint.queue.submit(metadata.client_ip.clone(), command).await {
                Ok(receiver) => receiver,
                Err(_) => return Ok(plain(StatusCode::SERVICE_UNAVAILABLE, "Relay is not running")),
            };
            match tokio::time::timeout(endpoint.deadline, receiver).await {
                Ok(Ok(reply)) => Ok(json(&interactions::render_response(&reply))),
                Ok(Err(_)) => Ok(plain(StatusCode::SERVICE_UNAVAILABLE, "Relay is not running")),
                Err(_) => {
                    let err = DeliveryError::Deadline(endpoint.deadline.as_millis());
                    warn!("[{}] {}", metadata.client_ip, err);
                    Ok(json(&interactions::render_response(&endpoint.theme.error(&err))))
                }
            }
        }
        _ => Ok(plain(StatusCode::BAD_REQUEST, "Unsupported interaction type")),
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

fn json(value: &serde_json::Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    response
        .headers_mut()
        .insert(hyper::header::CONTENT_TYPE, hyper::header::HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::{json, Value};

    use crate::adapters::keyauth::KeyAuthV1;
    use crate::adapters::{KeyRecord, KeyService, ValidationResult};
    use crate::client::metadata::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use crate::error::RemoteError;
    use crate::expiry::FixedClock;
    use crate::test_utils::upstream;

    struct OneKeyService;

    #[async_trait]
    impl KeyService for OneKeyService {
        async fn validate(&self, key: &str) -> Result<ValidationResult, RemoteError> {
            Ok(ValidationResult {
                valid: key == "GOOD",
                expiry: Some("2030-01-01".to_string()),
                reason: Some("Unknown key".to_string()),
            })
        }

        async fn add_key(&self, _key: &str, _expiry: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn revoke_key(&self, _key: &str) -> Result<(), RemoteError> {
            Err(RemoteError::Status { status: 500, body: "down".to_string() })
        }

        async fn list_keys(&self) -> Result<Vec<KeyRecord>, RemoteError> {
            Ok(vec![KeyRecord { key: "GOOD".to_string(), expiry: "2030-01-01".to_string() }])
        }
    }

    fn endpoint(verifier: Option<InteractionVerifier>) -> Arc<Endpoint> {
        endpoint_for(Arc::new(OneKeyService), verifier, INTERACTION_DEADLINE)
    }

    fn endpoint_for(
        service: Arc<dyn KeyService>,
        verifier: Option<InteractionVerifier>,
        deadline: Duration,
    ) -> Arc<Endpoint> {
        let dispatcher = Arc::new(Dispatcher::new(
            service,
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
            Theme::default(),
        ));
        let (queue, delivery) = interactions::queue(8);
        tokio::spawn(delivery::run(delivery, dispatcher));
        Arc::new(Endpoint { queue, verifier, theme: Theme::default(), deadline })
    }

    fn post(body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/interactions")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn command(sub: &str, options: Value) -> Value {
        json!({
            "type": 2,
            "data": { "name": "key", "options": [{ "name": sub, "type": 1, "options": options }] },
        })
    }

    async fn call(endpoint: Arc<Endpoint>, req: Request<Body>) -> (StatusCode, String) {
        let response = handle_interaction(req, endpoint, "127.0.0.1:40000".to_string()).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_ping() {
        let (status, body) = call(endpoint(None), post(&json!({ "type": 1 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn test_validate_command_round_trip() {
        let req = post(&command("validate", json!([{ "name": "key", "type": 3, "value": "GOOD" }])));
        let (status, body) = call(endpoint(None), req).await;
        let response: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["type"], 4);
        assert_eq!(response["data"]["flags"], 64);
        assert_eq!(response["data"]["embeds"][0]["title"], "✅ Key is Valid");
        assert_eq!(
            response["data"]["embeds"][0]["description"],
            "Key: `GOOD`\nExpires: `2030-01-01`"
        );
    }

    #[tokio::test]
    async fn test_remote_failure_still_replies() {
        let req = post(&command("revoke", json!([{ "name": "key", "type": 3, "value": "GOOD" }])));
        let (status, body) = call(endpoint(None), req).await;
        let response: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["data"]["embeds"][0]["title"], "❌ Error");
        assert_eq!(
            response["data"]["embeds"][0]["description"],
            "```Key service returned 500: down```"
        );
    }

    #[tokio::test]
    async fn test_missing_option_replies_with_error() {
        let (status, body) = call(endpoint(None), post(&command("add", json!([])))).await;
        let response: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["data"]["embeds"][0]["title"], "❌ Error");
    }

    #[tokio::test]
    async fn test_slow_key_service_answered_before_deadline() {
        let (base_url, _) = upstream(200, r#"{"valid": true}"#, Duration::from_secs(4)).await;
        let service = KeyAuthV1::new(&base_url, Duration::from_secs(5)).unwrap();
        let endpoint = endpoint_for(Arc::new(service), None, Duration::from_millis(300));

        let started = tokio::time::Instant::now();
        let req = post(&command("validate", json!([{ "name": "key", "type": 3, "value": "GOOD" }])));
        let (status, body) = call(endpoint, req).await;
        let elapsed = started.elapsed();
        let response: Value = serde_json::from_str(&body).unwrap();

        assert!(elapsed < Duration::from_secs(1), "answered after {:?}", elapsed);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["type"], 4);
        assert_eq!(response["data"]["flags"], 64);
        assert_eq!(response["data"]["embeds"][0]["title"], "❌ Error");
        assert_eq!(
            response["data"]["embeds"][0]["description"],
            "```Key service did not answer within 300ms```"
        );
    }

    #[test]
    fn test_deadline_within_platform_limit() {
        assert!(INTERACTION_DEADLINE < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_start_server_rejects_timeout_past_deadline() {
        let service = ServiceConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            api_timeout_secs: 3,
            thumbnail_url: None,
            footer: "Relay".to_string(),
            color: 0,
            ephemeral: true,
        };
        let server = ServerConfig {
            address: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 0,
            public_key: None,
        };
        assert!(matches!(start_server(&service, &server).await, Err(RelayError::Config(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_requests() {
        let get = Request::builder().method(Method::GET).uri("/").body(Body::empty()).unwrap();
        assert_eq!(call(endpoint(None), get).await.0, StatusCode::METHOD_NOT_ALLOWED);

        let garbage = Request::builder().method(Method::POST).uri("/").body(Body::from("{")).unwrap();
        assert_eq!(call(endpoint(None), garbage).await.0, StatusCode::BAD_REQUEST);

        let autocomplete = post(&json!({ "type": 4 }));
        assert_eq!(call(endpoint(None), autocomplete).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signature_checked_when_configured() {
        let signing_key = SigningKey::from_bytes(&[3u8; 32]);
        let verifier = || {
            Some(InteractionVerifier::from_hex(&hex::encode(signing_key.verifying_key().to_bytes())).unwrap())
        };

        let body = json!({ "type": 1 }).to_string();
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(signing_key.sign(&message).to_bytes());

        let signed = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(SIGNATURE_HEADER, signature.as_str())
            .header(TIMESTAMP_HEADER, timestamp)
            .body(Body::from(body.clone()))
            .unwrap();
        assert_eq!(call(endpoint(verifier()), signed).await.0, StatusCode::OK);

        let unsigned = Request::builder().method(Method::POST).uri("/").body(Body::from(body)).unwrap();
        assert_eq!(call(endpoint(verifier()), unsigned).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stopped_relay_is_unavailable() {
        let (queue, delivery) = interactions::queue(1);
        drop(delivery);
        let endpoint = Arc::new(Endpoint {
            queue,
            verifier: None,
            theme: Theme::default(),
            deadline: INTERACTION_DEADLINE,
        });

        let (status, _) = call(endpoint, post(&command("list", json!([])))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
