//! Shared helpers for tests that need a live HTTP peer.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

/// A request as seen by the throwaway upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Starts an upstream on `127.0.0.1:0` that answers every request with `status` and `body`
/// after `delay`. Returns its base URL (with a trailing slash) and the requests it received.
pub async fn upstream(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&captured);

    let make_svc = make_service_fn(move |_conn| {
        let log = Arc::clone(&log);
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                let log = Arc::clone(&log);
                async move {
                    let method = req.method().to_string();
                    let path = req.uri().path().to_string();
                    let authorization = req
                        .headers()
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .map(String::from);
                    let bytes = hyper::body::to_bytes(req.into_body()).await?;
                    log.lock().unwrap().push(Captured {
                        method,
                        path,
                        authorization,
                        body: String::from_utf8_lossy(&bytes).to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    Ok::<_, hyper::Error>(
                        Response::builder()
                            .status(status)
                            .header("content-type", "application/json")
                            .body(Body::from(body))
                            .unwrap(),
                    )
                }
            }))
        }
    });

    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::bind(&addr).serve(make_svc);
    let base_url = format!("http://{}/", server.local_addr());
    tokio::spawn(server);
    (base_url, captured)
}
