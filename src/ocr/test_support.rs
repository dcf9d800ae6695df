//! Local HTTP server for exercising the reqwest clients in tests

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Request as seen by the server
#[derive(Debug)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name)?.to_str().ok().map(str::to_string)
    }
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: Bytes,
    recorder: Arc<Mutex<Option<oneshot::Sender<Captured>>>>,
}

async fn record(State(reply): State<Reply>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> (StatusCode, Bytes) {
    if let Some(tx) = reply.recorder.lock().unwrap().take() {
        let _ = tx.send(Captured {
            method,
            path: uri.path().to_string(),
            headers,
            body: body.to_vec(),
        });
    }
    (reply.status, reply.body)
}

/// Answer every request with `status` and `body`; the receiver yields the first request
pub async fn serve_once(status: StatusCode, body: Vec<u8>) -> (String, oneshot::Receiver<Captured>) {
    let (tx, rx) = oneshot::channel();
    let reply = Reply {
        status,
        body: Bytes::from(body),
        recorder: Arc::new(Mutex::new(Some(tx))),
    };
    let router = Router::new().fallback(record).with_state(reply);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (format!("http://{}/", addr), rx)
}

/// An address nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}
