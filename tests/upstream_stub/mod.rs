use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[allow(dead_code)]
pub const STUB_IMAGE_URL: &str = "https://images.stub.test/post.png";

#[derive(Debug, Clone)]
pub struct UpstreamStubConfig {
    /// Entries returned for every folder.
    pub articles_per_folder: usize,
    /// Completion requests answered with a 500.
    pub fail_completions: bool,
}

impl Default for UpstreamStubConfig {
    fn default() -> Self {
        Self {
            articles_per_folder: 2,
            fail_completions: false,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Serves the Feedly stream/entry endpoints and the OpenAI responses/images
/// endpoints from one local port.
pub struct UpstreamStub {
    pub feed_url: String,
    pub openai_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl UpstreamStub {
    pub fn spawn(config: UpstreamStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start upstream stub server");
        let addr = server.server_addr();
        let feed_url = format!("http://{addr}");
        let openai_url = format!("http://{addr}/v1");

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&recorded);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let mut completions = 0usize;
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_owned();
                let method = request.method().to_string();
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_owned());
                log.lock().expect("lock recorded").push(Recorded {
                    method: method.clone(),
                    path: path.clone(),
                    authorization,
                    body: body.clone(),
                });

                let (status, response_body) = match (method.as_str(), path.as_str()) {
                    ("GET", "/v3/streams/ids") => {
                        let ids = (0..config.articles_per_folder)
                            .map(|i| format!("entry-{i}"))
                            .collect::<Vec<_>>();
                        (200, serde_json::json!({ "ids": ids }))
                    }
                    ("POST", "/v3/entries/.mget") => {
                        let ids: Vec<String> = serde_json::from_str(&body).unwrap_or_default();
                        let entries = ids
                            .iter()
                            .map(|id| {
                                serde_json::json!({
                                    "originId": format!("https://news.stub.test/{id}"),
                                    "title": format!("Title {id}"),
                                    "summary": { "content": format!("Summary {id}") },
                                    "fullContent": format!("Body of {id}."),
                                })
                            })
                            .collect::<Vec<_>>();
                        (200, Value::Array(entries))
                    }
                    ("POST", "/v1/responses") if config.fail_completions => (
                        500,
                        serde_json::json!({ "error": { "message": "stub overloaded" } }),
                    ),
                    ("POST", "/v1/responses") => {
                        completions += 1;
                        let text = format!("Completion {completions}. ");
                        (
                            200,
                            serde_json::json!({
                                "id": "resp_stub",
                                "object": "response",
                                "output": [{
                                    "type": "message",
                                    "role": "assistant",
                                    "content": [{ "type": "output_text", "text": text }]
                                }]
                            }),
                        )
                    }
                    ("POST", "/v1/images/generations") => (
                        200,
                        serde_json::json!({ "data": [{ "url": STUB_IMAGE_URL }] }),
                    ),
                    _ => (404, serde_json::json!({ "error": { "message": "not found" } })),
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            feed_url,
            openai_url,
            recorded,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().expect("lock recorded").clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.recorded().iter().filter(|r| r.path == path).count()
    }
}

impl Drop for UpstreamStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
