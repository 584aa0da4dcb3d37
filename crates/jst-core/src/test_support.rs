//! In-process HTTP stub and archive builders shared by the unit tests

use crate::product::RegistryEndpoints;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Canned response served for one path
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            delay: None,
        }
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: "application/zip",
            body,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Minimal HTTP/1.1 server answering from a fixed route table
///
/// Routes are keyed by path, or by path and query for paged endpoints.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, StubResponse)>) -> Self {
        let routes: Arc<HashMap<String, StubResponse>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, resp)| (path.to_string(), resp))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_hits = hits.clone();
        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let hits = server_hits.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        request.extend_from_slice(&chunk[..n]);
                        if request.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let head = String::from_utf8_lossy(&request);
                    let target = head.split_whitespace().nth(1).unwrap_or("/");
                    let path = target.split('?').next().unwrap_or("/").to_string();
                    hits.lock().unwrap().push(path.clone());

                    // An exact `path?query` route wins over the bare path
                    let response = routes
                        .get(target)
                        .or_else(|| routes.get(&path))
                        .cloned()
                        .unwrap_or_else(|| StubResponse::json(404, r#"{"message":"Not Found"}"#));
                    if let Some(delay) = response.delay {
                        tokio::time::sleep(delay).await;
                    }

                    let header = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        response.status,
                        response.content_type,
                        response.body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&response.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, hits, handle }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    /// Endpoints pointing both the API and the archive host at this server
    pub fn endpoints(&self) -> RegistryEndpoints {
        RegistryEndpoints::new(self.url(), self.url())
    }

    /// Paths requested so far, in arrival order
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Build a zip archive from `(path, contents)` pairs; paths ending in `/` become directories
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (path, contents) in entries {
            if path.ends_with('/') {
                zip.add_directory(*path, options).unwrap();
            } else {
                zip.start_file(*path, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }
    buffer
}

/// The archive layout the forge produces for a module release
pub fn module_archive(wrapper: &str) -> Vec<u8> {
    let apps_py = "from django.apps import AppConfig\n\n\nclass ModuleConfig(AppConfig):\n    name = \"{{module_name}}\"\n";
    let dir = format!("{}/", wrapper);
    let text = format!("{}/a.txt", wrapper);
    let apps = format!("{}/apps.py", wrapper);
    let models = format!("{}/models/", wrapper);
    let models_init = format!("{}/models/__init__.py", wrapper);
    zip_bytes(&[
        (dir.as_str(), ""),
        (text.as_str(), "hello"),
        (apps.as_str(), apps_py),
        (models.as_str(), ""),
        (models_init.as_str(), ""),
    ])
}
