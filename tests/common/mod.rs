// Minimal HTTP/1.1 server for integration tests. One response per
// connection, always followed by `Connection: close`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub query: HashMap<String, String>,
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Status(u16),
    /// Announces `declared` bytes but sends `body` and closes.
    Lying { body: Vec<u8>, declared: u64 },
    /// No `Content-Length`; the body ends when the connection closes.
    Unsized(Vec<u8>),
    /// Sends headers and `prefix`, then goes silent.
    Stall { prefix: Vec<u8>, declared: u64 },
}

type Handler = dyn Fn(&Request) -> Reply + Send + Sync;

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, handler, log).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

async fn serve(
    stream: TcpStream,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Request>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let url = reqwest::Url::parse(&format!("http://localhost{target}")).unwrap();
    let request = Request {
        path: url.path().to_string(),
        query: url.query_pairs().into_owned().collect(),
        headers,
    };
    log.lock().unwrap().push(request.clone());

    let reply = handler(&request);
    let mut stream = reader.into_inner();

    match reply {
        Reply::Bytes(body) => write_response(&mut stream, 200, Some(body.len() as u64), &body).await?,
        Reply::Json(value) => {
            let body = serde_json::to_vec(&value).unwrap();
            write_response(&mut stream, 200, Some(body.len() as u64), &body).await?
        }
        Reply::Status(code) => write_response(&mut stream, code, Some(0), &[]).await?,
        Reply::Lying { body, declared } => {
            write_response(&mut stream, 200, Some(declared), &body).await?
        }
        Reply::Unsized(body) => write_response(&mut stream, 200, None, &body).await?,
        Reply::Stall { prefix, declared } => {
            write_response(&mut stream, 200, Some(declared), &prefix).await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    stream.shutdown().await
}

async fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_length: Option<u64>,
    body: &[u8],
) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {status} X\r\nConnection: close\r\n");
    if let Some(len) = content_length {
        head.push_str(&format!("Content-Length: {len}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await
}

/// Client that never goes through a system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Zip archive bytes holding `entries`.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}
