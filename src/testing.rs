//! Scripted stand-ins for the model and resolver seams.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration};

use crate::llm::{
    GeneratedImage, GenerationRequest, GenerationResponse, ImageGenerator, ImageRequest, Source,
    TextGenerator,
};
use crate::normalize::NormalizedUrl;
use crate::resolve::client::WebClient;
use crate::resolve::{ContentOrigin, ContentResolver};

pub enum Reply {
    Text(String),
    Grounded(String, Vec<Source>),
    Fail,
    Hang,
}

pub fn text(reply: &str) -> Reply {
    Reply::Text(reply.to_string())
}

pub fn source(uri: &str, title: &str) -> Source {
    Source {
        uri: uri.to_string(),
        title: title.to_string(),
    }
}

pub fn structured(long: &str, short: &str) -> String {
    format!("FULL POST:\n{}\n---\nSHORT POST:\n{}", long, short)
}

pub struct FakeTextGenerator {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    web_search: bool,
}

impl FakeTextGenerator {
    pub fn new(web_search: bool, replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            web_search,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> GenerationRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(GenerationResponse {
                text,
                citations: Vec::new(),
            }),
            Some(Reply::Grounded(text, citations)) => Ok(GenerationResponse { text, citations }),
            Some(Reply::Fail) => Err(anyhow!("429 Too Many Requests")),
            Some(Reply::Hang) => {
                sleep(Duration::from_secs(3600)).await;
                Err(anyhow!("hung call finished"))
            }
            None => Err(anyhow!("no scripted reply left")),
        }
    }

    fn supports_web_search(&self) -> bool {
        self.web_search
    }
}

pub struct FakeImageGenerator {
    bytes: Option<Vec<u8>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeImageGenerator {
    pub fn returning(bytes: &[u8]) -> Self {
        Self {
            bytes: Some(bytes.to_vec()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            bytes: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match &self.bytes {
            Some(bytes) => Ok(GeneratedImage {
                mime_type: request.output_mime_type.clone(),
                bytes: bytes.clone(),
            }),
            None => Err(anyhow!("RESOURCE_EXHAUSTED: quota exceeded")),
        }
    }
}

/// Handles every URL and answers with a fixed excerpt.
pub struct StaticResolver {
    excerpt: Option<String>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(excerpt: Option<&str>) -> Self {
        Self {
            excerpt: excerpt.map(str::to_string),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentResolver for StaticResolver {
    fn name(&self) -> String {
        "static".to_string()
    }

    fn origin(&self, target: &NormalizedUrl) -> ContentOrigin {
        ContentOrigin::ProxyScrape(target.hostname.clone())
    }

    fn handles(&self, _target: &NormalizedUrl) -> bool {
        true
    }

    async fn resolve(&self, _target: &NormalizedUrl) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.excerpt.clone())
    }
}

#[async_trait]
impl<T: ContentResolver> ContentResolver for Arc<T> {
    fn name(&self) -> String {
        self.as_ref().name()
    }

    fn origin(&self, target: &NormalizedUrl) -> ContentOrigin {
        self.as_ref().origin(target)
    }

    fn handles(&self, target: &NormalizedUrl) -> bool {
        self.as_ref().handles(target)
    }

    async fn resolve(&self, target: &NormalizedUrl) -> Result<Option<String>> {
        self.as_ref().resolve(target).await
    }
}

/// A resolver client with no relay, for talking to [`StubServer`].
pub fn direct_web_client() -> WebClient {
    WebClient::new(None, Duration::from_secs(5)).unwrap()
}

pub struct StubRoute {
    prefix: &'static str,
    status: u16,
    body: String,
}

/// Answers requests whose path and query start with `prefix`.
pub fn route(prefix: &'static str, status: u16, body: impl Into<String>) -> StubRoute {
    StubRoute {
        prefix,
        status,
        body: body.into(),
    }
}

#[derive(Debug, Clone)]
pub struct StubRequest {
    /// Path and query from the request line.
    pub target: String,
    /// Request line and headers, as received.
    pub head: String,
}

/// HTTP/1.1 server on a random localhost port. The first matching route
/// answers; anything else gets a 404. Every connection is closed after one
/// response.
pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    pub async fn start(routes: Vec<StubRoute>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    let (status, body) = routes
                        .iter()
                        .find(|r| request.target.starts_with(r.prefix))
                        .map(|r| (r.status, r.body.clone()))
                        .unwrap_or((404, "{}".to_string()));
                    log.lock().unwrap().push(request);

                    let reason = if status < 400 { "OK" } else { "Error" };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.target).collect()
    }
}

async fn read_request(stream: &mut TcpStream) -> StubRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 2048];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.unwrap_or(0);
        if read == 0 {
            break buffer.len();
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.unwrap_or(0);
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    StubRequest { target, head }
}
