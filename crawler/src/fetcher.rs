use anyhow::{bail, Result};
use reqwest::{header, Client, Url};
use std::time::Duration;

/// Responses larger than this are treated as fetch failures.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A fetched response, classified by its Content-Type header.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        self.content_type.starts_with("text/html")
    }
}

/// The single seam between the crawl and the network. One concrete HTTP
/// implementation; tests drive the session with an in-memory fake.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> impl std::future::Future<Output = Result<FetchedPage>>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            bail!("http status {} for {}", resp.status(), url);
        }
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().await?;
        if bytes.len() > MAX_BODY_BYTES {
            bail!("response body too large: {} bytes from {}", bytes.len(), url);
        }
        let body = String::from_utf8_lossy(&bytes).to_string();
        Ok(FetchedPage { content_type, body })
    }
}
