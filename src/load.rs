use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::content::{Content, MemoryContent};
use crate::definition::FetchDefinition;
use crate::error::{CompositionError, Result};
use crate::parse;

/// Loads the content behind one fetch definition.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    /// Loads the content described by the definition. The implementation
    /// has to return within the definition's timeout.
    async fn load(&self, fd: &FetchDefinition) -> Result<Arc<dyn Content>>;
}

/// HTTP loader that parses upstream HTML responses into contents.
///
/// Non-HTML responses pass through as raw content. Relative definition URLs
/// resolve against the configured base.
pub struct HtmlContentLoader {
    client: Client,
    base_url: Option<Url>,
}

impl HtmlContentLoader {
    pub fn new(user_agent: &str) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(Policy::limited(8))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("http client construction");
        HtmlContentLoader {
            client,
            base_url: None,
        }
    }

    pub fn with_base(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn resolve(&self, url: &str) -> Result<Url> {
        match &self.base_url {
            Some(base) => base.join(url).map_err(|e| {
                CompositionError::Dependency(format!("cannot resolve {url} against {base}: {e}"))
            }),
            None => Url::parse(url)
                .map_err(|e| CompositionError::Dependency(format!("invalid url {url}: {e}"))),
        }
    }
}

#[async_trait]
impl ContentLoader for HtmlContentLoader {
    async fn load(&self, fd: &FetchDefinition) -> Result<Arc<dyn Content>> {
        let url = self.resolve(fd.url())?;

        let mut request = self
            .client
            .request(fd.method().clone(), url)
            .headers(fd.header().clone())
            .timeout(fd.timeout());
        if let Some(body) = fd.body() {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| CompositionError::fetch(fd.url(), e))?;

        let status = response.status();
        if !status.is_success() {
            // Drain so the connection can go back to the pool.
            let _ = response.bytes().await;
            return Err(CompositionError::HttpStatus {
                status: status.as_u16(),
                url: fd.url().to_string(),
            });
        }

        let http_header = response.headers().clone();
        let content_type = http_header
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response
            .bytes()
            .await
            .map_err(|e| CompositionError::fetch(fd.url(), e))?;

        if !content_type.is_empty() && !content_type.starts_with("text/html") {
            return Ok(Arc::new(MemoryContent::raw(fd.url(), body, http_header)));
        }

        let html = String::from_utf8_lossy(&body);
        let mut content = parse::parse_document(fd.url(), &html)?;
        content.set_http_header(http_header);
        if let Some(proc) = fd.response_processor() {
            proc.process(&mut content)?;
        }
        Ok(Arc::new(content))
    }
}
