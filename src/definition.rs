use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

use crate::content::{Content, MemoryContent};
use crate::error::{CompositionError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PRIORITY: i32 = 0;

/// Hook invoked when loading a definition fails.
///
/// Returning a recovery body turns the failure into a successful, synthetic
/// content; returning `None` marks the definition as failed.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, fd: &FetchDefinition, err: &CompositionError) -> Option<Bytes>;
}

/// The stock handler: no recovery, failures propagate per the required flag.
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, _fd: &FetchDefinition, _err: &CompositionError) -> Option<Bytes> {
        None
    }
}

/// Transform applied to a parsed content right after loading.
pub trait ResponseProcessor: Send + Sync {
    fn process(&self, content: &mut MemoryContent) -> Result<()>;
}

/// Immutable description of one upstream request plus compose-time metadata.
///
/// Two definitions are equal iff their URLs are equal; the URL is the
/// deduplication key of the fetcher.
#[derive(Clone)]
pub struct FetchDefinition {
    url: String,
    method: Method,
    header: HeaderMap,
    body: Option<Bytes>,
    timeout: Duration,
    required: bool,
    priority: i32,
    err_handler: Arc<dyn ErrorHandler>,
    resp_proc: Option<Arc<dyn ResponseProcessor>>,
}

impl FetchDefinition {
    pub fn new(url: impl Into<String>) -> Self {
        FetchDefinition {
            url: url.into(),
            method: Method::GET,
            header: HeaderMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            required: true,
            priority: DEFAULT_PRIORITY,
            err_handler: Arc::new(DefaultErrorHandler),
            resp_proc: None,
        }
    }

    /// Derives a definition from an incoming caller request: the caller's
    /// path and query are joined onto the upstream base, method and body are
    /// copied verbatim, and only allowlisted headers pass through.
    pub fn from_request(
        base_url: &str,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            CompositionError::Dependency(format!("invalid upstream base url {base_url}: {e}"))
        })?;
        let mut target = base.join(path).map_err(|e| {
            CompositionError::Dependency(format!("cannot join {path} onto {base_url}: {e}"))
        })?;
        target.set_query(query);

        let mut fd = FetchDefinition::new(target.as_str().to_string())
            .with_method(method)
            .with_headers(copy_forwardable_headers(headers));
        fd.body = body;
        Ok(fd)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, header: HeaderMap) -> Self {
        self.header = header;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.err_handler = handler;
        self
    }

    pub fn with_response_processor(mut self, proc: Arc<dyn ResponseProcessor>) -> Self {
        self.resp_proc = Some(proc);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn error_handler(&self) -> &dyn ErrorHandler {
        self.err_handler.as_ref()
    }

    pub fn response_processor(&self) -> Option<&dyn ResponseProcessor> {
        self.resp_proc.as_deref()
    }
}

impl fmt::Debug for FetchDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchDefinition")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .field("required", &self.required)
            .field("priority", &self.priority)
            .finish()
    }
}

impl PartialEq for FetchDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for FetchDefinition {}

impl Hash for FetchDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Headers copied from the caller to the upstream: `Cookie`, `Content-Type`
/// and everything in the `X-` namespace. Hop-by-hop and transport headers
/// (`Accept-Encoding`, `Connection`, `Host`, `Content-Length`) never pass.
fn copy_forwardable_headers(src: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in src {
        let n = name.as_str();
        if n == "cookie" || n == "content-type" || n.starts_with("x-") {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Outcome of one fetch job.
pub struct FetchResult {
    pub def: FetchDefinition,
    pub content: Option<Arc<dyn Content>>,
    pub err: Option<CompositionError>,
    pub completed_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn success(def: FetchDefinition, content: Arc<dyn Content>) -> Self {
        FetchResult {
            def,
            content: Some(content),
            err: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(def: FetchDefinition, err: CompositionError) -> Self {
        FetchResult {
            def,
            content: None,
            err: Some(err),
            completed_at: Utc::now(),
        }
    }
}
