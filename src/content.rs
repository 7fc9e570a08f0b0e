use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use crate::definition::FetchDefinition;
use crate::template::Fragment;

/// The abstraction over includable data.
///
/// Content is either parsed (head/body/tail fragments populated) or raw
/// (`reader()` returns the unparsed bytes), never both.
pub trait Content: Send + Sync {
    /// The URL this content was loaded from.
    fn url(&self) -> &str;

    /// Further definitions that must be fetched before merging.
    fn required_content(&self) -> Vec<FetchDefinition>;

    /// Data to merge into the global template context.
    fn meta(&self) -> &Map<String, Value>;

    /// Partial to insert into the html head.
    fn head(&self) -> Option<&dyn Fragment>;

    /// Named body partials. The empty-string key holds the default body.
    fn body(&self) -> &HashMap<String, Arc<dyn Fragment>>;

    /// Partial emitted at the end of the page, before `</body>`.
    fn tail(&self) -> Option<&dyn Fragment>;

    /// Attributes for the body element.
    fn body_attributes(&self) -> Option<&dyn Fragment>;

    /// Raw pass-through bytes, for content that was not parsed.
    fn reader(&self) -> Option<Bytes>;

    /// Response headers of the fetch.
    fn http_header(&self) -> &HeaderMap;
}

/// In-memory Content implementation produced by the parser.
#[derive(Default)]
pub struct MemoryContent {
    pub(crate) url: String,
    pub(crate) required_content: Vec<FetchDefinition>,
    pub(crate) meta: Map<String, Value>,
    pub(crate) head: Option<Arc<dyn Fragment>>,
    pub(crate) body: HashMap<String, Arc<dyn Fragment>>,
    pub(crate) tail: Option<Arc<dyn Fragment>>,
    pub(crate) body_attributes: Option<Arc<dyn Fragment>>,
    pub(crate) reader: Option<Bytes>,
    pub(crate) http_header: HeaderMap,
}

impl std::fmt::Debug for MemoryContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContent")
            .field("url", &self.url)
            .field("required_content", &self.required_content)
            .field("meta", &self.meta)
            .field("has_head", &self.head.is_some())
            .field("body_keys", &self.body.keys().collect::<Vec<_>>())
            .field("has_tail", &self.tail.is_some())
            .field("has_body_attributes", &self.body_attributes.is_some())
            .field("reader", &self.reader)
            .field("http_header", &self.http_header)
            .finish()
    }
}

impl MemoryContent {
    pub fn new(url: impl Into<String>) -> Self {
        MemoryContent {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Unparsed pass-through content, e.g. a non-HTML upstream response.
    pub fn raw(url: impl Into<String>, bytes: Bytes, http_header: HeaderMap) -> Self {
        MemoryContent {
            url: url.into(),
            reader: Some(bytes),
            http_header,
            ..Default::default()
        }
    }

    /// Registers a dependency, keeping URLs unique and discovery order stable.
    pub fn add_required(&mut self, fd: FetchDefinition) {
        if !self.required_content.iter().any(|d| d.url() == fd.url()) {
            self.required_content.push(fd);
        }
    }

    pub fn set_head(&mut self, fragment: Arc<dyn Fragment>) {
        self.head = Some(fragment);
    }

    pub fn insert_body_fragment(&mut self, name: impl Into<String>, fragment: Arc<dyn Fragment>) {
        self.body.insert(name.into(), fragment);
    }

    pub fn set_tail(&mut self, fragment: Arc<dyn Fragment>) {
        self.tail = Some(fragment);
    }

    pub fn set_body_attributes(&mut self, fragment: Arc<dyn Fragment>) {
        self.body_attributes = Some(fragment);
    }

    pub fn set_http_header(&mut self, header: HeaderMap) {
        self.http_header = header;
    }

    pub fn meta_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.meta
    }
}

impl Content for MemoryContent {
    fn url(&self) -> &str {
        &self.url
    }

    fn required_content(&self) -> Vec<FetchDefinition> {
        self.required_content.clone()
    }

    fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    fn head(&self) -> Option<&dyn Fragment> {
        self.head.as_deref()
    }

    fn body(&self) -> &HashMap<String, Arc<dyn Fragment>> {
        &self.body
    }

    fn tail(&self) -> Option<&dyn Fragment> {
        self.tail.as_deref()
    }

    fn body_attributes(&self) -> Option<&dyn Fragment> {
        self.body_attributes.as_deref()
    }

    fn reader(&self) -> Option<Bytes> {
        self.reader.clone()
    }

    fn http_header(&self) -> &HeaderMap {
        &self.http_header
    }
}
