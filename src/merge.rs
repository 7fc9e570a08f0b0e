use std::io::Write;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::content::Content;
use crate::definition::FetchResult;
use crate::error::{CompositionError, Result};
use crate::template::Fragment;

/// Upper bound for nested fragment includes. Exceeding it means the
/// fragment graph contains a cycle.
const MAX_INCLUDE_DEPTH: usize = 32;

/// Merges fetch results into one HTML response.
pub trait ContentMerger {
    /// Adds a successful result. Call in the fetcher's output order.
    fn add_content(&mut self, result: &FetchResult);

    /// Sets the aggregated meta map exposed to every fragment rendering.
    fn set_meta(&mut self, meta: Map<String, Value>);

    /// Merges everything added so far and streams the page to the writer.
    fn write_html(&self, w: &mut dyn Write) -> Result<()>;
}

/// Default merger: the page-defining content supplies the head, body
/// attributes, default body and tail; every content contributes named
/// fragments and its default body is addressable by the content's URL,
/// which is how `§[> src]§` placeholders splice fetched documents.
pub struct DefaultContentMerger {
    root_url: String,
    contents: Vec<Arc<dyn Content>>,
    meta: Map<String, Value>,
}

impl DefaultContentMerger {
    pub fn new(root_url: impl Into<String>) -> Self {
        DefaultContentMerger {
            root_url: root_url.into(),
            contents: Vec::new(),
            meta: Map::new(),
        }
    }

    fn page_content(&self) -> Result<&Arc<dyn Content>> {
        self.contents
            .iter()
            .find(|c| c.url() == self.root_url)
            .or_else(|| self.contents.first())
            .ok_or_else(|| CompositionError::Render("no content to merge".to_string()))
    }

    /// Fragment lookup order: the page's own named fragments win, then
    /// other contents in merge order, later additions overriding earlier
    /// ones. A content's default body fragment answers to the content URL.
    fn lookup_fragment(&self, name: &str) -> Option<Arc<dyn Fragment>> {
        let page = self.page_content().ok()?;
        if let Some(fragment) = page.body().get(name) {
            return Some(fragment.clone());
        }
        let page_url = page.url();

        let mut found = None;
        for content in &self.contents {
            if content.url() == page_url {
                continue;
            }
            if let Some(fragment) = content.body().get(name) {
                found = Some(fragment.clone());
            } else if content.url() == name {
                if let Some(fragment) = content.body().get("") {
                    found = Some(fragment.clone());
                }
            }
        }
        found
    }

    fn resolve_into(&self, w: &mut dyn Write, name: &str, depth: usize) -> Result<()> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(CompositionError::Dependency(format!(
                "fragment include depth exceeded while resolving {name}"
            )));
        }
        match self.lookup_fragment(name) {
            Some(fragment) => fragment.execute(w, &self.meta, &mut |w, nested| {
                self.resolve_into(w, nested, depth + 1)
            }),
            None => {
                warn!(fragment = name, "no fragment for include, rendering empty");
                Ok(())
            }
        }
    }
}

impl ContentMerger for DefaultContentMerger {
    fn add_content(&mut self, result: &FetchResult) {
        if let Some(content) = &result.content {
            // Raw pass-through content contributes nothing to a merge.
            if content.reader().is_none() {
                self.contents.push(content.clone());
            }
        }
    }

    fn set_meta(&mut self, meta: Map<String, Value>) {
        self.meta = meta;
    }

    fn write_html(&self, w: &mut dyn Write) -> Result<()> {
        let page = self.page_content()?;

        writeln!(w, "<!DOCTYPE html>")?;
        writeln!(w, "<html>")?;
        writeln!(w, "<head>")?;
        for content in &self.contents {
            if let Some(head) = content.head() {
                head.execute(w, &self.meta, &mut |w, name| self.resolve_into(w, name, 0))?;
                writeln!(w)?;
            }
        }
        writeln!(w, "</head>")?;

        write!(w, "<body")?;
        if let Some(attrs) = page.body_attributes() {
            write!(w, " ")?;
            attrs.execute(w, &self.meta, &mut |w, name| self.resolve_into(w, name, 0))?;
        }
        writeln!(w, ">")?;

        if let Some(body) = page.body().get("") {
            body.execute(w, &self.meta, &mut |w, name| self.resolve_into(w, name, 0))?;
            writeln!(w)?;
        }
        if let Some(tail) = page.tail() {
            tail.execute(w, &self.meta, &mut |w, name| self.resolve_into(w, name, 0))?;
            writeln!(w)?;
        }
        writeln!(w, "</body>")?;
        writeln!(w, "</html>")?;
        Ok(())
    }
}
