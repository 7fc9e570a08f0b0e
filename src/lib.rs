//! Server-side HTML composition engine for micro-frontend gateways.
//!
//! Upstream services answer with HTML fragments annotated with `uia-*`
//! composition markup. Given a root fetch definition, the engine fetches the
//! document, discovers `uia-include` directives, fetches the transitive
//! dependency set concurrently and deduplicated, and merges head, body
//! fragments and tails from every source into one HTML response, expanding
//! the in-band `§[…]§` template markers along the way.
//!
//! The building blocks are narrow capability traits so tests can substitute
//! any of them: [`ContentLoader`] for transport, [`Content`] for parsed
//! upstream responses, [`Fragment`] for renderable units and
//! [`ContentMerger`] for the final assembly.

pub mod content;
pub mod definition;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod load;
pub mod merge;
pub mod parse;
pub mod template;

use std::sync::Arc;

use bytes::Bytes;

pub use content::{Content, MemoryContent};
pub use definition::{
    DefaultErrorHandler, ErrorHandler, FetchDefinition, FetchResult, ResponseProcessor,
    DEFAULT_PRIORITY, DEFAULT_TIMEOUT,
};
pub use error::{CompositionError, Result};
pub use fetch::ContentFetcher;
pub use load::{ContentLoader, HtmlContentLoader};
pub use merge::{ContentMerger, DefaultContentMerger};
pub use template::{execute_template, Fragment, StringFragment};

/// One compose request end to end: fetch the root definition and its
/// transitive dependencies, then merge everything into one HTML page.
///
/// A failed required fetch fails the whole compose; failed optional content
/// has already been dropped by the fetcher. A raw (non-HTML) root response
/// passes through unmodified.
pub async fn compose(loader: Arc<dyn ContentLoader>, root: FetchDefinition) -> Result<Bytes> {
    let root_url = root.url().to_string();

    let fetcher = ContentFetcher::new(loader);
    fetcher.add_fetch_job(root);
    let results = fetcher.wait_for_results().await;

    let mut merger = DefaultContentMerger::new(&root_url);
    let mut raw_root = None;
    for mut result in results {
        if let Some(err) = result.err.take() {
            return Err(err);
        }
        if result.def.url() == root_url {
            if let Some(content) = &result.content {
                raw_root = content.reader();
            }
        }
        merger.add_content(&result);
    }
    if let Some(bytes) = raw_root {
        return Ok(bytes);
    }

    merger.set_meta(fetcher.meta_json());
    let mut out = Vec::new();
    merger.write_html(&mut out)?;
    Ok(Bytes::from(out))
}
