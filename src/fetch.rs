use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tracing::warn;

use crate::definition::{FetchDefinition, FetchResult};
use crate::error::CompositionError;
use crate::load::ContentLoader;
use crate::parse;

/// Concurrent, deduplicated fetcher for the transitive closure of a set of
/// fetch definitions.
///
/// Every accepted job runs in its own task; dependencies discovered in a
/// fetched content are queued before the discovering job counts as done, so
/// [`ContentFetcher::wait_for_results`] can never return early. A URL is
/// fetched at most once per fetcher, which also breaks include cycles
/// between documents.
pub struct ContentFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    loader: Arc<dyn ContentLoader>,
    state: Mutex<FetchState>,
    idle: Notify,
}

#[derive(Default)]
struct FetchState {
    seen: HashSet<String>,
    pending: usize,
    results: Vec<FetchResult>,
    meta: Map<String, Value>,
}

impl ContentFetcher {
    pub fn new(loader: Arc<dyn ContentLoader>) -> Self {
        ContentFetcher {
            inner: Arc::new(FetcherInner {
                loader,
                state: Mutex::new(FetchState::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Queues a fetch job. Adding a URL that is in flight or already
    /// completed is a no-op.
    pub fn add_fetch_job(&self, fd: FetchDefinition) {
        FetcherInner::schedule(&self.inner, fd);
    }

    /// True until the first job is added.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().seen.is_empty()
    }

    /// Waits until every queued job (including transitively discovered
    /// ones) has completed, then returns the results sorted by priority,
    /// completion order breaking ties.
    pub async fn wait_for_results(&self) -> Vec<FetchResult> {
        loop {
            let mut notified = std::pin::pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.inner.state.lock().pending == 0 {
                break;
            }
            notified.await;
        }
        let mut results = std::mem::take(&mut self.inner.state.lock().results);
        results.sort_by_key(|r| r.def.priority());
        results
    }

    /// The aggregated meta data of all fetched contents: a right-biased
    /// union in completion order.
    pub fn meta_json(&self) -> Map<String, Value> {
        self.inner.state.lock().meta.clone()
    }
}

impl FetcherInner {
    fn schedule(inner: &Arc<FetcherInner>, fd: FetchDefinition) {
        {
            let mut state = inner.state.lock();
            if !state.seen.insert(fd.url().to_string()) {
                return;
            }
            state.pending += 1;
        }
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            FetcherInner::run_job(inner, fd).await;
        });
    }

    async fn run_job(inner: Arc<FetcherInner>, fd: FetchDefinition) {
        let result = match inner.loader.load(&fd).await {
            Ok(content) => Some(FetchResult::success(fd, content)),
            Err(err) => Self::recover(fd, err),
        };

        // Expansion happens before this job decrements the pending counter.
        if let Some(result) = &result {
            if let Some(content) = &result.content {
                for dep in content.required_content() {
                    Self::schedule(&inner, dep);
                }
            }
        }

        let mut state = inner.state.lock();
        if let Some(result) = result {
            if let Some(content) = &result.content {
                for (key, value) in content.meta() {
                    state.meta.insert(key.clone(), value.clone());
                }
            }
            state.results.push(result);
        }
        state.pending -= 1;
        if state.pending == 0 {
            inner.idle.notify_waiters();
        }
    }

    /// Gives the definition's error handler a chance to synthesize recovery
    /// content. An unrecovered failure stays in the result list only when
    /// the definition is required, so the compose fails on it; optional
    /// failures are dropped with a warning.
    fn recover(fd: FetchDefinition, err: CompositionError) -> Option<FetchResult> {
        if let Some(body) = fd.error_handler().handle(&fd, &err) {
            let html = String::from_utf8_lossy(&body);
            match parse::parse_document(fd.url(), &html) {
                Ok(content) => {
                    return Some(FetchResult::success(fd, Arc::new(content)));
                }
                Err(parse_err) => {
                    warn!(url = fd.url(), error = %parse_err, "recovery body failed to parse");
                }
            }
        }
        if fd.required() {
            Some(FetchResult::failure(fd, err))
        } else {
            warn!(url = fd.url(), error = %err, "dropping failed optional content");
            None
        }
    }
}
