use std::sync::Arc;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use tracing::error;

use crate::definition::FetchDefinition;
use crate::load::{ContentLoader, HtmlContentLoader};

const USER_AGENT: &str = concat!("uia-compose/", env!("CARGO_PKG_VERSION"));

/// Shared state of the composition gateway: the loader and the upstream
/// base every caller request is proxied onto.
pub struct ComposeService {
    loader: Arc<dyn ContentLoader>,
    upstream: String,
}

impl ComposeService {
    pub fn new(upstream: impl Into<String>) -> Self {
        ComposeService {
            loader: Arc::new(HtmlContentLoader::new(USER_AGENT)),
            upstream: upstream.into(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ContentLoader>) -> Self {
        self.loader = loader;
        self
    }
}

#[derive(Serialize)]
pub struct Health {
    pub status: String,
}

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(Health {
        status: "ok".into(),
    })
}

/// Catch-all route: derives the root fetch definition from the caller
/// request and streams the composed page back.
pub async fn compose_page(
    req: HttpRequest,
    body: web::Bytes,
    svc: web::Data<ComposeService>,
) -> HttpResponse {
    let method = match Method::from_bytes(req.method().as_str().as_bytes()) {
        Ok(method) => method,
        Err(_) => return HttpResponse::MethodNotAllowed().finish(),
    };

    let headers = caller_headers(&req);
    let body = if body.is_empty() { None } else { Some(body) };

    let fd = match FetchDefinition::from_request(
        &svc.upstream,
        method,
        req.uri().path(),
        req.uri().query(),
        &headers,
        body,
    ) {
        Ok(fd) => fd,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };

    match crate::compose(svc.loader.clone(), fd).await {
        Ok(html) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html),
        Err(err) => {
            error!(error = %err, path = req.uri().path(), "composition failed");
            HttpResponse::BadGateway().body(err.to_string())
        }
    }
}

fn caller_headers(req: &HttpRequest) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in req.headers() {
        let name = HeaderName::from_bytes(name.as_str().as_bytes());
        let value = HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            out.append(name, value);
        }
    }
    out
}
