use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use uia_compose::handler::{compose_page, health, ComposeService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let addr = std::env::var("COMPOSE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let upstream = std::env::var("UPSTREAM_BASE").context("UPSTREAM_BASE not set")?;

    let service = web::Data::new(ComposeService::new(upstream));

    info!("composition gateway listening on {}", addr);
    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Logger::default())
            .service(health)
            .default_service(web::route().to(compose_page))
    })
    .bind(addr)?
    .workers(2)
    .run()
    .await
    .context("server runtime")
}
