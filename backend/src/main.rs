mod config;
mod docs;
mod encoding;
mod error;
mod forest;
mod inference;
mod models;
mod onnx;
mod routes;

use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::info;

use config::AppConfig;
use inference::{load_predictor, InferenceAdapter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("Starting building energy prediction API");

    let config = AppConfig::from_env()?;

    // No artifact, no server.
    let predictor = load_predictor(&config.model_path).with_context(|| {
        format!("cannot load model artifact {}", config.model_path.display())
    })?;
    let adapter = InferenceAdapter::new(predictor)
        .context("model artifact does not match the request column mapping")?;

    let model = adapter.model_info();
    info!(
        "Model loaded: {} [{}] from {} ({} columns)",
        model.name,
        model.backend,
        model.source,
        model.columns.len()
    );

    let adapter = web::Data::new(adapter);
    let (host, port) = config.bind_address();

    info!("Listening on http://{}:{}", host, port);
    info!("Workers: {}", config.workers);
    info!("Endpoints:");
    info!("   GET  /             - liveness");
    info!("   POST /predict      - energy prediction");
    info!("   GET  /model-info   - loaded artifact");
    info!("   GET  /docs         - API documentation");
    info!("   GET  /redoc        - API reference");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(routes::cors())
            .app_data(adapter.clone())
            .configure(routes::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .workers(config.workers)
    .bind((host, port))
    .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
