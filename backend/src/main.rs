use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::routes::api_routes;
use crate::state::{AppState, Tools};

mod config;
mod error;
mod routes;
mod state;
#[cfg(test)]
mod testing;
mod tools;

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid origin '{o}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

fn app(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
    let static_files = ServeDir::new(state.data_dir());
    Ok(Router::new()
        .merge(api_routes())
        .nest_service("/static", static_files)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes()))
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    let tools = Tools::from_config(&config);
    let state = AppState::new(&config.data_dir, tools).context("failed to prepare data directory")?;
    state
        .sessions
        .spawn_sweeper(config.session_ttl(), config.sweep_interval());

    let app = app(state, &config)?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;

    #[test]
    fn rejects_malformed_origin() {
        assert!(cors_layer(&["https://localhost:3001".into()]).is_ok());
        assert!(cors_layer(&["https://bad\norigin".into()]).is_err());
    }

    #[tokio::test]
    async fn router_builds_with_defaults() {
        let (state, _data) = test_state();
        let config = ServerConfig::try_parse_from(["backend"]).unwrap();
        assert!(app(state, &config).is_ok());
    }
}
