use anyhow::{Context, Result, anyhow};
use axum::{
    RequestPartsExt, Router,
    extract::{FromRequestParts, MatchedPath, rejection::MatchedPathRejection},
    http::request::Parts,
    middleware,
    response::{IntoResponse, Redirect},
    routing::get,
};
use axum_template::engine::Engine;
use clap::Parser;
use config::EnvConfig;
use minijinja::Environment;
use state::{AppState, SharedState};
use std::{collections::HashMap, path::Path, path::PathBuf, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

mod api;
mod config;
mod error;
mod html;
mod state;
#[cfg(test)]
mod testing;

pub(crate) use error::Error;

// minijinja loads all templates from a folder, so the matched route is
// converted into the file name of its template, e.g. `/map/` becomes
// `map.html.j2`
pub struct TemplateKey(pub String);

pub(crate) fn template_key(path: &str) -> String {
    let mut key = path
        .trim_matches('/')
        .replace(['{', '}'], "")
        .replace('/', "_");
    if key.is_empty() {
        key = "index".to_string();
    }
    key.push_str(".html.j2");
    key
}

impl<S> FromRequestParts<S> for TemplateKey
where
    S: Send + Sync,
{
    type Rejection = MatchedPathRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let path = parts.extract::<MatchedPath>().await?;
        Ok(TemplateKey(template_key(path.as_str())))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(short, long, default_value = "dev")]
    pub env: String,
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,
    /// Directory containing the `templates` and `static` folders
    #[arg(short = 'D', long, default_value = ".")]
    pub datadir: PathBuf,
}

pub(crate) fn format_miles(distance: f64) -> String {
    format!("{distance:.1}")
}

pub(crate) fn remark_lines(remarks: String) -> Vec<String> {
    libbathroom::map::remark_lines(&remarks)
}

pub(crate) fn template_engine<P: AsRef<Path>>(envname: &str, template_dir: P) -> Engine<Environment<'static>> {
    debug!(envname, dir = ?template_dir.as_ref(), "Loading templates");
    let mut jinja = Environment::new();
    jinja.set_loader(minijinja::path_loader(template_dir));
    jinja.add_filter("miles", format_miles);
    jinja.add_filter("remark_lines", remark_lines);
    jinja.add_global("envname", envname.to_string());
    Engine::from(jinja)
}

pub(crate) fn app(state: AppState) -> Router {
    let static_dir = state.datadir.join("static");
    Router::new()
        .route("/", get(root))
        .route("/favicon.ico", get(favicon_redirect))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(html::router())
        .nest("/api", api::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            html::error_page,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("BATHROOMWEB_LOG"))
        .init();
    let args = Cli::parse();
    debug!(?args.config, "Reading configuration");
    let configstr = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Unable to read config file {:?}", args.config))?;
    let mut configs: HashMap<String, EnvConfig> =
        serde_yaml::from_str(&configstr).with_context(|| "Unable to parse config file")?;
    let mut env = configs
        .remove(&args.env)
        .ok_or_else(|| anyhow!("No environment '{}' in the config file", args.env))?;
    env.init()?;
    let addr = format!("{}:{}", env.listen.host, env.listen.port);
    debug!("using database '{}'", env.database);

    let shared_state = Arc::new(SharedState::new(&args.env, env, args.datadir).await?);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Unable to listen on {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(shared_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => _ = sig.recv().await,
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
    info!("Received shutdown signal");
}

async fn root() -> impl IntoResponse {
    Redirect::permanent("/map/")
}

async fn favicon_redirect() -> impl IntoResponse {
    Redirect::permanent("/static/favicon.svg")
}

async fn not_found() -> Error {
    Error::NotFound("The requested page does not exist".to_string())
}

#[cfg(test)]
pub(crate) async fn test_app(
    pool: sqlx::Pool<sqlx::Sqlite>,
    geocoder: Arc<dyn libbathroom::geocode::Geocoder>,
) -> Result<(Router, AppState)> {
    let state = Arc::new(SharedState::test(pool, geocoder));
    Ok((app(state.clone()), state))
}
