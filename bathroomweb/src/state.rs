use crate::{EnvConfig, template_engine};
use anyhow::{Context, Result};
use axum::response::IntoResponse;
use axum_template::{RenderHtml, engine::Engine};
use libbathroom::{
    Database,
    geocode::{Geocoder, NominatimGeocoder},
};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, trace};

type TemplateEngine = Engine<minijinja::Environment<'static>>;

pub struct SharedState {
    pub db: Database,
    pub tmpl: TemplateEngine,
    pub config: EnvConfig,
    pub datadir: PathBuf,
    pub geocoder: Arc<dyn Geocoder>,
}

impl SharedState {
    pub async fn new(envname: &str, env: EnvConfig, datadir: PathBuf) -> Result<Self> {
        let tmpl_path = datadir.join("templates");
        let template = template_engine(envname, &tmpl_path);
        trace!("Creating shared app state");
        debug!(url = %env.geocoder.url, user_agent = %env.geocoder.user_agent, "Using geocoder");
        let geocoder = NominatimGeocoder::with_url(&env.geocoder.user_agent, &env.geocoder.url)
            .with_context(|| "Unable to create geocoder")?;
        Ok(Self {
            db: Database::open(&env.database)
                .await
                .with_context(|| format!("Unable to open database {}", &env.database))?,
            tmpl: template,
            config: env,
            datadir,
            geocoder: Arc::new(geocoder),
        })
    }

    #[cfg(test)]
    pub fn test(pool: sqlx::Pool<sqlx::Sqlite>, geocoder: Arc<dyn Geocoder>) -> Self {
        let template = template_engine("test", "./templates");
        debug!("Creating test shared app state");
        Self {
            db: pool.into(),
            tmpl: template,
            config: EnvConfig {
                listen: crate::config::ListenConfig {
                    host: "127.0.0.1".to_string(),
                    port: 8080,
                },
                database: "test-database.sqlite".to_string(),
                map: Default::default(),
                geocoder: Default::default(),
            },
            datadir: ".".into(),
            geocoder,
        }
    }

    pub fn render_template<K, S>(&self, key: K, data: S) -> impl IntoResponse + use<K, S>
    where
        K: AsRef<str>,
        S: Serialize,
    {
        RenderHtml(key, self.tmpl.clone(), data)
    }
}

pub type AppState = Arc<SharedState>;
