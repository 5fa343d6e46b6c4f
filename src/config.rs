use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// JSON random-forest export.
    #[default]
    Forest,
    /// TorchScript module plus preprocessor meta (needs the `torch` feature).
    Torch,
}

impl std::str::FromStr for ModelKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forest" => Ok(ModelKind::Forest),
            "torch" => Ok(ModelKind::Torch),
            _ => Err(()),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub model_path: Option<PathBuf>,
    pub model_kind: ModelKind,
    pub meta_path: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
    pub bind_addr: Option<SocketAddr>,
    pub port: Option<u16>,
    pub log_predictions: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// `APP_CONFIG` file if set, then environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("APP_CONFIG") {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `NAME=value` overrides from any source; split out so tests can
    /// avoid touching the process environment.
    pub fn with_overrides<F>(mut self, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("MODEL_PATH") {
            self.model_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("MODEL_KIND") {
            self.model_kind = v.parse().map_err(|_| ConfigError::Invalid {
                name: "MODEL_KIND",
                value: v.clone(),
            })?;
        }
        if let Some(v) = var("META_PATH") {
            self.meta_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("DATASET_PATH") {
            self.dataset_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("BIND_ADDR") {
            self.bind_addr = Some(v.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: v.clone(),
            })?);
        }
        if let Some(v) = var("PORT") {
            self.port = Some(v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: v.clone(),
            })?);
        }
        if let Some(v) = var("LOG_PREDICTIONS") {
            self.log_predictions = v == "1" || v.eq_ignore_ascii_case("true");
        }
        Ok(self)
    }

    pub fn model_path(&self) -> Result<&PathBuf, ConfigError> {
        self.model_path.as_ref().ok_or(ConfigError::Missing("MODEL_PATH"))
    }

    /// `BIND_ADDR` wins; otherwise all interfaces on `PORT` (default 8080).
    pub fn socket_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], self.port.unwrap_or(8080))))
    }
}
