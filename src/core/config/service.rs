use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::model::AppConfig;
use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("PAPERCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Reads `config.yml` (defaults when absent), layers secrets from the
    /// environment on top, and validates the result.
    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        let mut config = load_yaml_file(&self.config_path())?;
        apply_env_overrides(&mut config);
        validate_config(&config)?;
        Ok(config)
    }
}

fn load_yaml_file(path: &Path) -> Result<AppConfig, ApiError> {
    if !path.exists() {
        tracing::debug!("No config file at {}; using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ApiError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    serde_yaml::from_str::<AppConfig>(&contents).map_err(|e| {
        ApiError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut AppConfig) {
    if config.llm.api_key.is_none() {
        config.llm.api_key = non_empty_env("OPENAI_API_KEY");
    }
    if config.vector_index.url.is_none() {
        config.vector_index.url = non_empty_env("UPSTASH_VECTOR_REST_URL");
    }
    if config.vector_index.token.is_none() {
        config.vector_index.token = non_empty_env("UPSTASH_VECTOR_REST_TOKEN");
    }
    if let Some(port) = non_empty_env("PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.server.port = port;
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
