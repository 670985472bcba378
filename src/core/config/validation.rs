use super::model::{AppConfig, VectorIndexBackend};
use crate::core::errors::ApiError;

pub fn validate_config(config: &AppConfig) -> Result<(), ApiError> {
    validate_required_string("server.host", &config.server.host)?;

    validate_required_string("llm.base_url", &config.llm.base_url)?;
    validate_http_url("llm.base_url", &config.llm.base_url)?;
    validate_required_string("llm.chat_model", &config.llm.chat_model)?;
    validate_required_string("llm.embedding_model", &config.llm.embedding_model)?;
    validate_f64_range("llm.temperature", config.llm.temperature, 0.0, 2.0)?;
    validate_u64_range("llm.max_tokens", config.llm.max_tokens as u64, 1, 1_000_000)?;
    validate_u64_range(
        "llm.request_timeout_secs",
        config.llm.request_timeout_secs,
        1,
        86_400,
    )?;

    validate_u64_range("retrieval.top_k", config.retrieval.top_k as u64, 1, 100)?;

    validate_u64_range(
        "ingestion.chunk_size",
        config.ingestion.chunk_size as u64,
        1,
        1_000_000,
    )?;
    if config.ingestion.chunk_overlap >= config.ingestion.chunk_size {
        return Err(invalid(
            "ingestion.chunk_overlap",
            "must be smaller than ingestion.chunk_size",
        ));
    }

    if config.vector_index.backend == VectorIndexBackend::Upstash {
        let url = config.vector_index.url.as_deref().unwrap_or_default();
        validate_required_string("vector_index.url", url)?;
        validate_http_url("vector_index.url", url)?;
        validate_required_string(
            "vector_index.token",
            config.vector_index.token.as_deref().unwrap_or_default(),
        )?;
    }

    let prefix = &config.sessions.prefix;
    validate_required_string("sessions.prefix", prefix)?;
    if prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains("..") {
        return Err(invalid(
            "sessions.prefix",
            "must not start or end with '/' or contain '..'",
        ));
    }

    Ok(())
}

fn validate_required_string(path: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_http_url(path: &str, value: &str) -> Result<(), ApiError> {
    let parsed = reqwest::Url::parse(value).map_err(|e| invalid(path, &e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(path, &format!("unsupported scheme '{}'", other))),
    }
}

fn validate_u64_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(invalid(path, &format!("must be between {} and {}", min, max)));
    }
    Ok(())
}

fn validate_f64_range(path: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(path, &format!("must be between {} and {}", min, max)));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ApiError {
    ApiError::Configuration(format!("Invalid config at '{}': {}", path, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.ingestion.chunk_size = 100;
        config.ingestion.chunk_overlap = 100;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ingestion.chunk_overlap"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn upstash_backend_requires_url_and_token() {
        let mut config = AppConfig::default();
        config.vector_index.backend = VectorIndexBackend::Upstash;
        assert!(validate_config(&config).is_err());

        config.vector_index.url = Some("https://example-vector.upstash.io".to_string());
        config.vector_index.token = Some("token".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_prefix_with_slashes() {
        let mut config = AppConfig::default();
        config.sessions.prefix = "/paper_chat/".to_string();
        assert!(validate_config(&config).is_err());
    }
}
