//! Configuration management for the VoiceFit resolution core
//!
//! All configurable parameters in one place with environment variable
//! overrides. Sensible defaults, configurable in production.

use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::constants;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds)
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "X-API-Key".to_string(),
                "X-User-Id".to_string(),
            ],
            max_age_seconds: 86_400,
        }
    }
}

impl CorsConfig {
    /// Load from environment variables with production safety checks
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = env::var("VOICEFIT_CORS_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        let is_production = is_production_env();
        if is_production && config.allowed_origins.is_empty() {
            tracing::warn!(
                "PRODUCTION WARNING: CORS allows all origins. Set VOICEFIT_CORS_ORIGINS."
            );
        }

        config
    }

    /// Check if any origin restrictions are configured
    pub fn is_restricted(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    /// Convert to tower-http CorsLayer
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let mut layer = CorsLayer::new();

        if self.allowed_origins.is_empty() {
            layer = layer.allow_origin(Any);
        } else {
            let mut valid_origins = Vec::new();
            for origin_str in &self.allowed_origins {
                match origin_str.parse::<axum::http::HeaderValue>() {
                    Ok(origin) => valid_origins.push(origin),
                    Err(_) => tracing::warn!("CORS: invalid origin '{}' - skipping", origin_str),
                }
            }

            if valid_origins.is_empty() {
                // All configured origins failed to parse. Deny instead of
                // falling back to permissive - that would be a security hole.
                tracing::error!(
                    "CORS: all {} configured origin(s) failed to parse; rejecting cross-origin requests",
                    self.allowed_origins.len()
                );
                layer = layer.allow_origin(AllowOrigin::list(Vec::<axum::http::HeaderValue>::new()));
            } else {
                layer = layer.allow_origin(AllowOrigin::list(valid_origins));
            }
        }

        let methods: Vec<axum::http::Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        if methods.is_empty() {
            layer = layer.allow_methods(Any);
        } else {
            layer = layer.allow_methods(methods);
        }

        let headers: Vec<axum::http::HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if headers.is_empty() {
            layer = layer.allow_headers(Any);
        } else {
            layer = layer.allow_headers(headers);
        }

        layer.max_age(std::time::Duration::from_secs(self.max_age_seconds))
    }
}

/// Server configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: 127.0.0.1)
    pub host: String,

    /// Server port (default: 3040)
    pub port: u16,

    /// Storage path for the exercise entity store (default: ./voicefit_data)
    pub storage_path: PathBuf,

    /// Default fuzzy-stage acceptance threshold
    pub fuzzy_threshold: f32,

    /// Semantic-stage acceptance threshold
    pub semantic_threshold: f32,

    /// Per-lookup context gathering timeout (milliseconds)
    pub context_timeout_ms: u64,

    /// Reranker call timeout (seconds)
    pub rerank_timeout_secs: u64,

    /// Feature-flag cache TTL (seconds)
    pub flag_cache_ttl_secs: u64,

    /// Generative service endpoint (Ollama-style; empty = disabled)
    pub generative_endpoint: String,

    /// Generative service model name
    pub generative_model: String,

    /// Rate limit: requests per second (default: 2000)
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size (default: 4000)
    pub rate_limit_burst: u32,

    /// Maximum concurrent requests (default: 200)
    pub max_concurrent_requests: usize,

    /// Whether running in production mode
    pub is_production: bool,

    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
            storage_path: PathBuf::from("./voicefit_data"),
            fuzzy_threshold: constants::DEFAULT_FUZZY_THRESHOLD,
            semantic_threshold: constants::SEMANTIC_ACCEPT_THRESHOLD,
            context_timeout_ms: constants::CONTEXT_LOOKUP_TIMEOUT_MS,
            rerank_timeout_secs: constants::RERANK_TIMEOUT_SECS,
            flag_cache_ttl_secs: constants::FLAG_CACHE_TTL_SECS,
            generative_endpoint: String::new(),
            generative_model: "llama3.2:3b".to_string(),
            rate_limit_per_second: 2000,
            rate_limit_burst: 4000,
            max_concurrent_requests: 200,
            is_production: false,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)] // Environment overrides require mutable config
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.is_production = is_production_env();

        if let Ok(val) = env::var("VOICEFIT_HOST") {
            config.host = val;
        }

        if let Ok(val) = env::var("VOICEFIT_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_DATA_PATH") {
            config.storage_path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("VOICEFIT_FUZZY_THRESHOLD") {
            if let Ok(n) = val.parse::<f32>() {
                config.fuzzy_threshold = n.clamp(0.0, 1.0);
            }
        }

        if let Ok(val) = env::var("VOICEFIT_SEMANTIC_THRESHOLD") {
            if let Ok(n) = val.parse::<f32>() {
                config.semantic_threshold = n.clamp(0.0, 1.0);
            }
        }

        if let Ok(val) = env::var("VOICEFIT_CONTEXT_TIMEOUT_MS") {
            if let Ok(n) = val.parse() {
                config.context_timeout_ms = n;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_RERANK_TIMEOUT") {
            if let Ok(n) = val.parse() {
                config.rerank_timeout_secs = n;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_FLAG_TTL") {
            if let Ok(n) = val.parse() {
                config.flag_cache_ttl_secs = n;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_GENERATIVE_ENDPOINT") {
            config.generative_endpoint = val.trim_end_matches('/').to_string();
        }

        if let Ok(val) = env::var("VOICEFIT_GENERATIVE_MODEL") {
            config.generative_model = val;
        }

        if let Ok(val) = env::var("VOICEFIT_RATE_LIMIT") {
            if let Ok(n) = val.parse() {
                config.rate_limit_per_second = n;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_RATE_BURST") {
            if let Ok(n) = val.parse() {
                config.rate_limit_burst = n;
            }
        }

        if let Ok(val) = env::var("VOICEFIT_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_requests = n;
            }
        }

        config.cors = CorsConfig::from_env();

        config
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!(
            "   Mode: {}",
            if self.is_production {
                "PRODUCTION"
            } else {
                "Development"
            }
        );
        info!("   Listen: {}:{}", self.host, self.port);
        info!("   Storage: {:?}", self.storage_path);
        info!(
            "   Thresholds: fuzzy={:.2} semantic={:.2}",
            self.fuzzy_threshold, self.semantic_threshold
        );
        info!(
            "   Timeouts: context={}ms rerank={}s",
            self.context_timeout_ms, self.rerank_timeout_secs
        );
        info!("   Flag cache TTL: {}s", self.flag_cache_ttl_secs);
        if self.generative_endpoint.is_empty() {
            info!("   Generative service: disabled");
        } else {
            info!(
                "   Generative service: {} (model: {})",
                self.generative_endpoint, self.generative_model
            );
        }
        info!(
            "   Rate limit: {} req/sec (burst: {}), max concurrent: {}",
            self.rate_limit_per_second, self.rate_limit_burst, self.max_concurrent_requests
        );
        if self.cors.is_restricted() {
            info!("   CORS origins: {:?}", self.cors.allowed_origins);
        } else {
            info!("   CORS: permissive (all origins allowed)");
        }
    }
}

fn is_production_env() -> bool {
    env::var("VOICEFIT_ENV")
        .map(|v| {
            let v = v.to_lowercase();
            v == "production" || v == "prod"
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3040);
        assert!((config.fuzzy_threshold - 0.80).abs() < f32::EPSILON);
        assert!(!config.is_production);
    }

    #[test]
    fn test_env_override() {
        env::set_var("VOICEFIT_PORT", "8080");
        env::set_var("VOICEFIT_FUZZY_THRESHOLD", "0.9");

        let config = ServerConfig::from_env();
        assert_eq!(config.port, 8080);
        assert!((config.fuzzy_threshold - 0.9).abs() < 1e-6);

        env::remove_var("VOICEFIT_PORT");
        env::remove_var("VOICEFIT_FUZZY_THRESHOLD");
    }

    #[test]
    fn test_threshold_clamped() {
        env::set_var("VOICEFIT_SEMANTIC_THRESHOLD", "1.7");
        let config = ServerConfig::from_env();
        assert!(config.semantic_threshold <= 1.0);
        env::remove_var("VOICEFIT_SEMANTIC_THRESHOLD");
    }

    #[test]
    fn test_cors_default_is_permissive() {
        let cors = CorsConfig::default();
        assert!(!cors.is_restricted());
        let _layer = cors.to_layer(); // should not panic
    }

    #[test]
    fn test_cors_with_origins_is_restricted() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://coach.voicefit.app".to_string()],
            ..Default::default()
        };
        assert!(cors.is_restricted());
        let _layer = cors.to_layer();
    }
}
