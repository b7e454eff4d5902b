//! Configuration management for the `OnTym` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::OnTymError;
use crate::models::Pollutant;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `OnTym` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnTymConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Air-quality provider settings
    #[serde(default)]
    pub air_quality: AirQualityConfig,
    /// Generative AI settings
    #[serde(default)]
    pub ai: AiConfig,
    /// Embedded store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Selector thresholds and effectiveness scores
    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Directory holding the single-page app bundle, served for unknown paths
    #[serde(default)]
    pub static_dir: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Air-quality provider (OpenWeather air pollution API) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityConfig {
    /// OpenWeather API key
    pub api_key: Option<String>,
    /// Base URL for the air pollution API
    #[serde(default = "default_air_quality_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_air_quality_timeout")]
    pub timeout_seconds: u32,
}

/// Generative AI (Gemini) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the embedded database
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; span export is off when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default)]
    pub thresholds: PollutantThresholds,
    #[serde(default)]
    pub effectiveness: EffectivenessScores,
}

/// Concentration above which a pollutant counts as "high", in the provider's
/// native units. A pollutant without a threshold is never flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantThresholds {
    #[serde(default = "default_o3_threshold")]
    pub o3: Option<f64>,
    #[serde(default = "default_no2_threshold")]
    pub no2: Option<f64>,
    #[serde(default = "default_pm10_threshold")]
    pub pm10: Option<f64>,
    #[serde(default = "default_pm2_5_threshold")]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub so2: Option<f64>,
    #[serde(default)]
    pub no: Option<f64>,
    #[serde(default)]
    pub nh3: Option<f64>,
}

/// Scores behind the qualitative effectiveness ratings, used for ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivenessScores {
    #[serde(default = "default_high_score")]
    pub high: u8,
    #[serde(default = "default_medium_score")]
    pub medium: u8,
    #[serde(default = "default_low_score")]
    pub low: u8,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_request_timeout() -> u32 {
    60
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_air_quality_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_air_quality_timeout() -> u32 {
    10
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_ai_timeout() -> u32 {
    30
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.8
}

fn default_top_k() -> u32 {
    40
}

fn default_store_path() -> String {
    "data/ontym".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_o3_threshold() -> Option<f64> {
    Some(60.0)
}

fn default_no2_threshold() -> Option<f64> {
    Some(40.0)
}

fn default_pm10_threshold() -> Option<f64> {
    Some(50.0)
}

fn default_pm2_5_threshold() -> Option<f64> {
    Some(25.0)
}

fn default_high_score() -> u8 {
    3
}

fn default_medium_score() -> u8 {
    2
}

fn default_low_score() -> u8 {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            static_dir: None,
            request_timeout_seconds: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            tls: None,
        }
    }
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_air_quality_base_url(),
            timeout_seconds: default_air_quality_timeout(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            timeout_seconds: default_ai_timeout(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for PollutantThresholds {
    fn default() -> Self {
        Self {
            o3: default_o3_threshold(),
            no2: default_no2_threshold(),
            pm10: default_pm10_threshold(),
            pm2_5: default_pm2_5_threshold(),
            co: None,
            so2: None,
            no: None,
            nh3: None,
        }
    }
}

impl PollutantThresholds {
    /// Threshold for one pollutant, if configured
    #[must_use]
    pub fn limit(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm25 => self.pm2_5,
            Pollutant::Co => self.co,
            Pollutant::So2 => self.so2,
            Pollutant::No => self.no,
            Pollutant::Nh3 => self.nh3,
        }
    }
}

impl Default for EffectivenessScores {
    fn default() -> Self {
        Self {
            high: default_high_score(),
            medium: default_medium_score(),
            low: default_low_score(),
        }
    }
}

impl OnTymConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os("ONTYM_CONFIG").map(PathBuf::from);
        Self::load_from_path(explicit)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. ONTYM__AI__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("ONTYM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: OnTymConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ontym").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.air_quality.base_url.is_empty() {
            self.air_quality.base_url = default_air_quality_base_url();
        }
        if self.ai.base_url.is_empty() {
            self.ai.base_url = default_ai_base_url();
        }
        if self.ai.model.is_empty() {
            self.ai.model = default_ai_model();
        }
        if self.store.path.is_empty() {
            self.store.path = default_store_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_recommendation()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("Air quality", &self.air_quality.api_key),
            ("AI", &self.ai.api_key),
        ] {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(OnTymError::config(format!(
                        "{name} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(OnTymError::config("Server port cannot be 0").into());
        }

        for (name, seconds) in [
            ("Server request", self.server.request_timeout_seconds),
            ("Air quality API", self.air_quality.timeout_seconds),
            ("AI API", self.ai.timeout_seconds),
        ] {
            if seconds == 0 || seconds > 300 {
                return Err(OnTymError::config(format!(
                    "{name} timeout must be between 1 and 300 seconds"
                ))
                .into());
            }
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(OnTymError::config("AI temperature must be between 0 and 2").into());
        }

        if !(0.0..=1.0).contains(&self.ai.top_p) {
            return Err(OnTymError::config("AI top_p must be between 0 and 1").into());
        }

        if self.ai.max_output_tokens == 0 {
            return Err(OnTymError::config("AI max_output_tokens cannot be 0").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(OnTymError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(OnTymError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Air quality API", &self.air_quality.base_url),
            ("AI API", &self.ai.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(OnTymError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if let Some(tls) = &self.server.tls {
            if tls.cert_path.is_some() != tls.key_path.is_some() {
                return Err(OnTymError::config(
                    "TLS needs both cert_path and key_path, or neither",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate selector thresholds and effectiveness scores
    fn validate_recommendation(&self) -> Result<()> {
        let thresholds = &self.recommendation.thresholds;
        for pollutant in Pollutant::ALL {
            if let Some(limit) = thresholds.limit(pollutant) {
                if !limit.is_finite() || limit < 0.0 {
                    return Err(OnTymError::config(format!(
                        "Threshold for {pollutant} must be a non-negative number, got: {limit}"
                    ))
                    .into());
                }
            }
        }

        let scores = &self.recommendation.effectiveness;
        if !(scores.high >= scores.medium && scores.medium >= scores.low) {
            return Err(OnTymError::config(
                "Effectiveness scores must satisfy high >= medium >= low",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = OnTymConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.air_quality.base_url,
            "https://api.openweathermap.org/data/2.5"
        );
        assert_eq!(config.ai.model, "gemini-2.5-flash");
        assert_eq!(config.logging.level, "info");
        assert!(config.ai.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_thresholds_match_documented_constants() {
        let thresholds = PollutantThresholds::default();
        assert_eq!(thresholds.limit(Pollutant::O3), Some(60.0));
        assert_eq!(thresholds.limit(Pollutant::No2), Some(40.0));
        assert_eq!(thresholds.limit(Pollutant::Pm10), Some(50.0));
        assert_eq!(thresholds.limit(Pollutant::Pm25), Some(25.0));
        assert_eq!(thresholds.limit(Pollutant::Co), None);
        assert_eq!(thresholds.limit(Pollutant::So2), None);
    }

    #[test]
    fn test_config_validation_empty_api_key() {
        let mut config = OnTymConfig::default();
        config.ai.api_key = Some("   ".to_string());
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("AI API key"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = OnTymConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = OnTymConfig::default();
        config.ai.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("timeout must be between")
        );
    }

    #[test]
    fn test_config_validation_negative_threshold() {
        let mut config = OnTymConfig::default();
        config.recommendation.thresholds.o3 = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_score_order() {
        let mut config = OnTymConfig::default();
        config.recommendation.effectiveness.low = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_half_tls() {
        let mut config = OnTymConfig::default();
        config.server.tls = Some(TlsConfig {
            cert_path: Some("cert.pem".into()),
            key_path: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "ontym-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[recommendation.thresholds]\no3 = 80.0\nso2 = 20.0\n"
        )
        .unwrap();

        let config = OnTymConfig::load_from_path(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.recommendation.thresholds.o3, Some(80.0));
        assert_eq!(config.recommendation.thresholds.so2, Some(20.0));
        // untouched keys keep their defaults
        assert_eq!(config.recommendation.thresholds.no2, Some(40.0));
        assert_eq!(config.ai.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = OnTymConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("ontym"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
