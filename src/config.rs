use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::report::{Precedence, ReporterOptions};
use crate::route::DEFAULT_FALLBACK_SPEED_KMH;
use crate::session::SessionOptions;
use crate::tracker::{TrackerSettings, DEFAULT_NOISE_FLOOR_KMH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub reporting: Option<ReportingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Sessions untouched for this long are dropped.
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_timeout: default_session_idle_timeout(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_session_idle_timeout() -> String {
    "30m".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_noise_floor")]
    pub noise_floor_kmh: f64,
    #[serde(default = "default_fallback_speed")]
    pub fallback_speed_kmh: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            noise_floor_kmh: default_noise_floor(),
            fallback_speed_kmh: default_fallback_speed(),
        }
    }
}

fn default_noise_floor() -> f64 {
    DEFAULT_NOISE_FLOOR_KMH
}

fn default_fallback_speed() -> f64 {
    DEFAULT_FALLBACK_SPEED_KMH
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_min_distance")]
    pub min_distance_m: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            min_distance_m: default_min_distance(),
        }
    }
}

fn default_min_distance() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    pub endpoint: String,
    #[serde(default)]
    pub precedence: Precedence,
    #[serde(default = "default_max_age")]
    pub max_age: String,
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_queue")]
    pub queue: usize,
}

fn default_max_age() -> String {
    "15s".to_string()
}

fn default_timeout() -> String {
    "5s".to_string()
}

fn default_queue() -> usize {
    16
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tracking.fallback_speed_kmh", self.tracking.fallback_speed_kmh)?;
        non_negative("tracking.noise_floor_kmh", self.tracking.noise_floor_kmh)?;
        non_negative("location.min_distance_m", self.location.min_distance_m)?;
        self.session_idle_timeout()?;
        if let Some(reporting) = &self.reporting {
            if reporting.endpoint.trim().is_empty() {
                return Err(invalid("reporting.endpoint", "must not be empty"));
            }
            if reporting.queue == 0 {
                return Err(invalid("reporting.queue", "must be at least 1"));
            }
            parse_duration("reporting.max_age", &reporting.max_age)?;
            parse_duration("reporting.timeout", &reporting.timeout)?;
        }
        Ok(())
    }

    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        let mut options = SessionOptions {
            tracker: TrackerSettings {
                noise_floor_kmh: self.tracking.noise_floor_kmh,
            },
            fallback_speed_kmh: self.tracking.fallback_speed_kmh,
            ..SessionOptions::default()
        };
        if let Some(reporting) = &self.reporting {
            options.precedence = reporting.precedence;
            options.remote_max_age = parse_duration("reporting.max_age", &reporting.max_age)?;
        }
        Ok(options)
    }

    pub fn session_idle_timeout(&self) -> Result<Duration, ConfigError> {
        let timeout = parse_duration("web.session_idle_timeout", &self.web.session_idle_timeout)?;
        if timeout.is_zero() {
            return Err(invalid("web.session_idle_timeout", "must be positive"));
        }
        Ok(timeout)
    }

    pub fn reporter_options(&self) -> Result<Option<ReporterOptions>, ConfigError> {
        self.reporting
            .as_ref()
            .map(|reporting| {
                Ok(ReporterOptions {
                    queue: reporting.queue,
                    timeout: parse_duration("reporting.timeout", &reporting.timeout)?,
                })
            })
            .transpose()
    }
}

fn parse_duration(field: &'static str, s: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(s.trim()).map_err(|e| invalid(field, &e.to_string()))
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("{value} must be positive")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("{value} must not be negative")))
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}
