//! Stats reporting configuration

use std::time::Duration;

use serde::Deserialize;

/// Stats reporting configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the periodic reporter runs
    pub enabled: bool,

    /// Reporting interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_interval_variants() {
        for (s, expected) in [
            ("100ms", Duration::from_millis(100)),
            ("1s", Duration::from_secs(1)),
            ("5m", Duration::from_secs(300)),
        ] {
            let toml = format!("interval = \"{s}\"");
            let config: MetricsConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.interval, expected, "failed for {s}");
        }
    }

    #[test]
    fn test_disabled() {
        let config: MetricsConfig = toml::from_str("enabled = false").unwrap();
        assert!(!config.enabled);
    }
}
