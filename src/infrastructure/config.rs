use crate::application::refresh::{MAX_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL};
use crate::application::report_service::ReportSettings;
use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/salon";
const ENV_PREFIX: &str = "SALON";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub reports: ReportsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportsSettings {
    pub timezone: String,
    pub history_days: i64,
}

impl Default for ReportsSettings {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            history_days: 14,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("backend.url must be an http(s) URL, got '{}'", self.backend.url);
        }
        if self.backend.api_key.trim().is_empty() {
            anyhow::bail!("backend.api_key must not be empty");
        }

        let interval = Duration::from_secs(self.refresh.interval_secs);
        if interval < MIN_REFRESH_INTERVAL || interval > MAX_REFRESH_INTERVAL {
            anyhow::bail!(
                "refresh.interval_secs must be between {} and {}, got {}",
                MIN_REFRESH_INTERVAL.as_secs(),
                MAX_REFRESH_INTERVAL.as_secs(),
                self.refresh.interval_secs
            );
        }

        if self.reports.history_days < 0 {
            anyhow::bail!("reports.history_days must not be negative");
        }
        self.timezone()?;

        Ok(())
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.reports
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid reports.timezone '{}': {}", self.reports.timezone, e))
    }

    pub fn report_settings(&self) -> anyhow::Result<ReportSettings> {
        Ok(ReportSettings {
            timezone: self.timezone()?,
            history_days: self.reports.history_days,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }
}

/// Load `config/salon.{toml,yaml,json}` (optional) overlaid with `SALON__SECTION__KEY`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    build_app_config(builder)
}

fn build_app_config(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<AppConfig> {
    let settings = builder.build().context("Failed to read configuration")?;
    let app_config: AppConfig = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;
    app_config.validate()?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> anyhow::Result<AppConfig> {
        build_app_config(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let cfg = from_toml(
            r#"
            [backend]
            url = "https://example.supabase.co"
            api_key = "anon-key"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.backend.timeout_secs, 15);
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(30));
        let reports = cfg.report_settings().unwrap();
        assert_eq!(reports.timezone, chrono_tz::America::New_York);
        assert_eq!(reports.history_days, 14);
    }

    #[test]
    fn test_refresh_interval_out_of_range_is_rejected() {
        let err = from_toml(
            r#"
            [backend]
            url = "https://example.supabase.co"
            api_key = "anon-key"

            [refresh]
            interval_secs = 60
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("refresh.interval_secs"));
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let err = from_toml(
            r#"
            [backend]
            url = "https://example.supabase.co"
            api_key = "anon-key"

            [reports]
            timezone = "Mars/Olympus"
            history_days = 7
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("reports.timezone"));
    }

    #[test]
    fn test_backend_url_must_be_http() {
        let err = from_toml(
            r#"
            [backend]
            url = "example.supabase.co"
            api_key = "anon-key"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("backend.url"));
    }

    #[test]
    fn test_missing_backend_section_fails() {
        assert!(from_toml("[server]\nbind_addr = \"127.0.0.1:9000\"\n").is_err());
    }
}
