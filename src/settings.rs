use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_base_url: Url,
    pub gemini_model: String,
    pub identity_verify_url: Url,
    pub identity_audience: Option<String>,
    pub calendar_base_url: Url,
    pub calendar_id: String,
    /// IANA zone study sessions are scheduled in.
    pub calendar_time_zone: String,
    pub plan_days: u8,
    /// Comma-separated origins; any origin when unset.
    pub cors_allowed_origins: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_GEMINI_API_KEY -> gemini_api_key
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("gemini_api_key", "")?
            .set_default(
                "gemini_base_url",
                "https://generativelanguage.googleapis.com",
            )?
            .set_default("gemini_model", "gemini-1.5-flash")?
            .set_default(
                "identity_verify_url",
                "https://oauth2.googleapis.com/tokeninfo",
            )?
            .set_default(
                "calendar_base_url",
                "https://www.googleapis.com/calendar/v3",
            )?
            .set_default("calendar_id", "primary")?
            .set_default("calendar_time_zone", "UTC")?
            .set_default("plan_days", 5)?
            .build()?;

        config.try_deserialize()
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}
