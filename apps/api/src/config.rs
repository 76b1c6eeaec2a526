use anyhow::{Context, Result};

use crate::wizard::prompts::PromptVariant;

/// EmailJS credentials. All three identifiers must be present for the lead relay to be enabled.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    /// Private access token, only required when the EmailJS account enforces it.
    pub access_token: Option<String>,
}

/// Application configuration loaded from environment variables.
///
/// The AI credential is optional on purpose: a missing key surfaces as a
/// recoverable `API_KEY_REQUIRED` error on the analyze call, not as a startup failure.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub relay: Option<RelayConfig>,
    pub prompt_variant: PromptVariant,
    pub session_ttl_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let relay = match (
            optional_env("EMAILJS_SERVICE_ID"),
            optional_env("EMAILJS_TEMPLATE_ID"),
            optional_env("EMAILJS_PUBLIC_KEY"),
        ) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(RelayConfig {
                service_id,
                template_id,
                public_key,
                access_token: optional_env("EMAILJS_ACCESS_TOKEN"),
            }),
            _ => None,
        };

        let prompt_variant = match optional_env("PROMPT_VARIANT") {
            Some(raw) => PromptVariant::parse(&raw)
                .with_context(|| format!("PROMPT_VARIANT '{raw}' is not a known variant"))?,
            None => PromptVariant::default(),
        };

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            relay,
            prompt_variant,
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<i64>()
                .context("SESSION_TTL_MINUTES must be a whole number of minutes")?,
            cors_allowed_origin: optional_env("CORS_ALLOWED_ORIGIN"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an env var, treating empty or whitespace-only values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
