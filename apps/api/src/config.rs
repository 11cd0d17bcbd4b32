use anyhow::{bail, Context, Result};

use crate::projection::models::ImpactPairing;

/// Which hosted completion API the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionProvider {
    Anthropic,
    OpenAi,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the credential for the selected provider is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: CompletionProvider,
    pub api_key: String,
    pub completion_base_url: Option<String>,
    pub default_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub education_table_path: String,
    pub wage_table_path: String,
    pub output_log_path: String,
    pub impact_pairing: ImpactPairing,
    /// Idle seconds before a session is evicted.
    pub session_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider = parse_provider(&optional_env("COMPLETION_PROVIDER", "anthropic"))?;
        let api_key = match provider {
            CompletionProvider::Anthropic => require_env("ANTHROPIC_API_KEY")?,
            CompletionProvider::OpenAi => require_env("OPENAI_API_KEY")?,
        };

        Ok(Config {
            provider,
            api_key,
            completion_base_url: std::env::var("COMPLETION_BASE_URL").ok(),
            default_model: optional_env("DEFAULT_MODEL", DEFAULT_MODEL),
            max_tokens: optional_env("MAX_TOKENS", "1000")
                .parse::<u32>()
                .context("MAX_TOKENS must be a positive integer")?,
            temperature: optional_env("TEMPERATURE", "0.5")
                .parse::<f32>()
                .context("TEMPERATURE must be a number")?,
            education_table_path: optional_env(
                "EDUCATION_TABLE_PATH",
                "data/california_colleges.csv",
            ),
            wage_table_path: optional_env(
                "WAGE_TABLE_PATH",
                "data/msa_occ_wage_only_3columns.csv",
            ),
            output_log_path: optional_env("OUTPUT_LOG_PATH", "output.txt"),
            impact_pairing: optional_env("IMPACT_PAIRING", "truncate")
                .parse::<ImpactPairing>()
                .map_err(anyhow::Error::msg)
                .context("IMPACT_PAIRING must be 'truncate' or 'reject'")?,
            session_ttl_secs: optional_env("SESSION_TTL_SECS", "3600")
                .parse::<u64>()
                .context("SESSION_TTL_SECS must be a positive integer")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn parse_provider(value: &str) -> Result<CompletionProvider> {
    match value.trim().to_ascii_lowercase().as_str() {
        "anthropic" => Ok(CompletionProvider::Anthropic),
        "openai" => Ok(CompletionProvider::OpenAi),
        other => bail!("COMPLETION_PROVIDER must be 'anthropic' or 'openai', got '{other}'"),
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_is_case_insensitive() {
        assert_eq!(
            parse_provider("Anthropic").unwrap(),
            CompletionProvider::Anthropic
        );
        assert_eq!(parse_provider(" openai ").unwrap(), CompletionProvider::OpenAi);
    }

    #[test]
    fn test_parse_provider_rejects_unknown() {
        assert!(parse_provider("cohere").is_err());
    }
}
