use std::env;
use std::str::FromStr;
use tokio::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CORS_RELAY: &str = "https://api.allorigins.win/raw?url=";

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Ollama => "llama3",
        }
    }

    pub fn default_image_model(self) -> &'static str {
        match self {
            Provider::Gemini => "imagen-4.0-generate-001",
            Provider::OpenAI => "dall-e-3",
            Provider::Ollama => "",
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            _ => Err(ConfigError::Invalid {
                name: "LLM_PROVIDER",
                value: value.to_string(),
            }),
        }
    }
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub model: String,
    pub image_model: String,
    pub temperature: f32,
    /// Upper bound for each resolver or feed request.
    pub http_timeout: Duration,
    /// Upper bound for each generation call.
    pub llm_timeout: Duration,
    pub cors_relay: Option<String>,
    pub article_extraction: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider: Provider = non_empty("LLM_PROVIDER")
            .unwrap_or_default()
            .parse()?;

        let gemini_api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));
        let openai_api_key = non_empty("OPENAI_API_KEY");
        match provider {
            Provider::Gemini if gemini_api_key.is_none() => {
                return Err(ConfigError::Missing("GEMINI_API_KEY"))
            }
            Provider::OpenAI if openai_api_key.is_none() => {
                return Err(ConfigError::Missing("OPENAI_API_KEY"))
            }
            _ => {}
        }

        let ollama_port = parse_or("OLLAMA_PORT", non_empty("OLLAMA_PORT"), 11434u16)?;
        let temperature = parse_or("LLM_TEMPERATURE", non_empty("LLM_TEMPERATURE"), 0.7f32)?;
        let http_timeout = parse_or("HTTP_TIMEOUT_SECS", non_empty("HTTP_TIMEOUT_SECS"), 15u64)?;
        let llm_timeout = parse_or("LLM_TIMEOUT_SECS", non_empty("LLM_TIMEOUT_SECS"), 120u64)?;
        let article_extraction = match non_empty("ARTICLE_EXTRACTION") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "ARTICLE_EXTRACTION",
                value,
            })?,
        };

        // An explicitly empty relay means direct fetches.
        let cors_relay = match lookup("CORS_RELAY_URL") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_CORS_RELAY.to_string()),
        };

        Ok(Config {
            provider,
            gemini_api_key,
            openai_api_key,
            ollama_host: non_empty("OLLAMA_HOST").unwrap_or_else(|| "http://localhost".to_string()),
            ollama_port,
            model: non_empty("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            image_model: non_empty("IMAGE_MODEL")
                .unwrap_or_else(|| provider.default_image_model().to_string()),
            temperature,
            http_timeout: Duration::from_secs(http_timeout),
            llm_timeout: Duration::from_secs(llm_timeout),
            cors_relay,
            article_extraction,
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_gemini_defaults() {
        let config = config_from(&[("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.image_model, "imagen-4.0-generate-001");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.llm_timeout, Duration::from_secs(120));
        assert_eq!(config.cors_relay.as_deref(), Some(DEFAULT_CORS_RELAY));
        assert!(!config.article_extraction);
    }

    #[test]
    fn test_missing_key_for_provider() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));
        assert!(matches!(
            config_from(&[("LLM_PROVIDER", "openai")]),
            Err(ConfigError::Missing("OPENAI_API_KEY"))
        ));
        assert!(config_from(&[("LLM_PROVIDER", "ollama")]).is_ok());
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = config_from(&[
            ("LLM_PROVIDER", "ollama"),
            ("LLM_MODEL", "qwen3"),
            ("HTTP_TIMEOUT_SECS", "3"),
            ("CORS_RELAY_URL", ""),
            ("ARTICLE_EXTRACTION", "yes"),
        ])
        .unwrap();
        assert_eq!(config.model, "qwen3");
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.cors_relay, None);
        assert!(config.article_extraction);

        assert!(matches!(
            config_from(&[("LLM_PROVIDER", "ollama"), ("OLLAMA_PORT", "eleven")]),
            Err(ConfigError::Invalid { name: "OLLAMA_PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("LLM_PROVIDER", "mystery")]),
            Err(ConfigError::Invalid { name: "LLM_PROVIDER", .. })
        ));
    }
}
