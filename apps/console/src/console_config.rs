use std::env;
use std::time::Duration;

use keydesk_application::presentation::DEFAULT_VISIBLE_PERMISSIONS;
use keydesk_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/admin";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub api_base_url: Url,
    pub api_token: String,
    pub http_timeout: Duration,
    pub summary_visible_permissions: usize,
}

impl ConsoleConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base_url = lookup("KEYDESK_API_BASE_URL")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(&raw_base_url).map_err(|error| {
            AppError::Validation(format!(
                "invalid KEYDESK_API_BASE_URL '{raw_base_url}': {error}"
            ))
        })?;
        if api_base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "KEYDESK_API_BASE_URL '{raw_base_url}' must be an http(s) base url"
            )));
        }

        let api_token = lookup("KEYDESK_API_TOKEN")
            .ok_or_else(|| AppError::Validation("KEYDESK_API_TOKEN is required".to_owned()))?;
        if api_token.trim().is_empty() {
            return Err(AppError::Validation(
                "KEYDESK_API_TOKEN must not be empty".to_owned(),
            ));
        }

        let timeout_seconds = parse_number(
            &lookup,
            "KEYDESK_HTTP_TIMEOUT_SECONDS",
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?;
        if timeout_seconds == 0 {
            return Err(AppError::Validation(
                "KEYDESK_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let summary_visible_permissions = parse_number(
            &lookup,
            "KEYDESK_SUMMARY_VISIBLE_PERMISSIONS",
            DEFAULT_VISIBLE_PERMISSIONS,
        )?;

        Ok(Self {
            api_base_url,
            api_token: api_token.trim().to_owned(),
            http_timeout: Duration::from_secs(timeout_seconds),
            summary_visible_permissions,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_number<F, T>(lookup: &F, name: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
