use std::env;

use chrono::FixedOffset;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub strict_search: bool,
    pub report_utc_offset_hours: i32,
    pub seed_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            strict_search: parse_or_default("STRICT_SEARCH", false)?,
            report_utc_offset_hours: parse_or_default("REPORT_UTC_OFFSET_HOURS", 0)?,
            seed_path: env::var("SEED_PATH").ok().filter(|path| !path.trim().is_empty()),
        };
        config.report_offset()?;

        Ok(config)
    }

    /// Offset anchoring plain dates and totals windows.
    pub fn report_offset(&self) -> Result<FixedOffset, AppError> {
        if !(-23..=23).contains(&self.report_utc_offset_hours) {
            return Err(AppError::Internal(format!(
                "invalid REPORT_UTC_OFFSET_HOURS: {} is outside -23..=23",
                self.report_utc_offset_hours
            )));
        }

        FixedOffset::east_opt(self.report_utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Internal(format!(
                "invalid REPORT_UTC_OFFSET_HOURS: {}",
                self.report_utc_offset_hours
            ))
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
