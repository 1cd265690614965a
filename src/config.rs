use crate::error::{Error, Result};
use crate::models::family::Family;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub structured_output: bool,
    pub reference_dir: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub max_concurrency: usize,
    pub sample_seed: Option<u64>,
    pub families: Vec<Family>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_key = get_env("GEMINI_API_KEY")?;
        if api_key.trim().is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is empty".to_string()));
        }

        let max_attempts: u32 = get_env_parse_or("MAX_ATTEMPTS", 3)?;
        let max_concurrency: usize = get_env_parse_or("MAX_CONCURRENCY", 3)?;
        if max_attempts == 0 || max_concurrency == 0 {
            return Err(Error::Config(
                "MAX_ATTEMPTS and MAX_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            gemini_api_key: api_key,
            gemini_model: get_env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_base_url: get_env_or("GEMINI_BASE_URL", DEFAULT_BASE_URL),
            structured_output: get_env_parse_or("GEMINI_STRUCTURED_OUTPUT", true)?,
            reference_dir: PathBuf::from(get_env_or("REFERENCE_DIR", ".")),
            output_dir: PathBuf::from(get_env_or("OUTPUT_DIR", "Generated")),
            request_timeout_secs: get_env_parse_or("REQUEST_TIMEOUT_SECS", 120)?,
            max_attempts,
            max_concurrency,
            sample_seed: env::var("SAMPLE_SEED")
                .ok()
                .map(|raw| {
                    raw.parse()
                        .map_err(|e| Error::Config(format!("Invalid value for SAMPLE_SEED: {}", e)))
                })
                .transpose()?,
            families: match env::var("GENERATION_FAMILIES") {
                Ok(raw) if !raw.trim().is_empty() => parse_families(&raw)?,
                _ => Family::ALL.to_vec(),
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated family list, keeping the canonical run order.
pub fn parse_families(raw: &str) -> Result<Vec<Family>> {
    let mut requested = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let family: Family = tag
            .parse()
            .map_err(|_| Error::Config(format!("Unknown family in GENERATION_FAMILIES: {}", tag)))?;
        if !requested.contains(&family) {
            requested.push(family);
        }
    }
    Ok(Family::ALL
        .iter()
        .copied()
        .filter(|f| requested.contains(f))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_list_is_deduplicated_and_reordered() {
        let families = parse_families("rc, xyz ,KVA,xyz").unwrap();
        assert_eq!(
            families,
            vec![Family::Quantitative, Family::QuantityComparison, Family::ReadingComprehension]
        );
    }

    #[test]
    fn unknown_family_is_a_config_error() {
        let err = parse_families("XYZ,ABC").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("ABC")));
    }
}
