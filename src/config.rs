// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;

/// Number of questions drawn into every new survey unless overridden.
pub const QUESTIONS_PER_SURVEY: usize = 3;

/// Default JWT lifetime in seconds.
pub const DEFAULT_JWT_EXPIRATION: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub questions_per_survey: usize,
    /// Fixed seed for the question sampler. `None` seeds from OS entropy.
    pub sampler_seed: Option<u64>,
    pub listen_addr: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION")?.unwrap_or(DEFAULT_JWT_EXPIRATION);
        let questions_per_survey = parsed("QUESTIONS_PER_SURVEY")?.unwrap_or(QUESTIONS_PER_SURVEY);
        let sampler_seed = parsed("SAMPLER_SEED")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            questions_per_survey,
            sampler_seed,
            listen_addr,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => {
            let value: Result<T, _> = raw.trim().parse();
            value.map(Some).map_err(|_| ConfigError::Invalid(key, raw))
        }
        Err(_) => Ok(None),
    }
}
