use serde::Deserialize;
use std::fs;
use std::path::Path;

// Bounds accepted by the bcrypt crate.
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

// Session tokens live at most one year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Marks the login cookie `Secure`. Enable when served over HTTPS.
    #[serde(default)]
    pub cookie_secure: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    log_dir: Option<String>,
    token_ttl_hours: Option<i64>,
    bcrypt_cost: Option<u32>,
    max_connections: Option<u32>,
    cookie_secure: Option<bool>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_max_connections() -> u32 {
    10
}

impl ServerConfig {
    /// Loads the configuration: defaults, overridden by the TOML file at
    /// `config_path` (if it exists), overridden by environment variables
    /// (`.env` is read first).
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_contents = match config_path {
            Some(path_str) if Path::new(path_str).exists() => Some(
                fs::read_to_string(path_str)
                    .map_err(|e| format!("Failed to read config file at {path_str:?}: {e}"))?,
            ),
            _ => None,
        };

        Self::from_sources(file_contents.as_deref(), std::env::vars())
    }

    /// Builds the configuration from TOML text and `(NAME, value)` pairs; the
    /// pairs win over the file.
    pub fn from_sources<I>(toml_contents: Option<&str>, env_vars: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match toml_contents {
            Some(contents) => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML configuration: {e}"))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_iter(env_vars)
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        let final_config = ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            token_ttl_hours: env_config
                .token_ttl_hours
                .or(file_config.token_ttl_hours)
                .unwrap_or_else(default_token_ttl_hours),
            bcrypt_cost: env_config
                .bcrypt_cost
                .or(file_config.bcrypt_cost)
                .unwrap_or_else(default_bcrypt_cost),
            max_connections: env_config
                .max_connections
                .or(file_config.max_connections)
                .unwrap_or_else(default_max_connections),
            cookie_secure: env_config
                .cookie_secure
                .or(file_config.cookie_secure)
                .unwrap_or_default(),
        };

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&final_config.bcrypt_cost) {
            return Err(format!(
                "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            ));
        }

        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&final_config.token_ttl_hours) {
            return Err(format!(
                "TOKEN_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}"
            ));
        }

        Ok(final_config)
    }
}
