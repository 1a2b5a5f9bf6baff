use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    /// Public origin used for pagination links and image URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    base_url: Option<String>,
    listen_addr: Option<String>,
    media_dir: Option<String>,
    log_dir: Option<String>,
    page_size: Option<u64>,
    token_ttl_hours: Option<i64>,
    password_cost: Option<u32>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_page_size() -> u64 {
    6
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_password_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        let final_config = ServerConfig {
            database_url: env_config.database_url.or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            base_url: env_config.base_url.or(file_config.base_url)
                .unwrap_or_else(default_base_url),
            listen_addr: env_config.listen_addr.or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            media_dir: env_config.media_dir.or(file_config.media_dir)
                .unwrap_or_else(default_media_dir),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            page_size: env_config.page_size.or(file_config.page_size)
                .unwrap_or_else(default_page_size),
            token_ttl_hours: env_config.token_ttl_hours.or(file_config.token_ttl_hours)
                .unwrap_or_else(default_token_ttl_hours),
            password_cost: env_config.password_cost.or(file_config.password_cost)
                .unwrap_or_else(default_password_cost),
        };

        if final_config.page_size == 0 {
            return Err("PAGE_SIZE must be greater than zero".to_string());
        }
        if !(4..=31).contains(&final_config.password_cost) {
            return Err("PASSWORD_COST must be between 4 and 31".to_string());
        }

        Ok(final_config)
    }
}
