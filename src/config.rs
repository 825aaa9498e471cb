use dotenvy::dotenv;
use std::{env, path::PathBuf};

use crate::error::AppError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
//2048 KB, same limit the dashboard forms used
const DEFAULT_FILE_SIZE_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub secret: String,
    pub token_ttl_hours: i64,
    pub upload_dir: PathBuf,
    pub file_size_limit: usize,
    pub admin: Option<AdminSeed>,
}

/// Credentials of the administrator account created on first boot.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let required = |name: &str| {
            env::var(name).map_err(|err| AppError::Config(format!("{name} must be set: {err}")))
        };

        let database_url = required("DATABASE_URL")?;
        let secret = required("SECRET")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(value) => value
                .parse::<i64>()
                .map_err(|err| AppError::Config(format!("Invalid TOKEN_TTL_HOURS: {err}")))?,
            Err(_) => DEFAULT_TOKEN_TTL_HOURS,
        };

        let file_size_limit = match env::var("FILE_SIZE_LIMIT") {
            Ok(value) => value
                .parse::<usize>()
                .map_err(|err| AppError::Config(format!("Invalid FILE_SIZE_LIMIT: {err}")))?,
            Err(_) => DEFAULT_FILE_SIZE_LIMIT,
        };

        let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(AdminSeed { username, password }),
            _ => None,
        };

        tracing::info!(bind_addr = %bind_addr, upload_dir = ?upload_dir, "Configuration loaded");

        Ok(Self {
            database_url,
            bind_addr,
            secret,
            token_ttl_hours,
            upload_dir,
            file_size_limit,
            admin,
        })
    }
}
