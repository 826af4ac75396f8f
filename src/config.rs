use std::net::IpAddr;

use crate::security::replay::DEFAULT_MAX_SKEW_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    pub connector_id: String,
    pub connector_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub max_skew_secs: i64,
    pub log_level: String,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Memory,
    Mongo {
        uri: String,
        db_name: String,
        collection: String,
    },
    Postgres {
        uri: String,
        table: String,
    },
    Supabase {
        url: String,
        service_key: String,
        table: String,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let connector_id = env_required("POSTPIPE_CONNECTOR_ID")?;
        let connector_secret = env_required("POSTPIPE_CONNECTOR_SECRET")?;

        let host: IpAddr = env_or("POSTPIPE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid POSTPIPE_HOST: {e}"))?;

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let max_body_size: usize = env_or("POSTPIPE_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid POSTPIPE_MAX_BODY_SIZE: {e}"))?;

        let max_skew_secs: i64 = match std::env::var("POSTPIPE_MAX_SKEW_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid POSTPIPE_MAX_SKEW_SECS: {e}"))?,
            Err(_) => DEFAULT_MAX_SKEW_SECS,
        };

        let log_level = env_or("POSTPIPE_LOG_LEVEL", "info");

        let storage = storage_from_env()?;

        Ok(Config {
            connector_id,
            connector_secret,
            host,
            port,
            max_body_size,
            max_skew_secs,
            log_level,
            storage,
        })
    }
}

fn storage_from_env() -> Result<StorageBackend, String> {
    match env_or("DB_TYPE", "").to_lowercase().as_str() {
        "mongodb" => Ok(StorageBackend::Mongo {
            uri: env_required("MONGODB_URI")?,
            db_name: env_or("MONGODB_DB_NAME", "postpipe_data"),
            collection: env_or("MONGODB_COLLECTION", "submissions"),
        }),
        "postgres" | "postgresql" => Ok(StorageBackend::Postgres {
            uri: env_required("POSTGRES_URI")?,
            table: table_name(env_or("POSTGRES_TABLE", "postpipe_submissions"))?,
        }),
        "supabase" => Ok(StorageBackend::Supabase {
            url: env_required("SUPABASE_URL")?,
            service_key: env_required("SUPABASE_SERVICE_KEY")?,
            table: table_name(env_or("SUPABASE_TABLE", "postpipe_submissions"))?,
        }),
        // Anything else (including unset) runs as an in-memory dry run.
        _ => Ok(StorageBackend::Memory),
    }
}

/// Table names end up interpolated into SQL, so restrict them to identifier characters.
fn table_name(name: String) -> Result<String, String> {
    if !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
    {
        Ok(name)
    } else {
        Err(format!("Invalid table name: {name}"))
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
