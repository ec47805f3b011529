//! Configuration for the service and worker binaries.

use std::env;
use std::time::Duration;

const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WORKERS_PER_TYPE: usize = 2;

/// Configuration for local/monolith deployment.
#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Redis connection URL. Empty selects the in-process adapters.
    pub redis_url: String,
    /// Root directory of the blob store
    pub storage_root: String,
    /// JSON users file
    pub users_file: String,
    /// Raw `token:username,...` table
    pub api_tokens: String,
    /// How long a delete waits for its worker
    pub delete_timeout: Duration,
    /// Conversion workers spawned per resource type
    pub workers_per_type: usize,
    pub ffmpeg_path: String,
}

impl LocalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            redis_url: env::var("REDIS_URL").unwrap_or_default(),
            storage_root: storage_root(),
            users_file: env::var("USERS_FILE").unwrap_or_else(|_| String::from("./users.json")),
            api_tokens: env::var("API_TOKENS").unwrap_or_default(),
            delete_timeout: Duration::from_secs(parse_or(
                "DELETE_TIMEOUT_SECS",
                DEFAULT_DELETE_TIMEOUT_SECS,
            )),
            workers_per_type: parse_or("WORKERS_PER_TYPE", DEFAULT_WORKERS_PER_TYPE),
            ffmpeg_path: ffmpeg_path(),
        }
    }

    pub fn uses_redis(&self) -> bool {
        !self.redis_url.trim().is_empty()
    }
}

/// Configuration for the standalone conversion worker.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub storage_root: String,
    pub workers_per_type: usize,
    pub ffmpeg_path: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| String::from("redis://127.0.0.1/")),
            storage_root: storage_root(),
            workers_per_type: parse_or("WORKERS_PER_TYPE", DEFAULT_WORKERS_PER_TYPE),
            ffmpeg_path: ffmpeg_path(),
        }
    }
}

fn storage_root() -> String {
    env::var("STATIC_RESOURCE_ROOT").unwrap_or_else(|_| String::from("./static-resource"))
}

fn ffmpeg_path() -> String {
    env::var("FFMPEG_PATH").unwrap_or_else(|_| String::from("ffmpeg"))
}

/// Parse a numeric variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(parse_or("STATIC_RESOURCE_TEST_UNSET_VAR", 7usize), 7);
    }
}
