use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Maximum number of records accepted by the HAR batch endpoint.
    pub max_batch: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            max_batch: env::var("MAX_BATCH")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_batch: 500,
        }
    }
}
