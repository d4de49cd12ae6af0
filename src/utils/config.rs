use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub storage_dir: String,
    pub session_ttl_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            storage_dir: "/tmp/matchline".to_string(),
            session_ttl_seconds: 24 * 60 * 60, // 24h
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("API_BASE_URL") {
            config.api_base_url = base_url;
        }

        if let Ok(dir) = env::var("STORAGE_DIR") {
            config.storage_dir = dir;
        }

        if let Ok(ttl) = env::var("SESSION_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse::<u64>() {
                config.session_ttl_seconds = seconds;
            }
        }

        config
    }
}
