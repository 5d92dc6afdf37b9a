use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub api_base_url: String,
    pub session_file: String,
    pub camera_command: Option<String>,
    pub location_command: Option<String>,
    pub fixed_lat: Option<f64>,
    pub fixed_lon: Option<f64>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "presence".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/presence.log".into());
            let api_base_url = env::var("API_BASE_URL").expect("API_BASE_URL must be set");
            let session_file = env::var("SESSION_FILE").unwrap_or_else(|_| "session.json".into());
            let camera_command = env::var("CAMERA_COMMAND").ok();
            let location_command = env::var("LOCATION_COMMAND").ok();
            let fixed_lat = env::var("FIXED_LAT").ok().and_then(|v| v.parse().ok());
            let fixed_lon = env::var("FIXED_LON").ok().and_then(|v| v.parse().ok());

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            Config {
                project_name,
                log_level,
                log_file,
                api_base_url,
                session_file,
                camera_command,
                location_command,
                fixed_lat,
                fixed_lon,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
