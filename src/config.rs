use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub source_dir: PathBuf,
    pub env_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let env_name = env::var("JACKC_ENV").unwrap_or_else(|_| String::from("default"));

        let source_dir = if let Ok(custom_dir) = env::var("JACKC_SRC_DIR") {
            PathBuf::from(custom_dir)
        } else {
            PathBuf::from(".")
        };

        Config {
            source_dir,
            env_name,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        if !config_path.exists() {
            let config = Config::default();
            config.save().unwrap_or_default();
            return config;
        }

        match fs::read_to_string(&config_path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Config::default(),
        }
    }

    pub fn save(&self) -> io::Result<()> {
        let config_path = Self::get_config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)
    }

    pub fn get_config_path() -> PathBuf {
        let env_name = env::var("JACKC_ENV").unwrap_or_else(|_| String::from("default"));
        let home = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        PathBuf::from(env::var(home).unwrap_or_else(|_| String::from(".")))
            .join(".jackc")
            .join(&env_name)
            .join("config.json")
    }
}
