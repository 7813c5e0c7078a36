use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub generation: GenerationConfig,
    pub events: EventsConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// Generative-service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the OpenAI-compatible text endpoint.
    pub text_base_url: String,
    /// Base URL of the image generation endpoint.
    pub image_base_url: String,
    /// Model identifier sent with every text request.
    pub model: String,
    /// Model identifier sent with every image request.
    pub image_model: String,
    /// Token budget per text request.
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

/// Bonus-event sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Interval in seconds between due-event sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            generation: GenerationConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            text_base_url: "https://api.openai.com/v1".to_string(),
            image_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            max_tokens: 1024,
            api_key_env: "PITCHCRAFT_API_KEY".to_string(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/pitchcraft/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e} — using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {} — using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("pitchcraft"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pitchcraft").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
