use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "clubhouse";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubEvent {
    pub name: String,
    pub date: String,  // Free-form, shown as written ("Sat 14 Nov")
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Shown in the home screen header
    #[serde(default = "default_club_name")]
    pub club_name: String,

    /// Where preferences are stored (defaults to the platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Desktop notification when the name is saved from the CLI
    #[serde(default)]
    pub notifications: bool,

    /// Home feed
    #[serde(default = "default_announcements")]
    pub announcements: Vec<Announcement>,

    #[serde(default = "default_events")]
    pub events: Vec<ClubEvent>,

    /// Color overrides, e.g. `accent = "#FFC107"`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub theme: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            club_name: default_club_name(),
            data_dir: None,
            notifications: false,
            announcements: default_announcements(),
            events: default_events(),
            theme: HashMap::new(),
        }
    }
}

fn default_club_name() -> String {
    "Clubhouse".to_string()
}

fn default_announcements() -> Vec<Announcement> {
    vec![
        Announcement {
            title: "Welcome!".to_string(),
            body: "Set your member name on the Membership screen.".to_string(),
        },
        Announcement {
            title: "Clubhouse hours".to_string(),
            body: "Open weekdays 6pm-10pm and weekends from noon.".to_string(),
        },
    ]
}

fn default_events() -> Vec<ClubEvent> {
    vec![
        ClubEvent {
            name: "Monthly meetup".to_string(),
            date: "First Friday".to_string(),
            location: "Main hall".to_string(),
        },
        ClubEvent {
            name: "Open house".to_string(),
            date: "Last Saturday".to_string(),
            location: "Clubhouse".to_string(),
        },
    ]
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file. A missing file gives the defaults, which are
    /// written back only when `write_default` is set.
    pub fn load(write_default: bool) -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Ok(Self::load_from(&path, write_default)),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    fn load_from(path: &Path, write_default: bool) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Keep the user's broken file around rather than overwriting it
            return AppConfig::default();
        }

        let config = AppConfig::default();
        if write_default {
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Could not write default config: {}", e);
            }
        }
        config
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to file
    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the preference store
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join(APP_DIR);
        Ok(dir)
    }
}
