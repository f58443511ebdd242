//! Persisted user preferences. The browser original kept these in local
//! storage (selected model, show-code flag, dataset folder); here they live
//! in a JSON file under the user config directory, read once at startup and
//! written back whenever a setting changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging;

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_auto_fix() -> bool {
    true
}

fn default_auto_fix_attempts() -> u32 {
    3
}

fn default_options() -> Vec<String> {
    vec!["svg".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub show_code: bool,
    #[serde(default = "default_auto_fix")]
    pub auto_fix: bool,
    #[serde(default = "default_auto_fix_attempts")]
    pub auto_fix_attempts: u32,
    /// Execution options forwarded with every code submission (e.g. "svg").
    #[serde(default = "default_options")]
    pub options: Vec<String>,
    #[serde(default)]
    pub foundry_folder: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            model: default_model(),
            show_code: false,
            auto_fix: default_auto_fix(),
            auto_fix_attempts: default_auto_fix_attempts(),
            options: default_options(),
            foundry_folder: None,
        }
    }
}

impl Preferences {
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Missing or unreadable files fall back to defaults; a corrupt file is
    /// reported to the diagnostic log rather than aborting startup.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(prefs) => prefs,
                Err(error) => {
                    logging::log_error("prefs", &error);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        if let Err(error) = self.save_to(&Self::path()) {
            logging::log_error("prefs", &error);
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn path() -> PathBuf {
        if let Ok(path) = std::env::var("CODECHAT_PREFS_PATH") {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/codechat/prefs.json")
        } else {
            PathBuf::from("prefs.json")
        }
    }
}
