//! CLI configuration.
//!
//! A JSON file of the shape:
//!
//! ```json
//! {
//!   "tables": {"logs": "*", "errors": "* | level:ERROR"},
//!   "viewsDir": "./data/views"
//! }
//! ```
//!
//! Missing fields fall back to a single `logs` table matching everything
//! and `./data/views`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Translator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Table catalog entries.
    pub tables: BTreeMap<String, String>,
    /// Directory holding `.logsql` view files.
    pub views_dir: String,
}

impl Config {
    /// Parses a config from JSON text and applies defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: Config = serde_json::from_str(text)?;
        config.apply_defaults();
        Ok(config)
    }

    /// Fills in the default table catalog and views directory.
    pub fn apply_defaults(&mut self) {
        if self.tables.is_empty() {
            self.tables
                .insert("logs".to_string(), "*".to_string());
        }
        if self.views_dir.is_empty() {
            self.views_dir = "./data/views".to_string();
        }
    }
}
