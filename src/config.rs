use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layout::{
    DEFAULT_COLUMN_GAP, DEFAULT_MAX_CARD_WIDTH, DEFAULT_MIN_CARD_WIDTH, LayoutMetrics,
};
use crate::theme::ThemePreset;

const DEFAULT_THEME: &str = "default";
const DEFAULT_PROVIDER_COMMAND: &str = "reminders";
const MAX_DAYS_AHEAD: u32 = 365;
const MIN_AUTO_REFRESH_SECS: u64 = 30;
const MAX_AUTO_REFRESH_SECS: u64 = 3_600;
const MIN_CARD_WIDTH_FLOOR: u16 = 10;
const MIN_CARD_WIDTH_CEILING: u16 = 60;
const MAX_COLUMN_GAP: u16 = 8;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
const MAX_PROVIDER_TIMEOUT_SECS: u64 = 600;

/// Choices offered by the settings overlay. Zero shows everything.
pub const DAYS_AHEAD_OPTIONS: [u32; 6] = [0, 1, 3, 7, 14, 30];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider_command: String,
    pub provider_timeout_secs: u64,
    pub theme: String,
    pub days_ahead: u32,
    pub show_sidebar: bool,
    pub auto_refresh_secs: u64,
    pub column_order: Vec<String>,
    pub layout: LayoutConfig,
    pub enabled_lists: BTreeMap<String, bool>,
    pub list_colors: BTreeMap<String, String>,
    pub keybindings: HashMap<String, Vec<String>>,
    /// Shell command templates keyed by the key that runs them.
    pub commands: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub min_card_width: u16,
    pub max_card_width: u16,
    pub column_gap: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_card_width: DEFAULT_MIN_CARD_WIDTH,
            max_card_width: DEFAULT_MAX_CARD_WIDTH,
            column_gap: DEFAULT_COLUMN_GAP,
        }
    }
}

impl From<LayoutConfig> for LayoutMetrics {
    fn from(config: LayoutConfig) -> Self {
        Self {
            min_card_width: config.min_card_width,
            max_card_width: config.max_card_width,
            column_gap: config.column_gap,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_command: DEFAULT_PROVIDER_COMMAND.to_string(),
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            theme: DEFAULT_THEME.to_string(),
            days_ahead: 0,
            show_sidebar: true,
            auto_refresh_secs: 0,
            column_order: Vec::new(),
            layout: LayoutConfig::default(),
            enabled_lists: BTreeMap::new(),
            list_colors: BTreeMap::new(),
            keybindings: HashMap::new(),
            commands: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("reminders-dashboard");
        path.push("config.toml");
        Some(path)
    }

    /// Loads from `path`, or the default location when `None`.
    ///
    /// Never fails: a missing or unreadable file yields defaults, and each
    /// invalid field is replaced by its default on its own.
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => Self::default(),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match contents.parse::<toml::Table>() {
                Ok(table) => {
                    let mut config = Self::from_table(&table, path);
                    config.validate();
                    config
                }
                Err(error) => {
                    warn!("failed to parse config '{}': {}", path.display(), error);
                    Self::default()
                }
            },
            Err(error) => {
                warn!("failed to read config '{}': {}", path.display(), error);
                Self::default()
            }
        }
    }

    fn from_table(table: &toml::Table, path: &Path) -> Self {
        let mut config = Self::default();
        let origin = path.display().to_string();

        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("unknown key '{}' in config '{}'; ignoring", key, origin);
            }
        }

        take_field(table, "provider_command", &mut config.provider_command, &origin);
        take_field(
            table,
            "provider_timeout_secs",
            &mut config.provider_timeout_secs,
            &origin,
        );
        take_field(table, "theme", &mut config.theme, &origin);
        take_field(table, "days_ahead", &mut config.days_ahead, &origin);
        take_field(table, "show_sidebar", &mut config.show_sidebar, &origin);
        take_field(table, "auto_refresh_secs", &mut config.auto_refresh_secs, &origin);
        take_field(table, "column_order", &mut config.column_order, &origin);
        take_field(table, "enabled_lists", &mut config.enabled_lists, &origin);
        take_field(table, "list_colors", &mut config.list_colors, &origin);
        take_field(table, "keybindings", &mut config.keybindings, &origin);
        take_field(table, "commands", &mut config.commands, &origin);

        match table.get("layout") {
            Some(toml::Value::Table(layout)) => {
                let layout_origin = format!("{origin} [layout]");
                take_field(
                    layout,
                    "min_card_width",
                    &mut config.layout.min_card_width,
                    &layout_origin,
                );
                take_field(
                    layout,
                    "max_card_width",
                    &mut config.layout.max_card_width,
                    &layout_origin,
                );
                take_field(layout, "column_gap", &mut config.layout.column_gap, &layout_origin);
            }
            Some(other) => warn!(
                "invalid 'layout' in config '{}': expected a table, found {}; using defaults",
                origin,
                other.type_str()
            ),
            None => {}
        }

        config
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid config path '{}'", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize config to TOML")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid config file name '{}'", path.display()))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!("failed to write temporary config '{}'", tmp_path.display())
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to atomically rename config '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn validate(&mut self) {
        if self.provider_command.trim().is_empty() {
            warn!("empty provider_command in config; falling back to '{DEFAULT_PROVIDER_COMMAND}'");
            self.provider_command = DEFAULT_PROVIDER_COMMAND.to_string();
        }

        self.provider_timeout_secs = self
            .provider_timeout_secs
            .clamp(1, MAX_PROVIDER_TIMEOUT_SECS);

        self.theme = match ThemePreset::from_str(&self.theme) {
            Ok(preset) => preset.as_str().to_string(),
            Err(()) => {
                warn!("invalid theme '{}' in config; falling back to default", self.theme);
                DEFAULT_THEME.to_string()
            }
        };

        if self.days_ahead > MAX_DAYS_AHEAD {
            warn!(
                "days_ahead {} exceeds {}; clamping",
                self.days_ahead, MAX_DAYS_AHEAD
            );
            self.days_ahead = MAX_DAYS_AHEAD;
        }

        if self.auto_refresh_secs != 0 {
            self.auto_refresh_secs = self
                .auto_refresh_secs
                .clamp(MIN_AUTO_REFRESH_SECS, MAX_AUTO_REFRESH_SECS);
        }

        self.layout.min_card_width = self
            .layout
            .min_card_width
            .clamp(MIN_CARD_WIDTH_FLOOR, MIN_CARD_WIDTH_CEILING);
        self.layout.max_card_width = self.layout.max_card_width.max(self.layout.min_card_width);
        self.layout.column_gap = self.layout.column_gap.min(MAX_COLUMN_GAP);

        let mut seen = Vec::with_capacity(self.column_order.len());
        self.column_order.retain(|name| {
            if name.trim().is_empty() || seen.contains(name) {
                return false;
            }
            seen.push(name.clone());
            true
        });
    }

    pub fn theme_preset(&self) -> ThemePreset {
        ThemePreset::from_str(&self.theme).unwrap_or_default()
    }

    /// Lists missing from `enabled_lists` count as enabled.
    pub fn is_list_enabled(&self, category: &str) -> bool {
        self.enabled_lists.get(category).copied().unwrap_or(true)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn layout_metrics(&self) -> LayoutMetrics {
        self.layout.into()
    }
}

const KNOWN_KEYS: &[&str] = &[
    "provider_command",
    "provider_timeout_secs",
    "theme",
    "days_ahead",
    "show_sidebar",
    "auto_refresh_secs",
    "column_order",
    "layout",
    "enabled_lists",
    "list_colors",
    "keybindings",
    "commands",
];

fn take_field<T: DeserializeOwned>(table: &toml::Table, key: &str, target: &mut T, origin: &str) {
    let Some(value) = table.get(key) else {
        return;
    };
    match value.clone().try_into::<T>() {
        Ok(parsed) => *target = parsed,
        Err(error) => warn!(
            "invalid '{}' in config '{}': {}; using default",
            key,
            origin,
            error.to_string().trim()
        ),
    }
}
