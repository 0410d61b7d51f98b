#![forbid(unsafe_code)]

//! Workbench configuration.
//!
//! [`WorkbenchConfig`] can be loaded from TOML or JSON; every field has a
//! default, so partial documents only override what they name.
//!
//! ```toml
//! [layout]
//! main_area_initial_part_id = "part.editor"
//!
//! [panels]
//! left_width = 280
//!
//! [store]
//! max_pending = 16
//! max_outcomes = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use workbench_layout::activity::{DEFAULT_PANEL_HEIGHT, DEFAULT_PANEL_RATIO, DEFAULT_PANEL_WIDTH};
use workbench_layout::{
    Align, DEFAULT_RATIO, Layout, MAIN_AREA_INITIAL_PART, Panel, Panels, PartSpec,
};

use crate::error::ConfigError;

pub const DEFAULT_KEY_PREFIX: &str = "workbench.perspective.";
pub const DEFAULT_MAX_PENDING: usize = 64;
pub const DEFAULT_MAX_OUTCOMES: usize = crate::store::DEFAULT_OUTCOME_CAPACITY;

// ---------------------------------------------------------------------------
// Top-level WorkbenchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub layout: LayoutConfig,
    pub panels: PanelConfig,
    pub storage: StorageConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Id of the part the main-area grid starts with.
    pub main_area_initial_part_id: String,
    /// Ratio used by [`WorkbenchConfig::part_spec`].
    pub default_split_ratio: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            main_area_initial_part_id: MAIN_AREA_INITIAL_PART.to_owned(),
            default_split_ratio: DEFAULT_RATIO,
        }
    }
}

/// Initial sizes of the activity panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub left_width: u32,
    pub left_ratio: f64,
    pub right_width: u32,
    pub right_ratio: f64,
    pub bottom_height: u32,
    pub bottom_ratio: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            left_width: DEFAULT_PANEL_WIDTH,
            left_ratio: DEFAULT_PANEL_RATIO,
            right_width: DEFAULT_PANEL_WIDTH,
            right_ratio: DEFAULT_PANEL_RATIO,
            bottom_height: DEFAULT_PANEL_HEIGHT,
            bottom_ratio: DEFAULT_PANEL_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix prepended to perspective ids to form storage keys.
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of navigations waiting in the queue.
    pub max_pending: usize,
    /// Settled navigation outcomes kept for `take_outcome`; oldest go first.
    pub max_outcomes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
            max_outcomes: DEFAULT_MAX_OUTCOMES,
        }
    }
}

impl WorkbenchConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.layout.main_area_initial_part_id.trim().is_empty() {
            errors.push("layout.main_area_initial_part_id must not be empty".into());
        }
        check_ratio(
            &mut errors,
            "layout.default_split_ratio",
            self.layout.default_split_ratio,
        );

        check_ratio(&mut errors, "panels.left_ratio", self.panels.left_ratio);
        check_ratio(&mut errors, "panels.right_ratio", self.panels.right_ratio);
        check_ratio(&mut errors, "panels.bottom_ratio", self.panels.bottom_ratio);

        if self.storage.key_prefix.is_empty() {
            errors.push("storage.key_prefix must not be empty".into());
        }
        if self.store.max_pending == 0 {
            errors.push("store.max_pending must be > 0".into());
        }
        if self.store.max_outcomes == 0 {
            errors.push("store.max_outcomes must be > 0".into());
        }

        errors
    }

    /// `self` when [`validate`](Self::validate) finds nothing to complain about.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn panels(&self) -> Panels {
        Panels {
            left: Panel {
                size: self.panels.left_width,
                ratio: self.panels.left_ratio,
            },
            right: Panel {
                size: self.panels.right_width,
                ratio: self.panels.right_ratio,
            },
            bottom: Panel {
                size: self.panels.bottom_height,
                ratio: self.panels.bottom_ratio,
            },
        }
    }

    /// Empty layout shaped by this configuration.
    #[must_use]
    pub fn initial_layout(&self) -> Layout {
        Layout::with_initial_part(self.layout.main_area_initial_part_id.as_str())
            .with_panels(self.panels())
    }

    /// Placement request using the configured default split ratio.
    #[must_use]
    pub fn part_spec(&self, align: Align) -> PartSpec {
        PartSpec::new(align).ratio(self.layout.default_split_ratio)
    }

    #[must_use]
    pub fn storage_key(&self, perspective_id: &str) -> String {
        format!("{}{perspective_id}", self.storage.key_prefix)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn check_ratio(errors: &mut Vec<String>, field: &str, value: f64) {
    if !(value > 0.0 && value < 1.0) {
        errors.push(format!("{field} must be in (0, 1), got {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workbench_layout::{GridName, PanelSide};

    #[test]
    fn default_validates_clean() {
        assert!(WorkbenchConfig::default().validate().is_empty());
    }

    #[test]
    fn default_matches_layout_defaults() {
        let config = WorkbenchConfig::default();
        assert_eq!(config.panels(), Panels::default());
        assert_eq!(config.initial_layout(), Layout::new());
        assert_eq!(config.storage_key("debug"), "workbench.perspective.debug");
    }

    #[test]
    fn partial_toml_preserves_defaults() {
        let config = WorkbenchConfig::from_toml_str(
            r#"
            [layout]
            main_area_initial_part_id = "part.editor"

            [panels]
            left_width = 280
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.layout.main_area_initial_part_id, "part.editor");
        assert_eq!(config.layout.default_split_ratio, DEFAULT_RATIO);
        assert_eq!(config.panels.left_width, 280);
        assert_eq!(config.panels.right_width, DEFAULT_PANEL_WIDTH);
        assert_eq!(config.store.max_pending, DEFAULT_MAX_PENDING);

        let layout = config.initial_layout();
        assert!(layout.part("part.editor").is_some());
        assert!(layout.grid(&GridName::MainArea).is_some());
        assert_eq!(layout.activity_layout().panels.get(PanelSide::Left).size, 280);
    }

    #[test]
    fn json_loads_nested_sections() {
        let config = WorkbenchConfig::from_json_str(
            r#"{"storage": {"key_prefix": "app."}, "store": {"max_pending": 4}}"#,
        )
        .expect("valid json");
        assert_eq!(config.storage_key("main"), "app.main");
        assert_eq!(config.store.max_pending, 4);
        assert_eq!(config.store.max_outcomes, DEFAULT_MAX_OUTCOMES);
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        assert!(matches!(
            WorkbenchConfig::from_toml_str("[layout"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            WorkbenchConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = WorkbenchConfig::from_toml_file("/nonexistent/workbench.toml")
            .expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/workbench.toml"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = WorkbenchConfig::default();
        config.layout.main_area_initial_part_id = " ".into();
        config.layout.default_split_ratio = 1.0;
        config.panels.bottom_ratio = 0.0;
        config.store.max_pending = 0;
        config.store.max_outcomes = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(matches!(
            config.validated(),
            Err(ConfigError::Validation(errors)) if errors.len() == 5
        ));
    }

    #[test]
    fn part_spec_uses_configured_ratio() {
        let mut config = WorkbenchConfig::default();
        config.layout.default_split_ratio = 0.3;
        let layout = Layout::new()
            .add_part(
                "part.side",
                &workbench_layout::PartPlacement::Relative(config.part_spec(Align::Left)),
                &workbench_layout::PartOptions::default(),
            )
            .expect("added");
        let grid = layout.grid(&GridName::Main).expect("main grid");
        let root = grid
            .root()
            .and_then(|root| grid.node(root.as_str()))
            .expect("split");
        assert!((root.ratio - 0.3).abs() < f64::EPSILON);
    }
}
