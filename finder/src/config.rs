use crate::error::{FinderError, Result};
use serde::{Deserialize, Serialize};

/// Page-level settings. Every field has a default so a partial JSON object
/// (or `{}`) is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Marker labels are drawn only when the zoom level is above this.
    pub detail_zoom_threshold: u8,
    pub viewport_debounce_ms: u32,
    /// Print view: gif icons and a cap on visible facilities.
    pub print: bool,
    pub max_markers_to_print: usize,
    pub detail_timeout_ms: u32,
    /// Pixel padding used to match the clusterer's extended bounds.
    pub cluster_grid_size: f64,
    pub bubble_url: String,
    pub edit_url: String,
    pub subscribe_url: String,
    pub purge_url: String,
    pub logged_in: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        FinderConfig {
            detail_zoom_threshold: 10,
            viewport_debounce_ms: 250,
            print: false,
            max_markers_to_print: 50,
            detail_timeout_ms: 10_000,
            cluster_grid_size: 60.0,
            bubble_url: "/bubble".to_string(),
            edit_url: "/edit".to_string(),
            subscribe_url: "/subscribe".to_string(),
            purge_url: "/purge".to_string(),
            logged_in: false,
        }
    }
}

impl FinderConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: FinderConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cluster_grid_size.is_finite() || self.cluster_grid_size < 0.0 {
            return Err(FinderError::Config(format!(
                "cluster_grid_size must be a non-negative number, got {}",
                self.cluster_grid_size
            )));
        }
        if self.print && self.max_markers_to_print == 0 {
            return Err(FinderError::Config(
                "max_markers_to_print must be positive in print view".to_string(),
            ));
        }
        Ok(())
    }

    /// Cap on visible facilities, only in print view.
    pub fn visible_limit(&self) -> Option<usize> {
        if self.print {
            Some(self.max_markers_to_print)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = FinderConfig::from_json("{}").unwrap();
        assert_eq!(cfg, FinderConfig::default());
        assert_eq!(cfg.visible_limit(), None);
    }

    #[test]
    fn partial_override() {
        let cfg = FinderConfig::from_json(r#"{"print": true, "max_markers_to_print": 3}"#).unwrap();
        assert_eq!(cfg.visible_limit(), Some(3));
        assert_eq!(cfg.detail_zoom_threshold, 10);
    }

    #[test]
    fn rejects_bad_grid() {
        let err = FinderConfig::from_json(r#"{"cluster_grid_size": -1}"#).unwrap_err();
        assert_eq!(err.code(), "config");
    }
}
