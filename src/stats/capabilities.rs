//! Per-deployment descriptor of which optional record fields are stored.
//!
//! A deployment that never captures, say, playback validity disables the
//! corresponding capability; writes then skip the column and reads ignore
//! filters on it. All capabilities default to enabled.

use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCapabilities {
    /// Playbacks carry a valid/invalid flag
    #[serde(default = "enabled")]
    pub playback_validity: bool,
    /// Playbacks carry a played_at timestamp
    #[serde(default = "enabled")]
    pub playback_timestamps: bool,
    /// Playbacks carry a directly attributed artist id
    #[serde(default = "enabled")]
    pub playback_artists: bool,
    /// Playbacks carry a label id
    #[serde(default = "enabled")]
    pub playback_labels: bool,
    /// Ratings carry a directly attributed artist id
    #[serde(default = "enabled")]
    pub rating_artists: bool,
    /// Ratings carry a rated_at timestamp
    #[serde(default = "enabled")]
    pub rating_timestamps: bool,
}

impl Default for FieldCapabilities {
    fn default() -> Self {
        FieldCapabilities {
            playback_validity: true,
            playback_timestamps: true,
            playback_artists: true,
            playback_labels: true,
            rating_artists: true,
            rating_timestamps: true,
        }
    }
}

impl FieldCapabilities {
    /// (table, column) pairs that must exist for the enabled capabilities.
    pub fn required_columns(&self) -> Vec<(&'static str, &'static str)> {
        let mut columns = Vec::new();
        if self.playback_validity {
            columns.push(("playbacks", "valid"));
        }
        if self.playback_timestamps {
            columns.push(("playbacks", "played_at"));
        }
        if self.playback_artists {
            columns.push(("playbacks", "artist_id"));
        }
        if self.playback_labels {
            columns.push(("playbacks", "label_id"));
        }
        if self.rating_artists {
            columns.push(("ratings", "artist_id"));
        }
        if self.rating_timestamps {
            columns.push(("ratings", "rated_at"));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_all_enabled() {
        let capabilities = FieldCapabilities::default();
        assert!(capabilities.playback_validity);
        assert!(capabilities.playback_timestamps);
        assert!(capabilities.playback_artists);
        assert!(capabilities.playback_labels);
        assert!(capabilities.rating_artists);
        assert!(capabilities.rating_timestamps);
    }

    #[test]
    fn empty_toml_table_means_all_enabled() {
        let capabilities: FieldCapabilities = toml::from_str("").unwrap();
        assert_eq!(capabilities, FieldCapabilities::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_flags() {
        let capabilities: FieldCapabilities = toml::from_str(
            "playback_labels = false\nrating_artists = false\n",
        )
        .unwrap();
        assert!(!capabilities.playback_labels);
        assert!(!capabilities.rating_artists);
        assert!(capabilities.playback_validity);
        assert!(capabilities.rating_timestamps);
    }

    #[test]
    fn disabled_capabilities_drop_required_columns() {
        let capabilities = FieldCapabilities {
            playback_validity: false,
            playback_timestamps: true,
            playback_artists: false,
            playback_labels: false,
            rating_artists: true,
            rating_timestamps: true,
        };
        let columns = capabilities.required_columns();
        assert_eq!(
            columns,
            vec![
                ("playbacks", "played_at"),
                ("ratings", "artist_id"),
                ("ratings", "rated_at"),
            ]
        );
    }
}
