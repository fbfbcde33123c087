use serde::{Deserialize, Serialize};

use crate::{Result, TimelineScale};

pub const DEFAULT_ENVELOPE_FPS: f64 = 30.0;

/// Track bookkeeping rules applied by the edit engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditPolicy {
    /// Drop a track once its last overlay is moved or deleted away.
    #[serde(default)]
    pub remove_empty_tracks: bool,
    /// Extend the project when an overlay lands past its end; otherwise such
    /// a placement is an invalid range.
    #[serde(default = "default_true")]
    pub grow_duration: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            remove_empty_tracks: false,
            grow_duration: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub edit: EditPolicy,
    #[serde(default)]
    pub scale: TimelineScale,
    #[serde(default = "default_envelope_fps")]
    pub envelope_fps: f64,
}

fn default_envelope_fps() -> f64 {
    DEFAULT_ENVELOPE_FPS
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            edit: EditPolicy::default(),
            scale: TimelineScale::default(),
            envelope_fps: DEFAULT_ENVELOPE_FPS,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
