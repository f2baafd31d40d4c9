//! Presentation parameters shared by the exporter and the viewer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// How a motion comparison is laid out, paced and filmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Playback interval between frames in milliseconds. Also sets the export frame rate.
    pub interval_ms: u32,
    /// Physical time one frame of motion represents, used for the time label.
    pub frame_time_ms: u32,
    /// Camera elevation above the ground plane, degrees.
    pub elevation_deg: f64,
    /// Camera azimuth around the vertical axis, degrees.
    pub azimuth_deg: f64,
    /// Extra space around the figure, as a fraction of the largest extent.
    pub margin: f64,
    /// Pixel size of one panel in exported files.
    pub panel_size: u32,
    /// Bone stroke width in pixels.
    pub line_width: f32,
    /// Head marker radius in pixels.
    pub head_radius: f32,
    /// Caption text height in exported frames, pixels.
    pub font_size: f32,
    /// Joint placed at the origin of every frame. `None` keeps world coordinates.
    pub center_joint: Option<usize>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            frame_time_ms: 40,
            elevation_deg: 15.0,
            azimuth_deg: 0.0,
            margin: 0.2,
            panel_size: 320,
            line_width: 3.0,
            head_radius: 5.0,
            font_size: 14.0,
            center_joint: Some(0),
        }
    }
}

impl ViewConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ViewConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the exporter cannot lay out.
    pub fn validate(&self) -> Result<(), ParseError> {
        // the bounds cube has half-extent range * (0.5 + margin)
        if !(self.margin.is_finite() && self.margin > -0.5) {
            return Err(ParseError::Config(format!("margin must be greater than -0.5, got {}", self.margin)));
        }
        if self.panel_size == 0 {
            return Err(ParseError::Config("panel_size must be positive".to_string()));
        }
        for (name, value) in [
            ("line_width", self.line_width),
            ("head_radius", self.head_radius),
            ("font_size", self.font_size),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParseError::Config(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        Ok(())
    }

    /// Export frame rate derived from the playback interval, never below 1.
    pub fn fps(&self) -> u32 {
        (1000 / self.interval_ms.max(1)).max(1)
    }
}
