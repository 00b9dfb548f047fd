use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Largest frame dimension accepted on either axis
pub const MAX_DIMENSION: u32 = 8192;
/// Highest accepted frame rate; one frame per millisecond
pub const MAX_FRAME_RATE: u32 = 1000;

/// Snapshot of the operating parameters of a device.
///
/// Resolution, frame rate and pixel format drive the capture loop; `controls`
/// carries named device controls (brightness, contrast, ...) that are passed
/// through to the device untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    #[serde(default)]
    pub controls: BTreeMap<String, i64>,
}

fn default_width() -> u32 {
    320
}
fn default_height() -> u32 {
    240
}
fn default_frame_rate() -> u32 {
    10
}
fn default_pixel_format() -> String {
    "GREY".to_string()
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
            pixel_format: default_pixel_format(),
            controls: BTreeMap::new(),
        }
    }
}

impl ParameterSet {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DomainError::InvalidConfiguration(format!(
                "Resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(DomainError::InvalidConfiguration(format!(
                "Resolution {}x{} exceeds {}x{}",
                self.width, self.height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }
        if self.frame_rate == 0 || self.frame_rate > MAX_FRAME_RATE {
            return Err(DomainError::InvalidConfiguration(format!(
                "Frame rate must be between 1 and {}, got {}",
                MAX_FRAME_RATE, self.frame_rate
            )));
        }
        if self.pixel_format.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "Pixel format cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Time between two frames at the configured rate
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / u64::from(self.frame_rate.max(1)))
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_control(mut self, name: impl Into<String>, value: i64) -> Self {
        self.controls.insert(name.into(), value);
        self
    }
}
