//! Secure Viewer
//!
//! A step-by-step lesson viewer that rasterizes each step into a bitmap before
//! showing it, and applies best-effort copy friction while it is open.
//!
//! # Features
//!
//! - **Rasterization pipeline**: readiness probe, frame yield, and a ranked
//!   list of capture configurations tried in order
//! - **Generation tokens**: results from superseded navigations are dropped
//! - **Copy guard**: scoped listener handle for context menu, clipboard,
//!   selection, and a few shortcuts
//!
//! None of this is a security boundary. Screenshots, devtools, and network
//! inspection all bypass it.
//!
//! # Example
//!
//! ```no_run
//! use secure_viewer::{catalog, display::MemorySlot, Viewer, ViewerConfig, ViewerParts};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ViewerConfig { device_pixel_ratio: 2.0, ..Default::default() };
//! let slot = Arc::new(MemorySlot::new());
//! let parts = ViewerParts::software(&config, slot.clone())?;
//! let viewer = Viewer::new(catalog::default_catalog(), parts, config)?;
//!
//! viewer.start().await;
//! viewer.advance().await;
//! println!("step {} of {}", viewer.current_index() + 1, viewer.step_count());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod catalog;
pub mod display;
pub mod generation;
pub mod guard;
pub mod navigation;
pub mod pipeline;
pub mod readiness;
pub mod rendering;
pub mod viewer;

pub use catalog::{ContentNode, Step, StepCatalog};
pub use navigation::{Navigator, RenderStatus, Transition};
pub use rendering::{Bitmap, CaptureBackend, CaptureConfig};
pub use viewer::{Navigation, Viewer, ViewerParts};

/// Configuration for a viewer instance
///
/// Defaults: white background, a short debounce before capturing, and
/// navigation locked while a step is being prepared.
///
/// # Examples
///
/// ```
/// let cfg = secure_viewer::ViewerConfig::default();
/// assert_eq!(cfg.capture_attempts()[0].scale, 1.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Device pixel density; selects the capture scale
    pub device_pixel_ratio: f32,
    /// Layout viewport in CSS pixels
    pub viewport: Viewport,
    /// Canvas background colour
    pub background: String,
    /// Delay before a render starts work, in milliseconds
    pub debounce_ms: u64,
    /// Length of one rendering frame in milliseconds (0 => yield only)
    pub frame_interval_ms: u64,
    /// Per-capture timeout in milliseconds (0 => unbounded)
    pub capture_timeout_ms: u64,
    /// Refuse navigation while the current step is still pending
    pub lock_navigation_while_pending: bool,
    /// Origin the content is served from; used for cross-origin image checks
    pub origin: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            viewport: Viewport::default(),
            background: "#ffffff".to_string(),
            debounce_ms: 50,
            frame_interval_ms: 16,
            capture_timeout_ms: 15000,
            lock_navigation_while_pending: true,
            origin: "https://viewer.local/".to_string(),
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.device_pixel_ratio.is_finite() || self.device_pixel_ratio <= 0.0 {
            return Err(Error::ConfigError(format!(
                "device_pixel_ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must be non-empty".into()));
        }
        if rendering::paint::parse_color(&self.background).is_none() {
            return Err(Error::ConfigError(format!("unparseable background {}", self.background)));
        }
        url::Url::parse(&self.origin)
            .map_err(|e| Error::ConfigError(format!("invalid origin {}: {}", self.origin, e)))?;
        Ok(())
    }

    /// Ranked capture configurations for this device
    pub fn capture_attempts(&self) -> Vec<CaptureConfig> {
        rendering::default_attempts(self.device_pixel_ratio, &self.background)
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 1000,
        }
    }
}
