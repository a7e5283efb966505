//! Capture backends: turn a content node into a bitmap

pub mod layout;
pub mod paint;
pub mod raster;

use crate::catalog::ContentNode;
use crate::{Error, Result, Viewport};
use base64::Engine as _;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A rasterized step
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
    /// Cross-origin pixels were drawn without CORS clearance
    pub tainted: bool,
    /// Index of the capture configuration that produced this bitmap
    pub attempt: usize,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, png_data: Vec<u8>) -> Self {
        Self { width, height, png_data, tainted: false, attempt: 0 }
    }

    /// `data:image/png;base64,...` for embedding in a page
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png_data)
        )
    }

    /// Hex sha256 of the PNG bytes
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }
}

/// One entry of the ranked fallback list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub use_cors: bool,
    pub allow_taint: bool,
    pub foreign_object_rendering: bool,
    pub scale: f32,
    pub background: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            use_cors: true,
            allow_taint: false,
            foreign_object_rendering: false,
            scale: 1.5,
            background: "#ffffff".to_string(),
        }
    }
}

/// Capture scale: 2 on high-density displays, 1.5 otherwise.
pub fn capture_scale(device_pixel_ratio: f32) -> f32 {
    if device_pixel_ratio > 1.0 {
        2.0
    } else {
        1.5
    }
}

/// The ranked configuration list used by the viewer: CORS first, then a
/// tainting fallback, then foreignObject rendering.
pub fn default_attempts(device_pixel_ratio: f32, background: &str) -> Vec<CaptureConfig> {
    let scale = capture_scale(device_pixel_ratio);
    let base = CaptureConfig { scale, background: background.to_string(), ..CaptureConfig::default() };
    vec![
        base.clone(),
        CaptureConfig { use_cors: false, allow_taint: true, ..base.clone() },
        CaptureConfig { foreign_object_rendering: true, ..base },
    ]
}

/// Rendering backend collaborator. Implementations may fail; the pipeline
/// treats them as opaque.
pub trait CaptureBackend: Send + Sync {
    fn capture<'a>(&'a self, node: &'a ContentNode, config: &'a CaptureConfig) -> BoxFuture<'a, Result<Bitmap>>;
}

/// Pure-Rust backend built on the layout/paint/raster stages
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    viewport: Viewport,
    origin: url::Url,
}

impl SoftwareBackend {
    pub fn new(viewport: Viewport, origin: &str) -> Result<Self> {
        let origin = url::Url::parse(origin)
            .map_err(|e| Error::ConfigError(format!("invalid origin {}: {}", origin, e)))?;
        Ok(Self { viewport, origin })
    }

    fn is_cross_origin(&self, src: &str) -> bool {
        match self.origin.join(src) {
            Ok(u) if u.scheme() == "data" => false,
            Ok(u) => u.origin() != self.origin.origin(),
            Err(_) => true,
        }
    }

    /// Synchronous capture. The parsed tree never crosses an await point.
    pub fn render(&self, node: &ContentNode, config: &CaptureConfig) -> Result<Bitmap> {
        if config.foreign_object_rendering {
            return Err(Error::RenderError("foreignObject rendering is not supported by the software backend".into()));
        }
        let background = paint::parse_color(&config.background)
            .ok_or_else(|| Error::RenderError(format!("unparseable background {}", config.background)))?;

        let document = node.parse();
        let layout = layout::layout_fragment(&document, self.viewport)?;

        let mut tainted = false;
        let cmds = paint::paint_layout(&layout, background, |src| {
            if !self.is_cross_origin(src) || config.use_cors {
                return true;
            }
            if config.allow_taint {
                tainted = true;
                return true;
            }
            log::debug!("skipping cross-origin image {} (no CORS, taint not allowed)", src);
            false
        });

        let mut bitmap = raster::rasterize(layout.width, layout.height, config.scale, &cmds)?;
        bitmap.tainted = tainted;
        Ok(bitmap)
    }
}

impl CaptureBackend for SoftwareBackend {
    fn capture<'a>(&'a self, node: &'a ContentNode, config: &'a CaptureConfig) -> BoxFuture<'a, Result<Bitmap>> {
        futures::future::ready(self.render(node, config)).boxed()
    }
}
