//! Resource readiness probe
//!
//! Waits until fonts report loaded and every image referenced by a content
//! node has either loaded or errored. The probe only answers "settled"; load
//! failures are logged and swallowed.

use crate::catalog::ContentNode;
use crate::{Error, Result};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Font loading facility (the analogue of `document.fonts`).
pub trait FontFaceSet: Send + Sync {
    /// Resolves once all declared faces have loaded
    fn ready(&self) -> BoxFuture<'_, Result<()>>;
}

/// Loads a single image source. Resolves on load or with an error.
pub trait ImageLoader: Send + Sync {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// How the font wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum FontReadiness {
    Loaded,
    /// No font facility was provided; treated as ready
    Unavailable,
    Failed(String),
}

/// What the probe observed. Informational only: a settled probe is always `Ok`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessReport {
    pub fonts: FontReadiness,
    pub images: usize,
    pub failed_images: Vec<String>,
}

impl ReadinessReport {
    /// Non-fatal warnings raised while settling
    pub fn warnings(&self) -> Vec<Error> {
        let mut out = Vec::new();
        if let FontReadiness::Failed(msg) = &self.fonts {
            out.push(Error::ResourceSettle(format!("fonts: {}", msg)));
        }
        for src in &self.failed_images {
            out.push(Error::ResourceSettle(format!("image {}", src)));
        }
        out
    }
}

/// Probe over a font facility (optional) and an image loader
#[derive(Clone)]
pub struct ReadinessProbe {
    fonts: Option<Arc<dyn FontFaceSet>>,
    images: Arc<dyn ImageLoader>,
}

impl ReadinessProbe {
    pub fn new(fonts: Option<Arc<dyn FontFaceSet>>, images: Arc<dyn ImageLoader>) -> Self {
        Self { fonts, images }
    }

    /// Wait for the node's resources to settle. Images are awaited
    /// concurrently; a broken or slow image only delays its own slot.
    pub async fn settle(&self, node: &ContentNode) -> ReadinessReport {
        let fonts = match &self.fonts {
            Some(set) => match set.ready().await {
                Ok(()) => FontReadiness::Loaded,
                Err(e) => {
                    log::warn!("font readiness failed, continuing: {}", e);
                    FontReadiness::Failed(e.to_string())
                }
            },
            None => {
                log::debug!("no font facility available; treating fonts as ready");
                FontReadiness::Unavailable
            }
        };

        let sources = node.image_sources();
        let loads = sources.iter().map(|src| {
            let images = self.images.clone();
            async move {
                match images.load(src).await {
                    Ok(()) => None,
                    Err(e) => {
                        log::warn!("image {} did not load: {}", src, e);
                        Some(src.clone())
                    }
                }
            }
        });
        let failed_images: Vec<String> = join_all(loads).await.into_iter().flatten().collect();

        log::debug!(
            "resources settled: fonts={:?} images={} failed={}",
            fonts,
            sources.len(),
            failed_images.len()
        );

        ReadinessReport { fonts, images: sources.len(), failed_images }
    }
}

/// Font set that is always ready
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyFonts;

impl FontFaceSet for ReadyFonts {
    fn ready(&self) -> BoxFuture<'_, Result<()>> {
        futures::future::ready(Ok(())).boxed()
    }
}

/// Outcome configured for one image in `StaticImages`
#[derive(Debug, Clone, PartialEq)]
pub enum ImageBehavior {
    Load,
    Fail(String),
    /// Load after the given delay
    Delay(u64),
}

/// In-memory image loader keyed by source. Unknown sources fail.
#[derive(Default)]
pub struct StaticImages {
    table: HashMap<String, ImageBehavior>,
    requested: Mutex<Vec<String>>,
}

impl StaticImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, src: impl Into<String>, behavior: ImageBehavior) -> Self {
        self.table.insert(src.into(), behavior);
        self
    }

    /// Sources requested so far, in request order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl ImageLoader for StaticImages {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<()>> {
        if let Ok(mut g) = self.requested.lock() {
            g.push(src.to_string());
        }
        let behavior = self.table.get(src).cloned();
        async move {
            match behavior {
                Some(ImageBehavior::Load) => Ok(()),
                Some(ImageBehavior::Fail(reason)) => Err(Error::LoadError(format!("{}: {}", src, reason))),
                Some(ImageBehavior::Delay(ms)) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(())
                }
                None => Err(Error::LoadError(format!("{}: unknown image", src))),
            }
        }
        .boxed()
    }
}

/// Fetches images over HTTP, resolving relative sources against an origin.
#[cfg(feature = "http")]
pub struct HttpImageLoader {
    client: reqwest::Client,
    base: url::Url,
}

#[cfg(feature = "http")]
impl HttpImageLoader {
    pub fn new(origin: &str, timeout_ms: u64) -> Result<Self> {
        let base = url::Url::parse(origin)
            .map_err(|e| Error::ConfigError(format!("invalid origin {}: {}", origin, e)))?;
        let mut builder = reqwest::Client::builder();
        if timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base })
    }
}

#[cfg(feature = "http")]
impl ImageLoader for HttpImageLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            if src.starts_with("data:") {
                return Ok(());
            }
            let target = self
                .base
                .join(src)
                .map_err(|e| Error::LoadError(format!("{}: {}", src, e)))?;
            let resp = self
                .client
                .get(target.clone())
                .send()
                .await
                .map_err(|e| Error::LoadError(format!("Failed to fetch {}: {}", target, e)))?;
            if !resp.status().is_success() {
                return Err(Error::LoadError(format!("{} returned {}", target, resp.status())));
            }
            resp.bytes()
                .await
                .map_err(|e| Error::LoadError(format!("Failed to read {}: {}", target, e)))?;
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenFonts;

    impl FontFaceSet for BrokenFonts {
        fn ready(&self) -> BoxFuture<'_, Result<()>> {
            futures::future::ready(Err(Error::LoadError("face 'Inter' missing".into()))).boxed()
        }
    }

    #[tokio::test]
    async fn broken_images_are_settled_not_fatal() {
        let images = Arc::new(
            StaticImages::new()
                .with("ok.png", ImageBehavior::Load)
                .with("bad.png", ImageBehavior::Fail("404".into())),
        );
        let probe = ReadinessProbe::new(Some(Arc::new(ReadyFonts)), images.clone());
        let node = ContentNode::new(r#"<div><img src="ok.png"><img src="bad.png"></div>"#);

        let report = probe.settle(&node).await;
        assert_eq!(report.fonts, FontReadiness::Loaded);
        assert_eq!(report.images, 2);
        assert_eq!(report.failed_images, vec!["bad.png".to_string()]);
        assert_eq!(report.warnings().len(), 1);
        assert_eq!(images.requested().len(), 2);
    }

    #[tokio::test]
    async fn missing_font_facility_is_treated_as_ready() {
        let probe = ReadinessProbe::new(None, Arc::new(StaticImages::new()));
        let report = probe.settle(&ContentNode::new("<p>text only</p>")).await;
        assert_eq!(report.fonts, FontReadiness::Unavailable);
        assert!(report.warnings().is_empty());
    }

    #[tokio::test]
    async fn font_failure_is_a_warning() {
        let probe = ReadinessProbe::new(Some(Arc::new(BrokenFonts)), Arc::new(StaticImages::new()));
        let report = probe.settle(&ContentNode::new("<p>x</p>")).await;
        assert!(matches!(report.fonts, FontReadiness::Failed(_)));
        assert!(matches!(report.warnings()[0], Error::ResourceSettle(_)));
    }

    #[tokio::test]
    async fn images_are_awaited_concurrently() {
        let images = Arc::new(
            StaticImages::new()
                .with("a.png", ImageBehavior::Delay(150))
                .with("b.png", ImageBehavior::Delay(150))
                .with("c.png", ImageBehavior::Delay(150)),
        );
        let probe = ReadinessProbe::new(None, images);
        let node = ContentNode::new(r#"<img src="a.png"><img src="b.png"><img src="c.png">"#);

        let started = std::time::Instant::now();
        let report = probe.settle(&node).await;
        assert!(report.failed_images.is_empty());
        // Sequential waits would take at least 450ms
        assert!(started.elapsed() < Duration::from_millis(400));
    }
}
