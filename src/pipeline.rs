//! Rasterization pipeline
//!
//! One run = debounce, settle resources, yield a frame, then try each capture
//! configuration strictly in order. The generation token is checked after
//! every suspension point; a superseded run ends with `Error::Stale` and
//! never reaches the caller's state.

use crate::catalog::ContentNode;
use crate::generation::GenerationToken;
use crate::readiness::ReadinessProbe;
use crate::rendering::{Bitmap, CaptureBackend, CaptureConfig};
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

/// Source of rendering frames (the analogue of `requestAnimationFrame`)
pub trait FrameClock: Send + Sync {
    fn next_frame(&self) -> BoxFuture<'_, ()>;
}

/// Frame clock driven by tokio timers
#[derive(Debug, Clone)]
pub struct TokioFrameClock {
    interval: Duration,
}

impl TokioFrameClock {
    pub fn new(interval_ms: u64) -> Self {
        Self { interval: Duration::from_millis(interval_ms) }
    }
}

impl Default for TokioFrameClock {
    fn default() -> Self {
        Self::new(16)
    }
}

impl FrameClock for TokioFrameClock {
    fn next_frame(&self) -> BoxFuture<'_, ()> {
        let interval = self.interval;
        async move {
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
        }
        .boxed()
    }
}

#[derive(Clone)]
pub struct RasterizationPipeline {
    probe: ReadinessProbe,
    backend: Arc<dyn CaptureBackend>,
    frames: Arc<dyn FrameClock>,
    debounce: Duration,
    capture_timeout_ms: u64,
}

impl RasterizationPipeline {
    pub fn new(probe: ReadinessProbe, backend: Arc<dyn CaptureBackend>, frames: Arc<dyn FrameClock>) -> Self {
        Self {
            probe,
            backend,
            frames,
            debounce: Duration::ZERO,
            capture_timeout_ms: 0,
        }
    }

    /// Delay before a run starts work, absorbing rapid navigation
    pub fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce = Duration::from_millis(debounce_ms);
        self
    }

    /// Bound each backend call (0 => unbounded)
    pub fn with_capture_timeout(mut self, timeout_ms: u64) -> Self {
        self.capture_timeout_ms = timeout_ms;
        self
    }

    /// Rasterize `node`, returning the first bitmap any configuration
    /// produces. `bitmap.attempt` records which one.
    pub async fn run(&self, node: &ContentNode, attempts: &[CaptureConfig], token: &GenerationToken) -> Result<Bitmap> {
        let generation = token.generation();
        if attempts.is_empty() {
            return Err(Error::RasterizationFailed { attempts: 0, last: "no capture configurations".into() });
        }

        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
            token.check()?;
        }

        let report = self.probe.settle(node).await;
        token.check()?;
        for w in report.warnings() {
            log::debug!("{} settle warning: {}", generation, w);
        }

        self.frames.next_frame().await;
        token.check()?;

        let mut last = String::new();
        for (i, config) in attempts.iter().enumerate() {
            log::debug!("{} capture attempt {} (scale={}, cors={}, taint={})", generation, i, config.scale, config.use_cors, config.allow_taint);
            let outcome = self.capture_once(node, config, i).await;
            token.check()?;
            match outcome {
                Ok(mut bitmap) => {
                    bitmap.attempt = i;
                    log::debug!("{} rasterized {}x{} on attempt {}", generation, bitmap.width, bitmap.height, i);
                    return Ok(bitmap);
                }
                Err(e) => {
                    log::warn!("{} {}", generation, e);
                    last = e.to_string();
                }
            }
        }

        log::error!("{} all {} capture configurations failed", generation, attempts.len());
        Err(Error::RasterizationFailed { attempts: attempts.len(), last })
    }

    async fn capture_once(&self, node: &ContentNode, config: &CaptureConfig, attempt: usize) -> Result<Bitmap> {
        let fut = self.backend.capture(node, config);
        let res = if self.capture_timeout_ms > 0 {
            match tokio::time::timeout(Duration::from_millis(self.capture_timeout_ms), fut).await {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout(self.capture_timeout_ms)),
            }
        } else {
            fut.await
        };
        res.map_err(|e| Error::CaptureFailed { attempt, reason: e.to_string() })
    }
}
