//! The viewer: navigator + pipeline + output slot + copy guard
//!
//! `Viewer` is a cheap-to-clone handle. Navigation methods resolve once the
//! render they trigger has settled (or been superseded), so callers that want
//! overlapping navigation spawn them.

use crate::catalog::{Step, StepCatalog};
use crate::display::OutputSlot;
use crate::generation::GenerationToken;
use crate::guard::{CopyGuard, EventSurface, GuardHandle};
use crate::navigation::{Navigator, RenderStatus, Transition};
use crate::pipeline::{FrameClock, RasterizationPipeline, TokioFrameClock};
use crate::readiness::{FontFaceSet, ImageLoader, ReadinessProbe, ReadyFonts};
use crate::rendering::{CaptureBackend, CaptureConfig, SoftwareBackend};
use crate::{Error, Result, ViewerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shown in the slot when every capture configuration failed
pub const FAILURE_MESSAGE: &str = "This step could not be prepared. Navigate away and back to try again.";

/// Collaborators the viewer is wired to
#[derive(Clone)]
pub struct ViewerParts {
    pub backend: Arc<dyn CaptureBackend>,
    pub images: Arc<dyn ImageLoader>,
    pub fonts: Option<Arc<dyn FontFaceSet>>,
    pub frames: Arc<dyn FrameClock>,
    pub slot: Arc<dyn OutputSlot>,
    pub events: Option<Arc<dyn EventSurface>>,
}

impl ViewerParts {
    /// Software backend, tokio frames, always-ready fonts, and an image loader
    /// appropriate for the enabled features. No event surface.
    pub fn software(config: &ViewerConfig, slot: Arc<dyn OutputSlot>) -> Result<Self> {
        let backend = SoftwareBackend::new(config.viewport, &config.origin)?;

        #[cfg(feature = "http")]
        let images: Arc<dyn ImageLoader> =
            Arc::new(crate::readiness::HttpImageLoader::new(&config.origin, config.capture_timeout_ms)?);
        #[cfg(not(feature = "http"))]
        let images: Arc<dyn ImageLoader> = Arc::new(crate::readiness::StaticImages::new());

        Ok(Self {
            backend: Arc::new(backend),
            images,
            fonts: Some(Arc::new(ReadyFonts)),
            frames: Arc::new(TokioFrameClock::new(config.frame_interval_ms)),
            slot,
            events: None,
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventSurface>) -> Self {
        self.events = Some(events);
        self
    }
}

/// Result of a navigation call
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// The render for `index` settled and its status was applied
    Rendered { index: usize, status: RenderStatus },
    /// A newer navigation started before this render settled; nothing applied
    Superseded { index: usize },
    AtBoundary { index: usize },
    /// A render is pending and navigation is locked
    Refused { index: usize },
}

struct Inner {
    catalog: StepCatalog,
    pipeline: RasterizationPipeline,
    attempts: Vec<CaptureConfig>,
    slot: Arc<dyn OutputSlot>,
    events: Option<Arc<dyn EventSurface>>,
    nav: Mutex<Navigator>,
    guard: Mutex<Option<GuardHandle>>,
    started: AtomicBool,
}

impl Inner {
    fn nav(&self) -> MutexGuard<'_, Navigator> {
        self.nav.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn show_failure(&self) {
        self.slot.clear();
        self.slot.show_error(FAILURE_MESSAGE);
    }
}

/// Settles a render's generation as failed if its future is dropped before
/// the pipeline outcome is applied.
struct InFlight<'a> {
    inner: &'a Inner,
    token: &'a GenerationToken,
    index: usize,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut nav = self.inner.nav();
        let abandoned = Err(Error::Other("render abandoned before it settled".into()));
        if nav.complete(self.token, abandoned).is_ok() {
            log::warn!("{} for step {} abandoned by its caller", self.token.generation(), self.index);
            self.inner.show_failure();
        }
    }
}

#[derive(Clone)]
pub struct Viewer {
    inner: Arc<Inner>,
}

impl Viewer {
    pub fn new(catalog: StepCatalog, parts: ViewerParts, config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        let nav = Navigator::new(catalog.len(), config.lock_navigation_while_pending)?;
        let probe = ReadinessProbe::new(parts.fonts, parts.images);
        let pipeline = RasterizationPipeline::new(probe, parts.backend, parts.frames)
            .with_debounce(config.debounce_ms)
            .with_capture_timeout(config.capture_timeout_ms);

        Ok(Self {
            inner: Arc::new(Inner {
                catalog,
                pipeline,
                attempts: config.capture_attempts(),
                slot: parts.slot,
                events: parts.events,
                nav: Mutex::new(nav),
                guard: Mutex::new(None),
                started: AtomicBool::new(false),
            }),
        })
    }

    fn nav(&self) -> MutexGuard<'_, Navigator> {
        self.inner.nav()
    }

    fn guard_slot(&self) -> MutexGuard<'_, Option<GuardHandle>> {
        self.inner.guard.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn step_count(&self) -> usize {
        self.inner.catalog.len()
    }

    pub fn current_index(&self) -> usize {
        self.nav().index()
    }

    pub fn at_first(&self) -> bool {
        self.nav().at_first()
    }

    pub fn at_last(&self) -> bool {
        self.nav().at_last()
    }

    pub fn can_navigate(&self) -> bool {
        self.nav().can_navigate()
    }

    pub fn status(&self) -> RenderStatus {
        self.nav().status().clone()
    }

    pub fn current_step(&self) -> Option<Step> {
        let index = self.current_index();
        self.inner.catalog.get(index).cloned()
    }

    /// Install the copy guard on the configured event surface. Idempotent;
    /// returns whether a guard is active afterwards.
    pub fn activate_guard(&self) -> bool {
        let Some(events) = self.inner.events.clone() else {
            return false;
        };
        let mut slot = self.guard_slot();
        if slot.is_none() {
            *slot = Some(CopyGuard::activate(events));
        }
        true
    }

    /// Remove the copy guard. Returns how many listeners were removed.
    /// The guard is also released when the last viewer handle is dropped.
    pub fn deactivate_guard(&self) -> usize {
        let handle = self.guard_slot().take();
        handle.map(GuardHandle::deactivate).unwrap_or(0)
    }

    /// Activate the guard and render the initial step. Only the first call
    /// renders; later calls are refused (use `refresh` to re-render).
    pub async fn start(&self) -> Navigation {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Navigation::Refused { index: self.current_index() };
        }
        self.activate_guard();
        let (index, token) = {
            let mut nav = self.nav();
            (nav.index(), nav.begin_render())
        };
        self.render(index, token).await
    }

    pub async fn advance(&self) -> Navigation {
        self.navigate(Navigator::advance).await
    }

    pub async fn retreat(&self) -> Navigation {
        self.navigate(Navigator::retreat).await
    }

    /// Re-run the pipeline for the current step. Refused while locked.
    pub async fn refresh(&self) -> Navigation {
        let (index, token) = {
            let mut nav = self.nav();
            if !nav.can_navigate() {
                return Navigation::Refused { index: nav.index() };
            }
            (nav.index(), nav.begin_render())
        };
        self.render(index, token).await
    }

    async fn navigate(&self, step: fn(&mut Navigator) -> Transition) -> Navigation {
        let (index, token) = {
            let mut nav = self.nav();
            match step(&mut nav) {
                Transition::Moved { index, token } => (index, token),
                Transition::AtBoundary => return Navigation::AtBoundary { index: nav.index() },
                Transition::Refused => return Navigation::Refused { index: nav.index() },
            }
        };
        self.render(index, token).await
    }

    async fn render(&self, index: usize, token: GenerationToken) -> Navigation {
        let Some(node) = self.inner.catalog.get(index).map(|s| s.content.clone()) else {
            return Navigation::Superseded { index };
        };

        {
            let _nav = self.nav();
            if token.is_current() {
                self.inner.slot.clear();
            }
        }

        let mut in_flight = InFlight { inner: &self.inner, token: &token, index, armed: true };
        let outcome = self.inner.pipeline.run(&node, &self.inner.attempts, &token).await;
        in_flight.armed = false;
        if let Err(e) = &outcome {
            if e.is_stale() {
                log::trace!("{} for step {} discarded", token.generation(), index);
                return Navigation::Superseded { index };
            }
        }

        // Check and write under the navigator lock so a newer generation
        // cannot start between the two.
        let mut nav = self.nav();
        let status = match nav.complete(&token, outcome) {
            Ok(status) => status.clone(),
            Err(_) => {
                log::trace!("{} for step {} settled after being superseded", token.generation(), index);
                return Navigation::Superseded { index };
            }
        };
        match &status {
            RenderStatus::Ready(bitmap) => self.inner.slot.show_image(bitmap.clone()),
            RenderStatus::Failed(reason) => {
                log::error!("step {} failed to render: {}", index, reason);
                self.inner.show_failure();
            }
            RenderStatus::Pending => {}
        }
        drop(nav);
        Navigation::Rendered { index, status }
    }
}
