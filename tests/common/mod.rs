//! Shared collaborators for integration tests
#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::FutureExt;
use secure_viewer::catalog::{ContentNode, Step, StepCatalog};
use secure_viewer::display::MemorySlot;
use secure_viewer::pipeline::TokioFrameClock;
use secure_viewer::readiness::StaticImages;
use secure_viewer::{Bitmap, CaptureBackend, CaptureConfig, Error, Result, Viewer, ViewerConfig, ViewerParts};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub fn bitmap(tag: &str) -> Bitmap {
    Bitmap::new(4, 4, tag.as_bytes().to_vec())
}

/// Replays one outcome per capture call, in order
pub struct ScriptedBackend {
    outcomes: Mutex<VecDeque<Result<Bitmap>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<Result<Bitmap>>) -> Self {
        Self { outcomes: Mutex::new(outcomes.into()), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for ScriptedBackend {
    fn capture<'a>(&'a self, _node: &'a ContentNode, _config: &'a CaptureConfig) -> BoxFuture<'a, Result<Bitmap>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::RenderError("no scripted outcome".into())));
        futures::future::ready(next).boxed()
    }
}

/// Each capture call waits on the next gate; the test decides when and how
/// it resolves.
pub struct GatedBackend {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<Bitmap>>>>,
    calls: AtomicUsize,
}

impl GatedBackend {
    pub fn new(n: usize) -> (Arc<Self>, Vec<oneshot::Sender<Result<Bitmap>>>) {
        let mut senders = Vec::new();
        let mut gates = VecDeque::new();
        for _ in 0..n {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            gates.push_back(rx);
        }
        (Arc::new(Self { gates: Mutex::new(gates), calls: AtomicUsize::new(0) }), senders)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

impl CaptureBackend for GatedBackend {
    fn capture<'a>(&'a self, _node: &'a ContentNode, _config: &'a CaptureConfig) -> BoxFuture<'a, Result<Bitmap>> {
        let gate = self.gates.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            match gate {
                Some(rx) => rx.await.unwrap_or_else(|_| Err(Error::Other("gate dropped".into()))),
                None => Err(Error::RenderError("no gate left".into())),
            }
        }
        .boxed()
    }
}

pub fn catalog(n: usize) -> StepCatalog {
    let steps = (0..n)
        .map(|i| Step::new(format!("Step {}", i + 1), ContentNode::new(format!("<h1>Step {}</h1><p>Body {}</p>", i + 1, i + 1))))
        .collect();
    StepCatalog::new(steps).unwrap()
}

pub fn fast_config(lock: bool) -> ViewerConfig {
    ViewerConfig {
        debounce_ms: 0,
        frame_interval_ms: 0,
        capture_timeout_ms: 0,
        lock_navigation_while_pending: lock,
        ..Default::default()
    }
}

/// Steps that each reference one image, `/step-<i>.png`
pub fn illustrated_catalog(n: usize) -> StepCatalog {
    let steps = (0..n)
        .map(|i| Step::new(format!("Step {}", i + 1), ContentNode::new(format!(r#"<h1>Step {}</h1><img src="/step-{}.png">"#, i + 1, i))))
        .collect();
    StepCatalog::new(steps).unwrap()
}

pub fn viewer_with(
    catalog: StepCatalog,
    backend: Arc<dyn CaptureBackend>,
    images: Arc<StaticImages>,
    slot: Arc<MemorySlot>,
    config: ViewerConfig,
) -> Viewer {
    let parts = ViewerParts {
        backend,
        images,
        fonts: None,
        frames: Arc::new(TokioFrameClock::new(0)),
        slot,
        events: None,
    };
    Viewer::new(catalog, parts, config).unwrap()
}

pub fn viewer(steps: usize, backend: Arc<dyn CaptureBackend>, slot: Arc<MemorySlot>, lock: bool) -> Viewer {
    viewer_with(catalog(steps), backend, Arc::new(StaticImages::new()), slot, fast_config(lock))
}
