use secure_viewer::catalog::default_catalog;
use secure_viewer::display::MemorySlot;
use secure_viewer::guard::{CopyGuard, Disposition, DocumentEvent, KeyEvent, MemoryDocument};
use secure_viewer::{Viewer, ViewerConfig, ViewerParts};
use std::sync::Arc;

#[test]
fn activate_then_deactivate_leaves_no_listeners() {
    let doc = Arc::new(MemoryDocument::new());
    let handle = CopyGuard::activate(doc.clone());
    assert_eq!(doc.dispatch(&DocumentEvent::KeyDown(KeyEvent::ctrl("s"))), Disposition::Prevented);
    handle.deactivate();
    assert_eq!(doc.listener_count(), 0);
    assert_eq!(doc.dispatch(&DocumentEvent::KeyDown(KeyEvent::ctrl("s"))), Disposition::Default);
}

#[test]
fn panicking_owner_still_releases() {
    let doc = Arc::new(MemoryDocument::new());
    let d = doc.clone();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let _handle = CopyGuard::activate(d);
        panic!("component teardown blew up");
    }));
    assert!(res.is_err());
    assert_eq!(doc.listener_count(), 0);
}

#[tokio::test]
async fn viewer_lifetime_owns_the_guard() {
    let doc = Arc::new(MemoryDocument::new());
    let cfg = ViewerConfig { debounce_ms: 0, frame_interval_ms: 0, ..Default::default() };
    let mut parts = ViewerParts::software(&cfg, Arc::new(MemorySlot::new())).unwrap().with_events(doc.clone());
    parts.images = Arc::new(secure_viewer::readiness::StaticImages::new());
    let viewer = Viewer::new(default_catalog(), parts, cfg).unwrap();

    viewer.start().await;
    assert_eq!(doc.dispatch(&DocumentEvent::ContextMenu), Disposition::Prevented);

    let clone = viewer.clone();
    drop(viewer);
    // Still owned by the remaining handle
    assert_eq!(doc.listener_count(), 5);
    drop(clone);
    assert_eq!(doc.listener_count(), 0);
}
