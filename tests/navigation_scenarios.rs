mod common;

use common::{bitmap, viewer, ScriptedBackend};
use proptest::collection::vec;
use proptest::prelude::*;
use secure_viewer::display::MemorySlot;
use secure_viewer::{Navigation, Navigator, RenderStatus, Transition};
use std::sync::Arc;

proptest! {
    #[test]
    fn index_stays_in_bounds_for_any_sequence(n in 1usize..64, ops in vec(any::<bool>(), 0..200)) {
        let mut nav = Navigator::new(n, false).unwrap();
        for forward in ops {
            let t = if forward { nav.advance() } else { nav.retreat() };
            if let Transition::Moved { index, .. } = t {
                prop_assert_eq!(index, nav.index());
            }
            prop_assert!(nav.index() < n);
            prop_assert_eq!(nav.at_first(), nav.index() == 0);
            prop_assert_eq!(nav.at_last(), nav.index() == n - 1);
        }
    }
}

#[test]
fn single_step_catalog_never_moves() {
    let mut nav = Navigator::new(1, false).unwrap();
    assert!(nav.at_first() && nav.at_last());
    assert!(matches!(nav.advance(), Transition::AtBoundary));
    assert!(matches!(nav.retreat(), Transition::AtBoundary));
}

#[tokio::test]
async fn three_steps_advance_twice_then_clamp() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(bitmap("0")), Ok(bitmap("1")), Ok(bitmap("2"))]));
    let slot = Arc::new(MemorySlot::new());
    let v = viewer(3, backend.clone(), slot, true);

    v.start().await;
    v.advance().await;
    v.advance().await;
    assert_eq!(v.current_index(), 2);
    assert!(v.at_last());

    assert_eq!(v.advance().await, Navigation::AtBoundary { index: 2 });
    assert_eq!(v.current_index(), 2);
    // The boundary no-op did not trigger another render
    assert_eq!(backend.calls(), 3);
    assert_eq!(v.status(), RenderStatus::Ready(bitmap("2")));
}

#[tokio::test]
async fn retreat_rerenders_without_caching() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(bitmap("a")), Ok(bitmap("b")), Ok(bitmap("a2"))]));
    let v = viewer(2, backend.clone(), Arc::new(MemorySlot::new()), true);
    v.start().await;
    v.advance().await;
    match v.retreat().await {
        Navigation::Rendered { index: 0, status: RenderStatus::Ready(b) } => assert_eq!(b.png_data, b"a2".to_vec()),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(v.retreat().await, Navigation::AtBoundary { index: 0 });
    assert_eq!(backend.calls(), 3);
}
