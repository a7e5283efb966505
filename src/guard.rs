//! Copy-protection guard
//!
//! Installs default-preventing listeners for context menu, clipboard, and
//! selection events plus a handful of keyboard shortcuts. This is UI friction
//! only: screenshots, devtools opened beforehand, and network inspection are
//! unaffected.
//!
//! Listeners are owned by a [`GuardHandle`]; dropping or deactivating the
//! handle removes every listener it installed, once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ContextMenu,
    Copy,
    Cut,
    SelectStart,
    KeyDown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn plain(key: &str) -> Self {
        Self { key: key.to_string(), ..Default::default() }
    }

    pub fn ctrl(key: &str) -> Self {
        Self { key: key.to_string(), ctrl: true, ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    ContextMenu,
    Copy,
    Cut,
    SelectStart,
    KeyDown(KeyEvent),
}

impl DocumentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DocumentEvent::ContextMenu => EventKind::ContextMenu,
            DocumentEvent::Copy => EventKind::Copy,
            DocumentEvent::Cut => EventKind::Cut,
            DocumentEvent::SelectStart => EventKind::SelectStart,
            DocumentEvent::KeyDown(_) => EventKind::KeyDown,
        }
    }
}

/// What a listener asks the document to do with the default action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Default,
    Prevented,
}

pub type Listener = Arc<dyn Fn(&DocumentEvent) -> Disposition + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Global document event surface collaborator
pub trait EventSurface: Send + Sync {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId;
    /// Returns false if the id was not registered
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Ctrl/Cmd + U (view source), S (save), C (copy), and F12 (devtools).
pub fn is_blocked_shortcut(ev: &KeyEvent) -> bool {
    if ev.key == "F12" {
        return true;
    }
    (ev.ctrl || ev.meta) && matches!(ev.key.to_ascii_lowercase().as_str(), "u" | "s" | "c")
}

const ALWAYS_PREVENTED: [EventKind; 4] = [
    EventKind::ContextMenu,
    EventKind::Copy,
    EventKind::Cut,
    EventKind::SelectStart,
];

pub struct CopyGuard;

impl CopyGuard {
    /// Install all suppressions on `surface` and return the owning handle
    pub fn activate(surface: Arc<dyn EventSurface>) -> GuardHandle {
        let mut ids = Vec::with_capacity(ALWAYS_PREVENTED.len() + 1);
        for kind in ALWAYS_PREVENTED {
            let id = surface.add_listener(kind, Arc::new(|_: &DocumentEvent| Disposition::Prevented));
            ids.push(id);
        }
        let keys: Listener = Arc::new(|ev: &DocumentEvent| match ev {
            DocumentEvent::KeyDown(k) if is_blocked_shortcut(k) => Disposition::Prevented,
            _ => Disposition::Default,
        });
        ids.push(surface.add_listener(EventKind::KeyDown, keys));
        log::debug!("copy guard active ({} listeners)", ids.len());
        GuardHandle { surface, ids }
    }
}

/// Owns the installed listeners
pub struct GuardHandle {
    surface: Arc<dyn EventSurface>,
    ids: Vec<ListenerId>,
}

impl GuardHandle {
    pub fn listener_count(&self) -> usize {
        self.ids.len()
    }

    /// Remove every listener now. Returns how many were removed.
    pub fn deactivate(mut self) -> usize {
        self.release()
    }

    fn release(&mut self) -> usize {
        let mut removed = 0;
        for id in self.ids.drain(..) {
            if self.surface.remove_listener(id) {
                removed += 1;
            } else {
                log::warn!("copy guard listener {:?} was already gone", id);
            }
        }
        if removed > 0 {
            log::debug!("copy guard released {} listeners", removed);
        }
        removed
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// In-memory document that dispatches events to registered listeners
#[derive(Default)]
pub struct MemoryDocument {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, (EventKind, Listener)>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<ListenerId, (EventKind, Listener)>> {
        self.listeners.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Run every listener for the event's kind. The default action is
    /// prevented if any listener prevents it.
    pub fn dispatch(&self, event: &DocumentEvent) -> Disposition {
        let kind = event.kind();
        let matching: Vec<Listener> =
            self.listeners().values().filter(|(k, _)| *k == kind).map(|(_, f)| f.clone()).collect();
        let mut out = Disposition::Default;
        for f in matching {
            if f(event) == Disposition::Prevented {
                out = Disposition::Prevented;
            }
        }
        out
    }
}

impl EventSurface for MemoryDocument {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners().insert(id, (kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(&id).is_some()
    }
}
