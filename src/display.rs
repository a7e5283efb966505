//! Display surface: the single visible output slot

use crate::rendering::Bitmap;
use std::sync::Mutex;

/// What the slot currently shows. Never more than one image or one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotContent {
    #[default]
    Empty,
    Image(Bitmap),
    Error(String),
}

/// Mutable output slot collaborator
pub trait OutputSlot: Send + Sync {
    fn clear(&self);
    fn show_image(&self, bitmap: Bitmap);
    fn show_error(&self, message: &str);
}

/// In-memory slot that also keeps a log of writes for tests and the CLI
#[derive(Default)]
pub struct MemorySlot {
    content: Mutex<SlotContent>,
    writes: Mutex<Vec<SlotContent>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> SlotContent {
        self.content.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Every state the slot has been put into, oldest first
    pub fn writes(&self) -> Vec<SlotContent> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn set(&self, next: SlotContent) {
        if let Ok(mut w) = self.writes.lock() {
            w.push(next.clone());
        }
        if let Ok(mut c) = self.content.lock() {
            *c = next;
        }
    }
}

impl OutputSlot for MemorySlot {
    fn clear(&self) {
        self.set(SlotContent::Empty);
    }

    fn show_image(&self, bitmap: Bitmap) {
        self.set(SlotContent::Image(bitmap));
    }

    fn show_error(&self, message: &str) {
        self.set(SlotContent::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slot_replaces_content() {
        let slot = MemorySlot::new();
        assert_eq!(slot.content(), SlotContent::Empty);
        slot.show_image(Bitmap::new(1, 1, vec![1]));
        slot.show_error("boom");
        assert_eq!(slot.content(), SlotContent::Error("boom".into()));
        slot.clear();
        assert_eq!(slot.content(), SlotContent::Empty);
        assert_eq!(slot.writes().len(), 3);
    }
}
