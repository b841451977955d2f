//! Set of registered frame processors.

use crate::processing::FrameProcessor;
use std::sync::Arc;

/// How a registry change affected whether frames are wanted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The registry went from empty to non-empty.
    Activated,
    /// The registry went from non-empty to empty.
    Deactivated,
    /// Emptiness did not change.
    Unchanged,
}

/// Processors keyed by identity. Order carries no meaning.
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn FrameProcessor>>,
}

fn same(a: &Arc<dyn FrameProcessor>, b: &Arc<dyn FrameProcessor>) -> bool {
    // Compare data pointers only; vtable pointers may differ per codegen unit
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a processor. Adding one already present changes nothing.
    pub fn insert(&mut self, processor: Arc<dyn FrameProcessor>) -> Transition {
        if self.contains(&processor) {
            return Transition::Unchanged;
        }
        self.processors.push(processor);
        if self.processors.len() == 1 {
            Transition::Activated
        } else {
            Transition::Unchanged
        }
    }

    /// Removes a processor. Removing one not present changes nothing.
    pub fn remove(&mut self, processor: &Arc<dyn FrameProcessor>) -> Transition {
        let before = self.processors.len();
        self.processors.retain(|p| !same(p, processor));
        if before > 0 && self.processors.is_empty() {
            Transition::Deactivated
        } else {
            Transition::Unchanged
        }
    }

    /// Whether `processor` is registered.
    pub fn contains(&self, processor: &Arc<dyn FrameProcessor>) -> bool {
        self.processors.iter().any(|p| same(p, processor))
    }

    /// Number of registered processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processors are registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Copies out the current processors for one dispatch.
    pub fn snapshot(&self) -> Vec<Arc<dyn FrameProcessor>> {
        self.processors.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PreviewFrame;

    struct Noop;

    impl FrameProcessor for Noop {
        fn on_frame(&self, _frame: &PreviewFrame<'_>) {}
    }

    #[test]
    fn test_cardinality_edges() {
        let mut registry = ProcessorRegistry::new();
        let a: Arc<dyn FrameProcessor> = Arc::new(Noop);
        let b: Arc<dyn FrameProcessor> = Arc::new(Noop);

        assert_eq!(registry.insert(a.clone()), Transition::Activated);
        assert_eq!(registry.insert(b.clone()), Transition::Unchanged);
        assert_eq!(registry.insert(a.clone()), Transition::Unchanged);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove(&a), Transition::Unchanged);
        assert_eq!(registry.remove(&a), Transition::Unchanged);
        assert_eq!(registry.remove(&b), Transition::Deactivated);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_from_empty_is_unchanged() {
        let mut registry = ProcessorRegistry::new();
        let a: Arc<dyn FrameProcessor> = Arc::new(Noop);
        assert_eq!(registry.remove(&a), Transition::Unchanged);
    }
}
