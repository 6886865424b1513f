//! Reverse-order resource release registry.

/// Registry of release actions keyed by creation order.
///
/// Every GPU resource created during setup registers its release here;
/// unwinding runs the actions exactly once in reverse registration
/// order. The same registry serves the error path (abort setup, leak
/// nothing) and normal teardown.
pub struct ReleaseStack {
    entries: Vec<(&'static str, Box<dyn FnOnce()>)>,
    released: Vec<(&'static str, usize)>,
}

impl ReleaseStack {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            released: Vec::new(),
        }
    }

    /// Register a release action for a resource of the given kind.
    ///
    /// Kinds are free-form labels used for accounting; resources of the
    /// same kind may register any number of actions.
    pub fn defer(&mut self, kind: &'static str, release: impl FnOnce() + 'static) {
        self.entries.push((kind, Box::new(release)));
    }

    /// Run every registered action in reverse registration order.
    ///
    /// Each action runs exactly once; unwinding an already-unwound
    /// registry is a no-op.
    pub fn unwind(&mut self) {
        while let Some((kind, release)) = self.entries.pop() {
            release();
            self.record(kind);
        }
    }

    /// How many actions of a kind have run.
    pub fn released(&self, kind: &str) -> usize {
        self.released
            .iter()
            .find(|(recorded, _)| *recorded == kind)
            .map_or(0, |(_, count)| *count)
    }

    /// Number of registered, not yet released, actions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no actions are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, kind: &'static str) {
        if let Some(entry) = self.released.iter_mut().find(|(recorded, _)| *recorded == kind) {
            entry.1 += 1;
        } else {
            self.released.push((kind, 1));
        }
    }
}

impl Default for ReleaseStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        self.unwind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn unwinds_in_reverse_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut stack = ReleaseStack::new();

        for kind in ["swapchain", "image views", "render pass", "framebuffers"] {
            let order = Rc::clone(&order);
            stack.defer(kind, move || order.borrow_mut().push(kind));
        }

        stack.unwind();

        assert_eq!(
            *order.borrow(),
            ["framebuffers", "render pass", "image views", "swapchain"]
        );
    }

    #[test]
    fn each_action_runs_exactly_once() {
        let count = Rc::new(RefCell::new(0));
        let mut stack = ReleaseStack::new();

        for _ in 0..3 {
            let count = Rc::clone(&count);
            stack.defer("fence", move || *count.borrow_mut() += 1);
        }

        stack.unwind();
        stack.unwind();

        assert_eq!(*count.borrow(), 3);
        assert_eq!(stack.released("fence"), 3);
        assert!(stack.is_empty());
    }

    #[test]
    fn drop_unwinds_pending_actions() {
        let count = Rc::new(RefCell::new(0));
        {
            let mut stack = ReleaseStack::new();
            let count = Rc::clone(&count);
            stack.defer("surface", move || *count.borrow_mut() += 1);
        }
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn aborted_setup_releases_everything_once() {
        // Shape of the shader-not-found abort: swapchain, image views,
        // render pass, and framebuffers exist when loading fails; the
        // unwind must release each exactly once.
        let mut stack = ReleaseStack::new();
        let released = Rc::new(RefCell::new(Vec::new()));

        for kind in ["surface", "swapchain", "image views", "render pass", "framebuffers"] {
            let released = Rc::clone(&released);
            stack.defer(kind, move || released.borrow_mut().push(kind));
        }

        // Shader loading fails here; setup unwinds.
        stack.unwind();

        for kind in ["surface", "swapchain", "image views", "render pass", "framebuffers"] {
            assert_eq!(stack.released(kind), 1, "{kind} released once");
        }
        assert_eq!(released.borrow().len(), 5);
    }
}
