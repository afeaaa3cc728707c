#![forbid(unsafe_code)]

//! Callback buses replaying the renderer and viewport contracts.

use navfold_runtime::coordinator::{LifecycleHooks, ViewportSignal};

/// Registered lifecycle callbacks, fired on demand by tests.
#[derive(Default)]
pub struct HookBus {
    ready: Vec<Box<dyn FnMut()>>,
    before_each: Vec<Box<dyn FnMut()>>,
    done_each: Vec<Box<dyn FnMut()>>,
}

impl HookBus {
    /// An empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the first-render signal.
    pub fn fire_ready(&mut self) {
        for callback in &mut self.ready {
            callback();
        }
    }

    /// Fire the about-to-navigate signal.
    pub fn fire_before_each(&mut self) {
        for callback in &mut self.before_each {
            callback();
        }
    }

    /// Fire the navigation-complete signal.
    pub fn fire_done_each(&mut self) {
        for callback in &mut self.done_each {
            callback();
        }
    }
}

impl LifecycleHooks for HookBus {
    fn ready(&mut self, callback: Box<dyn FnMut()>) {
        self.ready.push(callback);
    }

    fn before_each(&mut self, callback: Box<dyn FnMut()>) {
        self.before_each.push(callback);
    }

    fn done_each(&mut self, callback: Box<dyn FnMut()>) {
        self.done_each.push(callback);
    }
}

/// Registered resize callbacks.
#[derive(Default)]
pub struct ViewportBus {
    resize: Vec<Box<dyn FnMut()>>,
}

impl ViewportBus {
    /// An empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the resize signal.
    pub fn fire_resize(&mut self) {
        for callback in &mut self.resize {
            callback();
        }
    }

    /// How many resize callbacks are registered.
    #[must_use]
    pub fn resize_listeners(&self) -> usize {
        self.resize.len()
    }
}

impl ViewportSignal for ViewportBus {
    fn on_resize(&mut self, callback: Box<dyn FnMut()>) {
        self.resize.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn fired_signals_reach_every_callback() {
        let mut bus = HookBus::new();
        let count = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let count = Rc::clone(&count);
            bus.done_each(Box::new(move || count.set(count.get() + 1)));
        }
        bus.fire_done_each();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn viewport_tracks_registrations() {
        let mut bus = ViewportBus::new();
        assert_eq!(bus.resize_listeners(), 0);
        bus.on_resize(Box::new(|| {}));
        assert_eq!(bus.resize_listeners(), 1);
        bus.fire_resize();
    }
}
