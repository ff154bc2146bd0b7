use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::coords::Viewport;

/// Receiver of viewport changes.
pub trait ViewportListener {
    fn viewport_changed(&mut self, viewport: Viewport);
}

struct Listener {
    id: u64,
    target: Weak<RefCell<dyn ViewportListener>>,
}

struct Inner {
    current: Cell<Viewport>,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

/// Current viewport and the set of listeners to notify when it changes.
///
/// Listeners are held weakly; a listener that was dropped without cancelling
/// its subscription is pruned on the next broadcast.
#[derive(Clone)]
pub struct ViewportTracker {
    inner: Rc<Inner>,
}

impl ViewportTracker {
    pub fn new(initial: Viewport) -> Self {
        Self {
            inner: Rc::new(Inner {
                current: Cell::new(initial),
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Last valid viewport reported by the host.
    #[inline]
    pub fn current(&self) -> Viewport {
        self.inner.current.get()
    }

    /// Registers `listener` until the returned handle is dropped or cancelled.
    pub fn subscribe<L>(&self, listener: &Rc<RefCell<L>>) -> Subscription
    where
        L: ViewportListener + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let target: Rc<RefCell<dyn ViewportListener>> = listener.clone();
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            target: Rc::downgrade(&target),
        });

        Subscription {
            id,
            tracker: Rc::downgrade(&self.inner),
        }
    }

    /// Stores `viewport` and notifies every live listener.
    ///
    /// A zero-area viewport (minimized window) is not broadcast. Returns the
    /// number of listeners notified.
    pub fn resize(&self, viewport: Viewport) -> usize {
        if !viewport.is_valid() {
            log::debug!("viewport {viewport:?} is not drawable; broadcast skipped");
            return 0;
        }
        self.inner.current.set(viewport);

        // Snapshot first: a listener may subscribe or unsubscribe while notified.
        let live: Vec<Rc<RefCell<dyn ViewportListener>>> = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.retain(|l| l.target.strong_count() > 0);
            listeners.iter().filter_map(|l| l.target.upgrade()).collect()
        };

        let mut notified = 0;
        for listener in &live {
            match listener.try_borrow_mut() {
                Ok(mut l) => {
                    l.viewport_changed(viewport);
                    notified += 1;
                }
                Err(_) => log::warn!("viewport listener is busy; skipped"),
            }
        }

        log::trace!(
            "viewport {}x{} broadcast to {notified} listeners",
            viewport.width,
            viewport.height
        );
        notified
    }

    /// Number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.target.strong_count() > 0)
            .count()
    }
}

/// Handle that keeps a listener registered. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    tracker: Weak<Inner>,
}

impl Subscription {
    /// `false` once cancelled or when the tracker is gone.
    pub fn is_active(&self) -> bool {
        self.tracker
            .upgrade()
            .is_some_and(|inner| inner.listeners.borrow().iter().any(|l| l.id == self.id))
    }

    /// Unsubscribes now. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(inner) = self.tracker.upgrade() {
            inner.listeners.borrow_mut().retain(|l| l.id != self.id);
        }
        self.tracker = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
