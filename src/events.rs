//! Publish/subscribe scoped to one grid instance.
//!
//! The store itself is passive. The controller publishes on an [`EventBus`]
//! handed to it at construction; there is no process-wide bus.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

/// Notifications emitted by the grid controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GridEvent {
    /// A cell changed value. `row` is a storage row.
    #[serde(rename_all = "camelCase")]
    CellChanged {
        row: u32,
        col: usize,
        old: String,
        new: String,
    },
    /// A row was appended at storage `row`.
    RowAdded { row: u32 },
    #[serde(rename_all = "camelCase")]
    Sorted {
        column: usize,
        ascending: bool,
        rows: u32,
        elapsed_ms: f64,
    },
    OrderReset,
    Restored { rows: u32 },
    /// A persistence write failed. Data in memory is still correct.
    PersistFailed { message: String },
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GridEvent)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
    /// Ids of the handlers taken out for the running dispatch.
    dispatching: Option<Vec<SubscriptionId>>,
    /// Dispatching ids unsubscribed before the dispatch ended.
    removed: Vec<SubscriptionId>,
}

/// Cloneable bus handle. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<Subscribers>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&GridEvent) + 'static,
    {
        let mut subs = self.inner.borrow_mut();
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.inner.borrow_mut();
        let before = subs.handlers.len();
        subs.handlers.retain(|(sid, _)| *sid != id);
        if subs.handlers.len() != before {
            return true;
        }
        let Subscribers {
            dispatching,
            removed,
            ..
        } = &mut *subs;
        match dispatching {
            Some(active) if active.contains(&id) && !removed.contains(&id) => {
                removed.push(id);
                true
            }
            _ => false,
        }
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// Handlers may subscribe or unsubscribe while running; new subscribers
    /// start with the next event. Nested publishes from a handler are dropped.
    pub fn publish(&self, event: &GridEvent) {
        let mut handlers = {
            let mut subs = self.inner.borrow_mut();
            if subs.dispatching.is_some() {
                log::warn!("dropping nested event publish: {event:?}");
                return;
            }
            let handlers = std::mem::take(&mut subs.handlers);
            subs.dispatching = Some(handlers.iter().map(|(id, _)| *id).collect());
            handlers
        };

        for (_, handler) in &mut handlers {
            handler(event);
        }

        let mut subs = self.inner.borrow_mut();
        let removed = std::mem::take(&mut subs.removed);
        handlers.retain(|(id, _)| !removed.contains(id));
        // Handlers subscribed during dispatch were pushed onto the emptied list.
        let added = std::mem::take(&mut subs.handlers);
        handlers.extend(added);
        subs.handlers = handlers;
        subs.dispatching = None;
    }

    /// Number of live subscribers, including during a dispatch.
    #[must_use]
    pub fn len(&self) -> usize {
        let subs = self.inner.borrow();
        let active = subs
            .dispatching
            .as_ref()
            .map_or(0, |ids| ids.len().saturating_sub(subs.removed.len()));
        active + subs.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus) -> Rc<RefCell<Vec<GridEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let seen = recorder(&bus);
        bus.publish(&GridEvent::RowAdded { row: 4 });
        assert_eq!(seen.borrow().as_slice(), &[GridEvent::RowAdded { row: 4 }]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| *c.borrow_mut() += 1);
        bus.publish(&GridEvent::OrderReset);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&GridEvent::OrderReset);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_waits_for_next_event() {
        let bus = EventBus::new();
        let late = Rc::new(RefCell::new(0));
        let bus_handle = bus.clone();
        let late_handle = Rc::clone(&late);
        let mut armed = true;
        bus.subscribe(move |_| {
            if armed {
                armed = false;
                let l = Rc::clone(&late_handle);
                bus_handle.subscribe(move |_| *l.borrow_mut() += 1);
            }
        });
        bus.publish(&GridEvent::OrderReset);
        assert_eq!(*late.borrow(), 0);
        assert_eq!(bus.len(), 2);
        bus.publish(&GridEvent::OrderReset);
        assert_eq!(*late.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let bus = EventBus::new();
        let gone = bus.subscribe(|_| {});
        assert!(bus.unsubscribe(gone));
        let later = bus.subscribe(|_| {});

        let report = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&report);
        let handle = bus.clone();
        bus.subscribe(move |_| {
            let mut r = sink.borrow_mut();
            r.push(handle.len());
            r.push(usize::from(handle.unsubscribe(gone)));
            r.push(usize::from(handle.unsubscribe(later)));
            r.push(usize::from(handle.unsubscribe(later)));
            r.push(handle.len());
        });
        bus.publish(&GridEvent::OrderReset);
        assert_eq!(report.borrow().as_slice(), &[2, 0, 1, 0, 1]);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let other = bus.clone();
        let seen = recorder(&other);
        bus.publish(&GridEvent::Restored { rows: 2 });
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(GridEvent::CellChanged {
            row: 1,
            col: 2,
            old: String::new(),
            new: "x".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "cellChanged");
        assert_eq!(json["new"], "x");
    }
}
