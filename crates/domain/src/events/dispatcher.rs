//! In-process publish/subscribe hub for domain events.
//!
//! Handlers are stored in one bucket per [`Topic`]: one per concrete
//! [`EventKind`] plus a catch-all. Each bucket has its own lock, so
//! registering for one kind never blocks delivery of another.
//!
//! Delivery is synchronous and in registration order. The handler lists are
//! snapshotted before the first handler runs, so handlers may register or
//! drop subscriptions while being invoked. A panicking handler is logged and
//! skipped; the rest still receive the event.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use dashmap::DashMap;

use super::{DomainEvent, EventKind, EventVariant};

type Handler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Registration key: a single event kind, or every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Kind(EventKind),
    Any,
}

#[derive(Clone)]
struct HandlerEntry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct HandlerBucket {
    entries: Mutex<Vec<HandlerEntry>>,
}

impl HandlerBucket {
    fn lock(&self) -> MutexGuard<'_, Vec<HandlerEntry>> {
        // Handlers never run under this lock, so poisoning cannot leave the list half-edited
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Handler> {
        self.lock().iter().map(|e| Arc::clone(&e.handler)).collect()
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Default)]
struct DispatcherInner {
    buckets: DashMap<Topic, Arc<HandlerBucket>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

impl DispatcherInner {
    fn remove(&self, topic: Topic, id: u64) {
        if let Some(bucket) = self.buckets.get(&topic) {
            bucket.lock().retain(|e| e.id != id);
        }
        // Holds the shard write lock, so a concurrent register either lands
        // before the emptiness check or recreates the bucket afterwards.
        self.buckets.remove_if(&topic, |_, bucket| bucket.is_empty());
    }

    fn contains(&self, topic: Topic, id: u64) -> bool {
        self.buckets
            .get(&topic)
            .is_some_and(|bucket| bucket.lock().iter().any(|e| e.id == id))
    }

    fn snapshot(&self, topic: Topic) -> Vec<Handler> {
        let bucket = self.buckets.get(&topic).map(|b| Arc::clone(b.value()));
        bucket.map(|b| b.snapshot()).unwrap_or_default()
    }
}

/// Shared handle to a dispatcher. Cloning is cheap; all clones see the same
/// registrations.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("buckets", &self.inner.buckets.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one concrete event variant.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// disposed or dropped.
    pub fn register<T, F>(&self, handler: F) -> Subscription
    where
        T: EventVariant,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |event: &DomainEvent| {
            if let Some(payload) = T::from_event(event) {
                handler(payload);
            }
        });
        self.insert(Topic::Kind(T::KIND), handler)
    }

    /// Register a handler that receives every event, after the
    /// variant-specific handlers.
    pub fn register_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.insert(Topic::Any, Arc::new(handler))
    }

    fn insert(&self, topic: Topic, handler: Handler) -> Subscription {
        if self.is_disposed() {
            tracing::warn!(?topic, "Registration on a disposed dispatcher ignored");
            return Subscription::inert();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        {
            // The entry holds the shard write lock that `clear` also needs, so
            // a dispose racing this call either sees the push or prevents it.
            let entry = self.inner.buckets.entry(topic);
            if self.is_disposed() {
                drop(entry);
                tracing::warn!(?topic, "Registration raced dispatcher disposal; ignored");
                return Subscription::inert();
            }
            entry.or_default().lock().push(HandlerEntry { id, handler });
        }

        Subscription {
            registration: Some(Registration {
                dispatcher: Arc::downgrade(&self.inner),
                topic,
                id,
            }),
        }
    }

    /// Deliver `event` to the handlers of its kind, then to catch-all handlers.
    pub fn dispatch(&self, event: impl Into<DomainEvent>) {
        let event = event.into();
        if self.is_disposed() {
            return;
        }

        tracing::trace!(
            event_type = event.event_type(),
            unit_id = %event.unit_id(),
            "Dispatching domain event"
        );

        let typed = self.inner.snapshot(Topic::Kind(event.kind()));
        let any = self.inner.snapshot(Topic::Any);

        for handler in typed.iter().chain(any.iter()) {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                tracing::error!(
                    event_type = event.event_type(),
                    unit_id = %event.unit_id(),
                    reason = panic_message(payload.as_ref()),
                    "Domain event handler panicked; continuing delivery"
                );
            }
        }
    }

    /// Number of handlers currently registered for `topic`.
    pub fn handler_count(&self, topic: Topic) -> usize {
        self.inner
            .buckets
            .get(&topic)
            .map(|b| b.lock().len())
            .unwrap_or(0)
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Drop every registration. The dispatcher stays usable.
    pub fn clear(&self) {
        self.inner.buckets.clear();
    }

    /// Drop every registration and stop all future delivery. Idempotent.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Event dispatcher disposed");
        }
        self.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Non-owning handle, for handlers that need to publish back into the
    /// dispatcher they are registered on.
    pub fn downgrade(&self) -> WeakEventDispatcher {
        WeakEventDispatcher {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning dispatcher handle. Dispatching through it is a no-op once every
/// [`EventDispatcher`] clone is gone.
#[derive(Clone, Default)]
pub struct WeakEventDispatcher {
    inner: Weak<DispatcherInner>,
}

impl WeakEventDispatcher {
    pub fn upgrade(&self) -> Option<EventDispatcher> {
        self.inner.upgrade().map(|inner| EventDispatcher { inner })
    }

    pub fn dispatch(&self, event: impl Into<DomainEvent>) {
        if let Some(dispatcher) = self.upgrade() {
            dispatcher.dispatch(event);
        }
    }
}

struct Registration {
    dispatcher: Weak<DispatcherInner>,
    topic: Topic,
    id: u64,
}

/// Token for one registered handler.
///
/// Disposing (or dropping) it removes exactly that handler; later dispatches
/// never reach it.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    registration: Option<Registration>,
}

impl Subscription {
    fn inert() -> Self {
        Self { registration: None }
    }

    /// Remove the handler. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(reg) = self.registration.take() {
            if let Some(inner) = reg.dispatcher.upgrade() {
                inner.remove(reg.topic, reg.id);
            }
        }
    }

    /// Whether the handler is still registered. Turns false after
    /// [`EventDispatcher::clear`] or dispose as well.
    pub fn is_active(&self) -> bool {
        self.registration.as_ref().is_some_and(|r| {
            r.dispatcher
                .upgrade()
                .is_some_and(|inner| inner.contains(r.topic, r.id))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registration {
            Some(reg) => f
                .debug_struct("Subscription")
                .field("topic", &reg.topic)
                .field("id", &reg.id)
                .finish(),
            None => f.write_str("Subscription(disposed)"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AttackPerformed, UnitDamaged, UnitDied};
    use crate::UnitId;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn damaged(unit_id: UnitId, damage: i32) -> UnitDamaged {
        UnitDamaged {
            unit_id,
            damage,
            hp_after: 100 - damage,
            occurred_at: Utc::now(),
        }
    }

    fn died(unit_id: UnitId) -> UnitDied {
        UnitDied {
            unit_id,
            occurred_at: Utc::now(),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let log = Arc::clone(&log);
            move |entry: &str| log.lock().unwrap().push(entry.to_string())
        };
        (log, sink)
    }

    #[test]
    fn delivers_typed_handlers_in_registration_order_then_any() {
        let dispatcher = EventDispatcher::new();
        let (log, sink) = recorder();

        let s1 = sink.clone();
        let _any = dispatcher.register_any(move |_| s1("any"));
        let s2 = sink.clone();
        let _first = dispatcher.register::<UnitDamaged, _>(move |_| s2("first"));
        let s3 = sink.clone();
        let _second = dispatcher.register::<UnitDamaged, _>(move |_| s3("second"));

        dispatcher.dispatch(damaged(UnitId::new(), 10));

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "any"]);
    }

    #[test]
    fn typed_handler_ignores_other_variants() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = dispatcher.register::<UnitDied, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let id = UnitId::new();
        dispatcher.dispatch(damaged(id, 5));
        dispatcher.dispatch(AttackPerformed {
            unit_id: id,
            occurred_at: Utc::now(),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(died(id));
        dispatcher.dispatch(died(id));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn typed_handler_receives_payload() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let _sub = dispatcher.register::<UnitDamaged, _>(move |e| {
            *s.lock().unwrap() = Some((e.damage, e.hp_after));
        });

        dispatcher.dispatch(damaged(UnitId::new(), 30));
        assert_eq!(*seen.lock().unwrap(), Some((30, 70)));
    }

    #[test]
    fn disposed_subscription_receives_nothing_further() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let mut sub = dispatcher.register::<UnitDamaged, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let id = UnitId::new();
        dispatcher.dispatch(damaged(id, 1));
        sub.dispose();
        sub.dispose();
        dispatcher.dispatch(damaged(id, 1));
        dispatcher.dispatch(damaged(id, 1));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let h = Arc::clone(&hits);
            let _sub = dispatcher.register_any(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
            dispatcher.dispatch(died(UnitId::new()));
        }
        dispatcher.dispatch(died(UnitId::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_last_handler_drops_bucket() {
        let dispatcher = EventDispatcher::new();
        let mut a = dispatcher.register::<UnitDied, _>(|_| {});
        let mut b = dispatcher.register::<UnitDied, _>(|_| {});
        assert_eq!(dispatcher.handler_count(Topic::Kind(EventKind::UnitDied)), 2);
        assert_eq!(dispatcher.bucket_count(), 1);

        a.dispose();
        assert_eq!(dispatcher.bucket_count(), 1);
        b.dispose();
        assert_eq!(dispatcher.bucket_count(), 0);
        assert_eq!(dispatcher.handler_count(Topic::Kind(EventKind::UnitDied)), 0);
    }

    #[test]
    fn panicking_handler_does_not_stop_delivery() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = dispatcher.register::<UnitDamaged, _>(|_| panic!("handler exploded"));
        let h = Arc::clone(&hits);
        let _good = dispatcher.register::<UnitDamaged, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let h = Arc::clone(&hits);
        let _any = dispatcher.register_any(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(damaged(UnitId::new(), 3));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn registration_during_dispatch_does_not_affect_in_flight_delivery() {
        let dispatcher = EventDispatcher::new();
        let late_hits = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(Mutex::new(Vec::new()));

        let d = dispatcher.clone();
        let late = Arc::clone(&late_hits);
        let keep = Arc::clone(&held);
        let _registrar = dispatcher.register::<UnitDamaged, _>(move |_| {
            let late = Arc::clone(&late);
            let sub = d.register::<UnitDamaged, _>(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
            keep.lock().unwrap().push(sub);
        });

        dispatcher.dispatch(damaged(UnitId::new(), 1));
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(damaged(UnitId::new(), 1));
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistering_during_dispatch_keeps_snapshot() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let v = Arc::clone(&victim);
        let _killer = dispatcher.register::<UnitDied, _>(move |_| {
            if let Some(mut sub) = v.lock().unwrap().take() {
                sub.dispose();
            }
        });
        let h = Arc::clone(&hits);
        *victim.lock().unwrap() = Some(dispatcher.register::<UnitDied, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        dispatcher.dispatch(died(UnitId::new()));
        dispatcher.dispatch(died(UnitId::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_is_idempotent_and_stops_delivery() {
        let dispatcher = EventDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = dispatcher.register_any(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispose();
        dispatcher.dispose();
        dispatcher.dispatch(died(UnitId::new()));

        assert!(dispatcher.is_disposed());
        assert_eq!(dispatcher.bucket_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        let late = dispatcher.register_any(|_| {});
        assert!(!late.is_active());
    }

    #[test]
    fn clear_keeps_dispatcher_usable() {
        let dispatcher = EventDispatcher::new();
        let _old = dispatcher.register_any(|_| {});
        dispatcher.clear();
        dispatcher.clear();
        assert_eq!(dispatcher.bucket_count(), 0);

        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _new = dispatcher.register_any(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.dispatch(died(UnitId::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_deactivates_subscriptions() {
        let dispatcher = EventDispatcher::new();
        let mut typed = dispatcher.register::<UnitDied, _>(|_| {});
        let any = dispatcher.register_any(|_| {});
        assert!(typed.is_active());
        assert!(any.is_active());

        dispatcher.clear();
        assert!(!typed.is_active());
        assert!(!any.is_active());

        // Disposing after a clear is harmless
        typed.dispose();
        let fresh = dispatcher.register::<UnitDied, _>(|_| {});
        assert!(fresh.is_active());
        assert_eq!(dispatcher.handler_count(Topic::Kind(EventKind::UnitDied)), 1);
    }

    #[test]
    fn registration_racing_dispose_leaves_nothing_behind() {
        for _ in 0..20 {
            let dispatcher = EventDispatcher::new();
            let start = Arc::new(std::sync::Barrier::new(5));

            let workers: Vec<_> = (0..4)
                .map(|i| {
                    let dispatcher = dispatcher.clone();
                    let start = Arc::clone(&start);
                    thread::spawn(move || {
                        start.wait();
                        (0..500)
                            .map(|_| {
                                if i % 2 == 0 {
                                    dispatcher.register::<UnitDied, _>(|_| {})
                                } else {
                                    dispatcher.register_any(|_| {})
                                }
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            start.wait();
            dispatcher.dispose();

            let subs: Vec<Subscription> = workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect();
            assert_eq!(dispatcher.bucket_count(), 0);
            assert!(subs.iter().all(|s| !s.is_active()));
        }
    }

    #[test]
    fn weak_handle_stops_after_dispatcher_dropped() {
        let dispatcher = EventDispatcher::new();
        let weak = dispatcher.downgrade();
        assert!(weak.upgrade().is_some());
        drop(dispatcher);
        assert!(weak.upgrade().is_none());
        weak.dispatch(died(UnitId::new()));
    }

    #[test]
    fn concurrent_register_dispatch_and_unregister() {
        let dispatcher = EventDispatcher::new();
        let total = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                let total = Arc::clone(&total);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let t = Arc::clone(&total);
                        let mut sub = if i % 2 == 0 {
                            dispatcher.register::<UnitDamaged, _>(move |_| {
                                t.fetch_add(1, Ordering::Relaxed);
                            })
                        } else {
                            dispatcher.register::<UnitDied, _>(move |_| {
                                t.fetch_add(1, Ordering::Relaxed);
                            })
                        };
                        dispatcher.dispatch(damaged(UnitId::new(), 1));
                        dispatcher.dispatch(died(UnitId::new()));
                        sub.dispose();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        // Every worker's own handler was live for its own dispatches
        assert!(total.load(Ordering::Relaxed) >= 8 * 200);
        assert_eq!(dispatcher.bucket_count(), 0);
    }
}
