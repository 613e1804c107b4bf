// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A synchronous, ordered multicast channel.
//!
//! Every subscriber receives the same `&mut T`, one after another, in the order
//! they subscribed. This is how subscribers hand a decision back to the
//! publisher: the publisher inspects the value once all of them have run.
//!
//! [`Signal::publish`] iterates over a snapshot of the subscriber list taken
//! under the lock, and the lock is released before any subscriber runs. A
//! subscriber that subscribes or unsubscribes (itself or others) while a
//! publish is in progress therefore neither deadlocks nor disturbs the current
//! round; the change is observed by the next publish.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

type Handler<T> = Arc<dyn Fn(&mut T) + Send + Sync + 'static>;

/// Identifies one subscription on one [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An ordered list of subscribers that all receive each published value.
///
/// ```
/// use tls_manager::signal::Signal;
///
/// let signal = Signal::new();
/// let first = signal.subscribe(|n: &mut u32| *n += 1);
/// signal.subscribe(|n: &mut u32| *n *= 10);
///
/// let mut n = 1;
/// assert_eq!(signal.publish(&mut n), 2);
/// assert_eq!(n, 20);
///
/// assert!(signal.unsubscribe(first));
/// signal.publish(&mut n);
/// assert_eq!(n, 200);
/// ```
pub struct Signal<T> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Appends `handler` to the subscriber list.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes the subscription, returning `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Detaches every subscriber.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invokes every current subscriber with `value` and returns how many ran.
    pub fn publish(&self, value: &mut T) -> usize {
        let snapshot: Vec<Handler<T>> = self
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &snapshot {
            handler(value);
        }
        snapshot.len()
    }

    // A panicking subscriber can't leave the list half-modified: it never runs
    // while the lock is held.
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Handler<T>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.len())
            .finish()
    }
}
