//! Processor metadata with an observable "options changed" signal.
//!
//! Editors and other front ends subscribe to an [`OptionsHandle`] and get called
//! whenever a processor's [`ProcessorOptions`] change, for example when a
//! connection hands one of its parameters over to an upstream signal. The
//! returned [`Subscription`] unsubscribes when dropped.
//!
//! Everything here runs on the control thread. The audio thread never touches
//! options or observers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Display-independent metadata about a processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// One-sentence description of what the processor models.
    pub description: String,
    /// Authors of the model.
    pub authors: Vec<String>,
    /// Parameter ids currently driven by an input connection.
    pub disabled_params: Vec<String>,
}

impl ProcessorOptions {
    /// Options with a description and author list.
    pub fn new(description: impl Into<String>, authors: &[&str]) -> Self {
        Self {
            description: description.into(),
            authors: authors.iter().map(|a| (*a).to_string()).collect(),
            disabled_params: Vec::new(),
        }
    }
}

type Callback = Arc<dyn Fn(&ProcessorOptions) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

struct Inner {
    options: Mutex<ProcessorOptions>,
    observers: Arc<Observers>,
}

/// Shared, observable processor options.
#[derive(Clone)]
pub struct OptionsHandle {
    inner: Arc<Inner>,
}

impl OptionsHandle {
    /// Wraps initial options.
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options: Mutex::new(options),
                observers: Arc::new(Observers::default()),
            }),
        }
    }

    /// Copy of the current options.
    pub fn get(&self) -> ProcessorOptions {
        self.inner.options.lock().clone()
    }

    /// Replaces the options and notifies subscribers if anything changed.
    pub fn set(&self, options: ProcessorOptions) {
        let changed = {
            let mut current = self.inner.options.lock();
            if *current == options {
                false
            } else {
                *current = options;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Edits the options in place, then notifies if anything changed.
    pub fn update(&self, edit: impl FnOnce(&mut ProcessorOptions)) {
        let mut next = self.get();
        edit(&mut next);
        self.set(next);
    }

    /// Registers a callback. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ProcessorOptions) + Send + Sync + 'static,
    {
        let observers = &self.inner.observers;
        let id = observers.next_id.fetch_add(1, Ordering::Relaxed);
        observers.callbacks.lock().push((id, Arc::new(callback)));
        Subscription {
            observers: Arc::downgrade(observers),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.callbacks.lock().len()
    }

    fn notify(&self) {
        let options = self.get();
        // callbacks may drop subscriptions, so call them outside the lock
        let callbacks: Vec<Callback> = self
            .inner
            .observers
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(&options);
        }
    }
}

impl Default for OptionsHandle {
    fn default() -> Self {
        Self::new(ProcessorOptions::default())
    }
}

impl core::fmt::Debug for OptionsHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OptionsHandle")
            .field("options", &*self.inner.options.lock())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Scoped registration on an [`OptionsHandle`]. Dropping it unsubscribes.
pub struct Subscription {
    observers: Weak<Observers>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.callbacks.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn subscribers_see_changes() {
        let handle = OptionsHandle::new(ProcessorOptions::new("clipper", &["someone"]));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = handle.subscribe(move |opts| {
            assert_eq!(opts.disabled_params, vec!["drive".to_string()]);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.update(|o| o.disabled_params.push("drive".into()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unchanged_options_do_not_notify() {
        let handle = OptionsHandle::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = handle.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.set(ProcessorOptions::default());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let handle = OptionsHandle::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let sub = handle.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.subscriber_count(), 1);
        drop(sub);
        assert_eq!(handle.subscriber_count(), 0);

        handle.update(|o| o.description = "changed".into());
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_handle_is_harmless() {
        let handle = OptionsHandle::default();
        let sub = handle.subscribe(|_| {});
        drop(handle);
        drop(sub);
    }
}
