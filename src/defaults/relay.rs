//! # Preference Relay
//!
//! A behavior relay mirrored into the defaults store: the in-memory value
//! is always the last accepted one (a caller-supplied default stands in
//! when the entry is absent or undecodable), and every accept is
//! persisted. Encode failures are a programming error: asserted in
//! debug builds, logged and swallowed in release, never surfaced to
//! callers.

use std::fmt;
use std::sync::Arc;

use futures::{Stream, StreamExt, pin_mut};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use toml::Value;

use super::DefaultsStore;

/// Stored values sit inside a wrapper table so scalars and enums encode
/// uniformly under their key.
#[derive(Serialize, Deserialize)]
struct Entry<T> {
    value: T,
}

pub struct PreferenceRelay<T> {
    store: Arc<DefaultsStore>,
    key: String,
    default: T,
    tx: watch::Sender<T>,
}

impl<T> PreferenceRelay<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Seed the relay from the stored entry for `key`, falling back to
    /// `default` when the entry is absent or does not decode.
    pub fn new(store: Arc<DefaultsStore>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let initial = store
            .data(&key)
            .and_then(|value| value.try_into::<Entry<T>>().ok())
            .map(|entry| entry.value)
            .unwrap_or_else(|| default.clone());
        let (tx, _) = watch::channel(initial);
        Self {
            store,
            key,
            default,
            tx,
        }
    }

    /// Accept a new value (`None` means "back to the default") and
    /// persist: present values are encoded and stored, absent ones remove
    /// the stored entry.
    pub fn accept(&self, value: Option<T>) {
        let current = value.clone().unwrap_or_else(|| self.default.clone());
        self.tx.send_replace(current);
        match value {
            Some(value) => match Value::try_from(Entry { value }) {
                Ok(encoded) => self.store.set(&self.key, encoded),
                Err(e) => {
                    warn!("preference encode failed for '{}': {e}", self.key);
                    debug_assert!(false, "preference encode failed for '{}': {e}", self.key);
                }
            },
            None => self.store.remove(&self.key),
        }
    }

    /// The latest accepted value.
    pub fn value(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Raw channel access for callers that want `watch` semantics
    /// directly.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// The relay as a push stream: the current value is replayed to each
    /// new subscriber immediately, then every subsequently accepted
    /// value. The stream never completes while the relay is alive. Rapid
    /// consecutive accepts may coalesce for a slow consumer; the stream
    /// always converges on the latest value.
    pub fn stream(&self) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send + Sync + 'static,
    {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        futures::stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let value = rx.borrow_and_update().clone();
            Some((value, rx))
        })
    }
}

/// Forward every value of `stream` into the relay. Upstream completion
/// is a no-op; the relay simply stops receiving.
pub async fn bind<T, S>(stream: S, relay: &PreferenceRelay<T>)
where
    T: Serialize + DeserializeOwned + Clone,
    S: Stream<Item = T>,
{
    pin_mut!(stream);
    while let Some(value) = stream.next().await {
        relay.accept(Some(value));
    }
}

/// Like [`bind`] for fallible streams. A binding is not expected to
/// observe failures; an `Err` item is an unrecoverable programming error.
pub async fn bind_results<T, E, S>(stream: S, relay: &PreferenceRelay<T>)
where
    T: Serialize + DeserializeOwned + Clone,
    E: fmt::Display,
    S: Stream<Item = Result<T, E>>,
{
    pin_mut!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => relay.accept(Some(value)),
            Err(e) => panic!("error in binding: {e}"),
        }
    }
}
