//! Cancellation registry for keyed effects.
//!
//! The store owns one registry per instance. Every `Effect::Cancellable`
//! registers here under its [`EffectId`]; `Effect::Cancel` signals every
//! token registered under the key. Cancellation is cooperative: effect
//! tasks race their work against the token with `tokio::select!` and
//! stop emitting once it fires - the runtime never forcibly interrupts a
//! blocked native call.

use mapsearch_core::effect::EffectId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// One registered cancellable effect.
struct Entry {
    /// Registry-unique id, used to deregister exactly this entry
    entry_id: u64,
    /// Cancel signal; receivers observe the flip to `true`
    sender: watch::Sender<bool>,
}

type KeyMap = HashMap<EffectId, Vec<Entry>>;

/// Token an effect task races its work against.
///
/// A token can observe several registrations at once (nested
/// `Cancellable` wrappers join their tokens); it fires when any of them
/// is cancelled. A token with no registrations never fires.
#[derive(Clone, Default)]
pub struct CancellationToken {
    receivers: Vec<watch::Receiver<bool>>,
}

impl CancellationToken {
    /// Whether any observed registration has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receivers.iter().any(|rx| *rx.borrow())
    }

    /// Also observe another token's registrations
    pub fn join(&mut self, other: CancellationToken) {
        self.receivers.extend(other.receivers);
    }

    /// Resolve once any observed registration is cancelled.
    ///
    /// Never resolves for a token with no registrations, and never
    /// resolves spuriously: a registration whose sender goes away
    /// without cancelling is treated as never cancelled.
    pub async fn cancelled(&mut self) {
        if self.receivers.is_empty() {
            std::future::pending::<()>().await;
        }

        let waits = self
            .receivers
            .iter_mut()
            .map(|rx| {
                Box::pin(async move {
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        // Sender dropped without cancelling
                        std::future::pending::<()>().await;
                    }
                })
            })
            .collect::<Vec<_>>();

        futures::future::select_all(waits).await;
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("registrations", &self.receivers.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// RAII guard deregistering one entry when the effect finishes.
///
/// Dropping the guard removes the entry from the registry so completed
/// effects do not accumulate under their key. Dropping does NOT cancel
/// the effect - it only makes the key stop addressing it.
pub struct CancellationGuard {
    inner: Arc<Mutex<KeyMap>>,
    id: EffectId,
    entry_id: u64,
}

impl Drop for CancellationGuard {
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn drop(&mut self) {
        let mut map = self.inner.lock().unwrap();
        if let Some(entries) = map.get_mut(&self.id) {
            entries.retain(|entry| entry.entry_id != self.entry_id);
            if entries.is_empty() {
                map.remove(&self.id);
            }
        }
    }
}

impl std::fmt::Debug for CancellationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationGuard")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Map from [`EffectId`] to the live effects registered under it.
///
/// Cloning shares the underlying map; the store and every spawned
/// effect task see the same registrations.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<KeyMap>>,
    next_entry: Arc<AtomicU64>,
}

impl CancellationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect under a key.
    ///
    /// With `cancel_in_flight`, everything already registered under the
    /// key is cancelled first, so at most one effect lives under the key
    /// afterwards. Without it, the new effect joins whatever is already
    /// there and `cancel` addresses them all.
    ///
    /// Returns the token the effect must race against and the guard
    /// that deregisters the entry on drop.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    #[must_use]
    pub fn register(
        &self,
        id: &EffectId,
        cancel_in_flight: bool,
    ) -> (CancellationToken, CancellationGuard) {
        let mut map = self.inner.lock().unwrap();

        if cancel_in_flight {
            if let Some(entries) = map.remove(id) {
                for entry in &entries {
                    let _ = entry.sender.send(true);
                }
                tracing::debug!(id = %id, superseded = entries.len(), "Cancelled in-flight effects");
            }
        }

        let entry_id = self.next_entry.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(false);
        map.entry(id.clone()).or_default().push(Entry { entry_id, sender });

        let token = CancellationToken {
            receivers: vec![receiver],
        };
        let guard = CancellationGuard {
            inner: Arc::clone(&self.inner),
            id: id.clone(),
            entry_id,
        };

        (token, guard)
    }

    /// Cancel every effect registered under the key.
    ///
    /// Returns how many effects were signalled. Cancelling an idle key
    /// is a no-op returning 0.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    pub fn cancel(&self, id: &EffectId) -> usize {
        let removed = self.inner.lock().unwrap().remove(id);

        match removed {
            Some(entries) => {
                for entry in &entries {
                    let _ = entry.sender.send(true);
                }
                entries.len()
            },
            None => 0,
        }
    }

    /// Cancel every registered effect under every key.
    ///
    /// Used during store shutdown so long-lived stream subscriptions
    /// drain instead of holding the store open forever.
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Entry> = self
            .inner
            .lock()
            .unwrap()
            .drain()
            .flat_map(|(_, entries)| entries)
            .collect();

        for entry in &drained {
            let _ = entry.sender.send(true);
        }
        drained.len()
    }

    /// Whether any effect is currently registered under the key
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    #[must_use]
    pub fn is_active(&self, id: &EffectId) -> bool {
        self.inner.lock().unwrap().contains_key(id)
    }
}

impl std::fmt::Debug for CancellationRegistry {
    #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("active_keys", &self.inner.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}
