//! Deferred lifecycle notifications. Grounded on `fyrox-resource`'s `ResourceEventBroadcaster`:
//! a slab of `mpsc::Sender`s that every publish fans out to, so delivery is always through a
//! queue a listener drains at its own pace (typically once per frame, on the main thread).

use crate::asset::Asset;
use crate::asset_id::AssetId;
use parking_lot::Mutex;
use slab::Slab;
use std::sync::mpsc::Sender;

/// Lifecycle event published by the manager. Both variants fire exactly once per load attempt.
#[derive(Clone)]
pub enum AssetNotification {
    Loaded { id: AssetId, asset: Asset },
    FailedLoad { id: AssetId },
}

/// A listener's place in the broadcaster; returned by [`EventBroadcaster::add`] and needed to
/// [`EventBroadcaster::remove`] it again.
pub type ListenerHandle = usize;

/// Fans out [`AssetNotification`]s to every registered listener. Cheap to clone; every clone
/// shares the same listener table.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    listeners: std::sync::Arc<Mutex<Slab<Sender<AssetNotification>>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sender: Sender<AssetNotification>) -> ListenerHandle {
        self.listeners.lock().insert(sender)
    }

    pub fn remove(&self, handle: ListenerHandle) -> Option<Sender<AssetNotification>> {
        self.listeners.lock().try_remove(handle)
    }

    /// Sends `event` to every listener, dropping any whose receiving end has gone away.
    pub fn broadcast(&self, event: AssetNotification) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|_, sender| sender.send(event.clone()).is_ok());
    }
}
