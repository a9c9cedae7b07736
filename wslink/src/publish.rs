//!
//! Publish Manager (spec §4.3, component C3): the process-wide pub/sub
//! fan-out and the reference-counted attachment store shared by every
//! reply and publish send path.
//!
//! Per spec §9 design note ("Global publish manager"), this is not a
//! true global — it is constructed once by [`crate::server::WslinkServer`]
//! and handed to the handler and to every [`crate::registry::Protocol`]
//! via [`crate::registry::HandlerContext`], which keeps it out of
//! process-wide static state and lets tests build independent instances.
//!

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use async_trait::async_trait;

use crate::argument::Argument;
use crate::id::ClientId;

struct AttachmentEntry {
    bytes: Arc<Vec<u8>>,
    refcount: i64,
}

/// Process-wide mapping of placeholder key -> blob with a per-key
/// reference count (spec §3 "Publish Attachment Map").
pub struct AttachmentTable {
    next: AtomicU64,
    entries: Mutex<AHashMap<String, AttachmentEntry>>,
}

impl Default for AttachmentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentTable {
    pub fn new() -> Self {
        AttachmentTable {
            next: AtomicU64::new(0),
            entries: Mutex::new(AHashMap::new()),
        }
    }

    /// Allocate a fresh key for `bytes`, stored with refcount 0
    /// (increments occur at send time, spec §4.3 `addAttachment`).
    pub fn add(&self, bytes: Vec<u8>) -> String {
        let key = format!("wslink_bin{}", self.next.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().unwrap().insert(
            key.clone(),
            AttachmentEntry {
                bytes: Arc::new(bytes),
                refcount: 0,
            },
        );
        key
    }

    pub fn register(&self, key: &str) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.refcount += 1;
        }
    }

    pub fn unregister(&self, key: &str) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.refcount -= 1;
        }
    }

    /// Remove every key in `keys` whose refcount has returned to zero;
    /// keys still referenced by another in-flight send remain (spec §4.3
    /// `freeAttachments`).
    pub fn free(&self, keys: &[String]) {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            if let Some(entry) = entries.get(key) {
                if entry.refcount <= 0 {
                    entries.remove(key);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.lock().unwrap().get(key).map(|e| e.bytes.clone())
    }

    /// Snapshot of every key currently live in the table (spec §4.3
    /// `getAttachmentMap`), used to drive the sender's scan step — only
    /// keys already known to the table are candidates for substitution.
    pub fn snapshot_keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

/// A route's connection set, registered with the [`PublishManager`] so
/// it receives fan-out delivery (spec §4.3 `registerProtocol`).
#[async_trait]
pub trait PublishTarget: Send + Sync {
    async fn deliver(&self, topic: String, data: Argument, client_id: Option<ClientId>);
}

/// Process-wide (per spec; dependency-injected here — see module docs)
/// pub/sub fan-out queue and attachment store.
pub struct PublishManager {
    pub attachments: AttachmentTable,
    targets: Mutex<Vec<Arc<dyn PublishTarget>>>,
}

impl Default for PublishManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishManager {
    pub fn new() -> Self {
        PublishManager {
            attachments: AttachmentTable::new(),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn register_protocol(&self, target: Arc<dyn PublishTarget>) {
        self.targets.lock().unwrap().push(target);
    }

    pub fn unregister_protocol(&self, target: &Arc<dyn PublishTarget>) {
        self.targets
            .lock()
            .unwrap()
            .retain(|t| !Arc::ptr_eq(t, target));
    }

    /// Fan out a publish to every registered target (spec §4.3
    /// `publish`). Errors delivering to one target never abort delivery
    /// to another (spec §7 "Propagation").
    pub async fn publish(&self, topic: String, data: Argument, client_id: Option<ClientId>) {
        let targets: Vec<_> = self.targets.lock().unwrap().clone();
        for target in targets {
            target.deliver(topic.clone(), data.clone(), client_id.clone()).await;
        }
    }

    pub fn add_attachment(&self, bytes: Vec<u8>) -> String {
        self.attachments.add(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refcount_gates_free() {
        let table = AttachmentTable::new();
        let key = table.add(vec![1, 2, 3]);
        table.register(&key);
        table.register(&key);
        table.unregister(&key);
        table.free(&[key.clone()]);
        assert!(table.get(&key).is_some(), "still referenced, must survive free");

        table.unregister(&key);
        table.free(&[key.clone()]);
        assert!(table.get(&key).is_none(), "refcount at zero, must be freed");
    }

    #[tokio::test]
    async fn publish_reaches_every_registered_target() {
        struct Recorder(Mutex<Vec<String>>);
        #[async_trait]
        impl PublishTarget for Recorder {
            async fn deliver(&self, topic: String, _data: Argument, _client_id: Option<ClientId>) {
                self.0.lock().unwrap().push(topic);
            }
        }

        let manager = PublishManager::new();
        let a = Arc::new(Recorder(Mutex::new(Vec::new())));
        let b = Arc::new(Recorder(Mutex::new(Vec::new())));
        manager.register_protocol(a.clone());
        manager.register_protocol(b.clone());

        manager.publish("topic.x".to_string(), Argument::Null, None).await;

        assert_eq!(a.0.lock().unwrap().as_slice(), ["topic.x"]);
        assert_eq!(b.0.lock().unwrap().as_slice(), ["topic.x"]);

        manager.unregister_protocol(&a);
        manager.publish("topic.y".to_string(), Argument::Null, None).await;
        assert_eq!(a.0.lock().unwrap().as_slice(), ["topic.x"]);
        assert_eq!(b.0.lock().unwrap().as_slice(), ["topic.x", "topic.y"]);
    }
}
