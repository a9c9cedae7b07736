//!
//! Method Registry (spec §4.2, component C2). Spec §9 design note
//! ("Reflection-based registry") replaces the source's attribute-tag
//! scan with an explicit registration step: a [`Protocol`] implements
//! [`Protocol::register`] and populates a [`MethodRegistry`] directly,
//! the way the `rpc` crate's `Interface::method()` builder does.
//!

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ahash::AHashMap;
use workflow_core::channel::Sender;

use crate::argument::Argument;
use crate::error::MethodError;
use crate::id::ClientId;
use crate::publish::PublishManager;

/// Future returned by a registered RPC method.
pub type MethodFuture = Pin<Box<dyn Future<Output = MethodResult> + Send>>;

/// Result type every registered RPC method resolves to.
pub type MethodResult = std::result::Result<Argument, MethodError>;

/// Boxed method closure stored in the [`MethodRegistry`]. The protocol
/// object is not threaded through as an explicit parameter (spec §9:
/// "the source inserts `obj` at position 0 of `args`") — in this typed
/// target the closure captures its owning `Arc<Self>` instead, which is
/// the idiomatic equivalent of `func(self, *args)`.
pub type MethodFn = Arc<dyn Fn(Vec<Argument>, AHashMap<String, Argument>) -> MethodFuture + Send + Sync>;

/// URI -> callable mapping (spec §3 "Function Map"). Built once per
/// handler and treated as read-only thereafter (spec §5).
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: AHashMap<String, MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        MethodRegistry {
            methods: AHashMap::new(),
        }
    }

    /// Register a method under `uri`. Duplicate URIs: last-writer-wins
    /// (spec §4.2).
    pub fn method<F>(&mut self, uri: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Argument>, AHashMap<String, Argument>) -> MethodFuture + Send + Sync + 'static,
    {
        self.methods.insert(uri.into(), Arc::new(handler));
    }

    pub fn get(&self, uri: &str) -> Option<MethodFn> {
        self.methods.get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// The three callables injected into a [`Protocol`] before registry
/// construction (spec §4.2 and §6.2: `init(publish, addAttachment,
/// stopServer)`).
#[derive(Clone)]
pub struct HandlerContext {
    publish: Arc<PublishManager>,
    stop: Sender<()>,
}

impl HandlerContext {
    pub fn new(publish: Arc<PublishManager>, stop: Sender<()>) -> Self {
        HandlerContext { publish, stop }
    }

    /// Enqueue a publish fan-out (spec §4.3 `publish`).
    pub fn publish(&self, topic: impl Into<String>, data: Argument, client_id: Option<ClientId>) {
        let publish = self.publish.clone();
        let topic = topic.into();
        tokio::spawn(async move {
            publish.publish(topic, data, client_id).await;
        });
    }

    /// Allocate a placeholder key for `bytes` (spec §4.3 `addAttachment`).
    pub fn add_attachment(&self, bytes: Vec<u8>) -> String {
        self.publish.add_attachment(bytes)
    }

    /// Request server shutdown (spec §6.2 `stopServer`).
    pub fn stop_server(&self) {
        let _ = self.stop.try_send(());
    }
}

/// User-supplied object exposing RPC methods (spec §6.2 "Protocol
/// Object Contract").
pub trait Protocol: Send + Sync + 'static {
    /// Auxiliary objects whose methods are merged into this protocol's
    /// URI space (spec: "link protocol").
    fn link_protocols(self: Arc<Self>) -> Vec<Arc<dyn Protocol>> {
        Vec::new()
    }

    /// Shared secret checked by `wslink.hello`. Only the server
    /// protocol's secret is consulted (spec §4.5 rule 2).
    fn secret(&self) -> String {
        String::new()
    }

    /// Called once, before [`Protocol::register`], with the callables
    /// this object may capture and retain.
    fn init(self: Arc<Self>, _ctx: &HandlerContext) {}

    /// Populate `registry` with this object's URIs.
    fn register(self: Arc<Self>, registry: &mut MethodRegistry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;
    impl Protocol for Echo {
        fn register(self: Arc<Self>, registry: &mut MethodRegistry) {
            registry.method("echo.blob", |args, _kwargs| {
                Box::pin(async move { Ok(args.into_iter().next().unwrap_or(Argument::Null)) })
            });
        }
    }

    #[tokio::test]
    async fn registered_method_is_invocable() {
        let mut registry = MethodRegistry::new();
        Arc::new(Echo).register(&mut registry);
        let method = registry.get("echo.blob").expect("registered");
        let result = method(vec![Argument::String("hi".into())], AHashMap::new())
            .await
            .unwrap();
        assert_eq!(result, Argument::String("hi".into()));
        assert!(registry.get("no.such.method").is_none());
    }

    #[test]
    fn duplicate_uri_last_writer_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = MethodRegistry::new();
        registry.method("dup", |_, _| Box::pin(async { Ok(Argument::Number(1.into())) }));
        let calls2 = calls.clone();
        registry.method("dup", move |_, _| {
            calls2.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Argument::Number(2.into())) })
        });
        assert_eq!(registry.len(), 1);
    }
}
