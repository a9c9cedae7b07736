//!
//! Server Lifecycle (spec §4.6, component C6): startup log line, the
//! idle-shutdown timer that races against new connections, and the
//! blocking `start()`/`stop()` pair.
//!

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use workflow_core::channel::{Channel, Sender};
use workflow_log::*;
use workflow_websocket::server::{Result as WsResult, WebSocketServer};

use crate::handler::WslinkHandler;
use crate::publish::PublishManager;
use crate::registry::Protocol;

/// Cancellable delayed task (spec §6.3 Timer Facility:
/// `scheduleCoroutine(delay, callable) -> handle` with `handle.cancel()`).
/// Built directly on a `tokio` task handle rather than importing a
/// separate scheduler crate — `abort()` gives cooperative
/// pre-fire cancellation for free.
pub struct ShutdownTimer {
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Default for ShutdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownTimer {
    pub fn new() -> Self {
        ShutdownTimer {
            handle: Mutex::new(None),
        }
    }

    /// (Re-)arm the timer: after `delay`, send on `fire`. Any
    /// previously pending timer is cancelled first.
    pub fn arm(&self, delay: Duration, fire: Sender<()>) {
        self.cancel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fire.send(()).await;
        });
        *self.handle.lock().unwrap() = Some(handle);
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// Configuration the caller assembles and hands to [`WslinkServer::new`]
/// (spec §6.2 external config; there is no file-based config layer in
/// this crate — the original's config dict is an external launcher's
/// responsibility, out of scope per spec §1).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Idle-shutdown timeout: how long the server waits with zero
    /// connected clients before stopping (spec §4.6).
    pub timeout: Duration,
    /// Shared secret checked by `wslink.hello`.
    pub secret: String,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration, secret: impl Into<String>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            timeout,
            secret: secret.into(),
        }
    }
}

/// The top-level object: owns the WebSocket listener, the idle-shutdown
/// timer, and the handler's connection table.
pub struct WslinkServer {
    handler: Arc<WslinkHandler>,
    ws_server: Arc<WebSocketServer<WslinkHandler>>,
    shutdown_timer: Arc<ShutdownTimer>,
    config: ServerConfig,
    stop_request: Channel<()>,
}

impl WslinkServer {
    /// Construct a server around `protocol` (the top-level protocol
    /// object; its secret is used for `wslink.hello`).
    pub fn build(protocol: Arc<dyn Protocol>, config: ServerConfig) -> Arc<Self> {
        let publish = Arc::new(PublishManager::new());
        let stop_request = Channel::unbounded();
        let shutdown_timer = Arc::new(ShutdownTimer::new());

        let handler = WslinkHandler::new(
            protocol,
            publish.clone(),
            stop_request.sender.clone(),
            shutdown_timer.clone(),
            config.timeout,
        );
        publish.register_protocol(handler.clone());

        let ws_server = WebSocketServer::new(handler.clone(), None);

        Arc::new(WslinkServer {
            handler,
            ws_server,
            shutdown_timer,
            config,
            stop_request,
        })
    }

    /// Close every open connection with `GOING_AWAY` without stopping
    /// the listener (spec §9 supplemented feature `disconnectClients`).
    pub async fn disconnect_all(&self) {
        self.handler.disconnect_all().await;
    }

    /// Request shutdown out of band (not only via the idle timer).
    pub fn request_stop(&self) {
        let _ = self.stop_request.sender.try_send(());
    }

    /// Bind and run the accept loop; blocks until [`Self::request_stop`]
    /// is called (directly, or indirectly via the idle-shutdown timer
    /// firing) and the listener has fully drained (spec §4.6, §9
    /// "Cooperative lifecycle").
    pub async fn start(self: &Arc<Self>) -> WsResult<()> {
        // External launchers synchronize on this exact line; flushed
        // explicitly since stdout buffering has historically hidden it.
        log_info!("wslink: Starting factory");
        std::io::stdout().flush().ok();

        self.shutdown_timer
            .arm(self.config.timeout, self.stop_request.sender.clone());

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = self.ws_server.bind(&addr).await?;

        let stop_rx = self.stop_request.receiver.clone();
        let ws_server = self.ws_server.clone();
        let handler = self.handler.clone();
        tokio::spawn(async move {
            if stop_rx.recv().await.is_ok() {
                handler.disconnect_all().await;
                let _ = ws_server.stop();
            }
        });

        self.ws_server.listen(listener, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MethodRegistry;
    use std::time::Duration;

    struct Noop;
    impl Protocol for Noop {
        fn register(self: Arc<Self>, _registry: &mut MethodRegistry) {}
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn idle_server_stops_within_timeout() {
        let config = ServerConfig::new("127.0.0.1", 0, Duration::from_millis(200), "secret");
        let server = WslinkServer::build(Arc::new(Noop), config);
        let result = tokio::time::timeout(Duration::from_secs(1), server.start()).await;
        assert!(result.is_ok(), "start() must return once the idle timer fires");
    }

    #[test]
    fn shutdown_timer_cancel_is_idempotent() {
        let timer = ShutdownTimer::new();
        timer.cancel();
        timer.cancel();
    }
}
