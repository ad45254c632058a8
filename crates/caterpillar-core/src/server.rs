//! Native HTTP server implementation
//!
//! hyper HTTP/1.1 on a multi-threaded tokio runtime:
//! - One task per accepted connection
//! - Routes resolved against an immutable `RouteTable`, no locks
//! - Listener bound without SO_REUSEPORT so a second instance fails to bind
//! - Dual-stack `[::]` by default, IPv4-only when the host has no IPv6
//! - Graceful shutdown drains in-flight connections

use crate::{Error, Method, Response, Result, RouteTable};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Notify};

/// Port the responder listens on
pub const DEFAULT_PORT: u16 = 8000;

/// How long `serve` waits for in-flight connections after shutdown
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const LISTEN_BACKLOG: i32 = 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Tokio worker threads
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "::".to_string(),
            port: DEFAULT_PORT,
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind; `hostname` must be an IP literal
    pub fn addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .hostname
            .parse()
            .map_err(|_| Error::InvalidAddress(self.hostname.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracks active connections for graceful shutdown
///
/// Used to:
/// - Count active connections
/// - Signal shutdown to every open connection
/// - Wait for existing connections to drain
#[derive(Debug)]
pub struct ConnectionTracker {
    active: AtomicU64,
    shutdown: watch::Sender<bool>,
    drained: Notify,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            shutdown: watch::channel(false).0,
            drained: Notify::new(),
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn decrement(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Signal that shutdown is in progress
    pub fn start_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Receiver that flips to `true` once shutdown starts
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Resolve once no connections are active
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Server state shared across all connections
#[derive(Debug)]
pub struct ServerState {
    pub routes: RouteTable,
    pub tracker: ConnectionTracker,
}

impl ServerState {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Resolve a request to its response. `OPTIONS` on a known path lists
    /// its methods; anything else unmatched gets 404.
    pub fn handle<B>(&self, req: &hyper::Request<B>) -> Response {
        let path = req.uri().path();
        let response = Method::from_http(req.method())
            .and_then(|method| self.routes.resolve(method, path))
            .unwrap_or_else(Response::not_found);

        tracing::debug!(
            method = %req.method(),
            path,
            status = response.status.as_u16(),
            "request"
        );
        response
    }
}

/// Create a bound, listening TCP socket
pub fn create_listener(addr: &SocketAddr) -> std::io::Result<Socket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // SO_REUSEADDR - allow binding to address in TIME_WAIT.
    // Windows semantics would let a second listener steal the port.
    #[cfg(unix)]
    socket.set_reuse_address(true)?;

    // `[::]` also accepts IPv4 clients as v4-mapped addresses
    if is_ipv6_wildcard(addr) {
        socket.set_only_v6(false)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket)
}

fn is_ipv6_wildcard(addr: &SocketAddr) -> bool {
    addr.is_ipv6() && addr.ip().is_unspecified()
}

/// Bound responder, ready to serve
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Bind the listening socket. Must be called from within a tokio runtime.
    ///
    /// A `[::]` bind that fails for any reason other than the port being
    /// taken is retried on `0.0.0.0`.
    pub fn bind(config: &ServerConfig, routes: RouteTable) -> Result<Self> {
        let addr = config.addr()?;
        let socket = match create_listener(&addr) {
            Ok(socket) => socket,
            Err(e) if is_ipv6_wildcard(&addr) && e.kind() != std::io::ErrorKind::AddrInUse => {
                let fallback = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), addr.port());
                tracing::warn!(error = %e, %fallback, "IPv6 unavailable, listening on IPv4 only");
                create_listener(&fallback).map_err(|source| Error::Bind {
                    addr: fallback,
                    source,
                })?
            }
            Err(source) => return Err(Error::Bind { addr, source }),
        };
        let listener = TcpListener::from_std(socket.into())?;

        Ok(Self {
            listener,
            state: Arc::new(ServerState::new(routes)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Accept connections until `shutdown` resolves, then drain.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server { listener, state } = self;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => spawn_connection(state.clone(), stream, peer),
                    Err(e) => {
                        // EMFILE and friends; back off instead of spinning
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        drop(listener);
        state.tracker.start_shutdown();
        tracing::info!(active = state.tracker.count(), "shutting down");

        if tokio::time::timeout(DRAIN_TIMEOUT, state.tracker.wait_drained())
            .await
            .is_err()
        {
            tracing::warn!(
                active = state.tracker.count(),
                "drain timed out, dropping remaining connections"
            );
        }

        Ok(())
    }
}

/// Decrements the active count when a connection task ends, panics included
struct ConnectionGuard(Arc<ServerState>);

impl ConnectionGuard {
    fn new(state: Arc<ServerState>) -> Self {
        state.tracker.increment();
        Self(state)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.tracker.decrement();
    }
}

fn spawn_connection(state: Arc<ServerState>, stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
    }

    let guard = ConnectionGuard::new(state.clone());
    tokio::spawn(async move {
        let _guard = guard;
        let mut shutdown = state.tracker.subscribe();
        let shutdown_signal = async move {
            let _ = shutdown.wait_for(|down| *down).await;
        };

        let svc_state = state.clone();
        let service = service_fn(move |req: hyper::Request<Incoming>| {
            let res = svc_state.handle(&req).into_hyper();
            async move { Ok::<_, Infallible>(res) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let result = tokio::select! {
            res = conn.as_mut() => res,
            _ = shutdown_signal => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        };

        if let Err(e) = result {
            if e.is_incomplete_message() {
                tracing::debug!(%peer, error = %e, "connection closed mid-request");
            } else {
                tracing::warn!(%peer, error = %e, "connection error");
            }
        }
    });
}
