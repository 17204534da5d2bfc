//! Server instances
//!
//! 1つのリスナーを受け持つサーバ。接続の状態遷移をフックに通知するので、
//! `ServerGroup` がそれを数えて一番空いているインスタンスを選べる。

pub mod conn;
pub mod group;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::{debug, error, info};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::handler::{BoxedService, Service};

pub use group::{ConnCounter, ServerGroup};

pub const DEFAULT_TCP_BACKLOG: i32 = 4096;
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle states reported to the hook.
///
/// Every connection reports exactly one opening state (`New` when accepted here,
/// `Active` when adopted already in use) and exactly one terminal state
/// (`Closed`, or `Hijacked` when something else took the socket over).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    New,
    Active,
    Closed,
    Hijacked,
}

impl ConnState {
    /// 開いた状態か
    #[inline]
    pub fn is_opening(self) -> bool {
        matches!(self, ConnState::New | ConnState::Active)
    }

    /// 終端状態か
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnState::Closed | ConnState::Hijacked)
    }
}

pub type ConnStateHook = Arc<dyn Fn(SocketAddr, ConnState) + Send + Sync>;

/// A server instance: one listener, one service, one connection-state hook.
pub struct Server {
    name: String,
    bind: [u8; 4],
    port: u16,
    backlog: i32,
    header_read_timeout: Duration,
    service: BoxedService,
    conn_state: Option<ConnStateHook>,
}

impl Server {
    pub fn builder<S: Service>(service: S) -> ServerBuilder {
        ServerBuilder::new(Arc::new(service))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((self.bind, self.port))
    }

    /// このサーバに渡されたサービス
    pub fn service(&self) -> &BoxedService {
        &self.service
    }

    /// 接続状態フックを差し替える
    pub fn set_conn_state_hook(&mut self, hook: ConnStateHook) {
        self.conn_state = Some(hook);
    }

    /// Reports a lifecycle transition to the hook, if one is attached.
    pub fn track_state(&self, peer: SocketAddr, state: ConnState) {
        if let Some(hook) = &self.conn_state {
            hook(peer, state);
        }
    }

    /// socket2 でバックログ付きのリスナーを作る
    pub fn listen(&self) -> std::io::Result<TcpListener> {
        let addr = self.addr();
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(self.backlog)?;
        TcpListener::from_std(socket.into())
    }

    /// バインドして受け付けを始める
    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        let listener = self.listen()?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` forever, one task per connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        info!("[{}] listening on {}", self.name, listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                let tracked = TrackedConn::open(server, peer);
                let server = &tracked.server;
                debug!("[{}] accepted {}", server.name, peer);
                if let Err(e) = conn::serve_connection(stream, server.service.as_ref(), server.header_read_timeout).await {
                    error!("[{}] connection {} failed: {}", server.name, peer, e);
                }
            });
        }
    }
}

/// Reports `New` when created and `Closed` when dropped.
///
/// 接続タスクが panic しても drop で必ず `Closed` を通知する
struct TrackedConn {
    server: Arc<Server>,
    peer: SocketAddr,
}

impl TrackedConn {
    fn open(server: Arc<Server>, peer: SocketAddr) -> TrackedConn {
        server.track_state(peer, ConnState::New);
        TrackedConn { server, peer }
    }
}

impl Drop for TrackedConn {
    fn drop(&mut self) {
        self.server.track_state(self.peer, ConnState::Closed);
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("addr", &self.addr())
            .field("backlog", &self.backlog)
            .field("header_read_timeout", &self.header_read_timeout)
            .field("tracked", &self.conn_state.is_some())
            .finish()
    }
}

pub struct ServerBuilder {
    name: String,
    bind: [u8; 4],
    port: u16,
    backlog: i32,
    header_read_timeout: Duration,
    service: BoxedService,
}

impl ServerBuilder {
    pub fn new(service: BoxedService) -> Self {
        ServerBuilder {
            name: "kurosabi".to_string(),
            bind: [0, 0, 0, 0],
            port: 8080,
            backlog: DEFAULT_TCP_BACKLOG,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            service,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn bind(mut self, bind: [u8; 4]) -> Self {
        self.bind = bind;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn header_read_timeout(mut self, duration: Duration) -> Self {
        self.header_read_timeout = duration;
        self
    }

    pub fn build(self) -> Server {
        Server {
            name: self.name,
            bind: self.bind,
            port: self.port,
            backlog: self.backlog,
            header_read_timeout: self.header_read_timeout,
            service: self.service,
            conn_state: None,
        }
    }
}
