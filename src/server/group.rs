//! Least-connections server group
//!
//! 各インスタンスの接続数をアトミックに数え、一番少ないもののサービスを返す。
//! ヘルスチェックや重み付けはしない。

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::{debug, error};
use parking_lot::Mutex;

use crate::{
    handler::BoxedService,
    server::{ConnState, Server},
};

/// Open-connection counter of one server instance.
#[derive(Debug, Default)]
pub struct ConnCounter {
    open: AtomicUsize,
}

impl ConnCounter {
    pub fn new() -> ConnCounter {
        ConnCounter::default()
    }

    #[inline]
    pub fn open_conns(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    /// Applies one lifecycle transition.
    ///
    /// A decrement below zero means a terminal state arrived without a matching
    /// opening state; it is refused and logged.
    pub fn track(&self, state: ConnState) {
        if state.is_opening() {
            self.open.fetch_add(1, Ordering::AcqRel);
        } else if state.is_terminal()
            && self
                .open
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_err()
        {
            error!("connection counter underflow on {:?}: lifecycle callbacks out of order", state);
        }
    }
}

struct Tracked {
    counter: Arc<ConnCounter>,
    server: Arc<Server>,
}

/// A fixed set of server instances with least-connections selection.
pub struct ServerGroup {
    // ソートはロックの中でだけ行う
    servers: Mutex<Vec<Tracked>>,
    // 登録順のまま (外部リスナー配線用)
    wired: Vec<Arc<Server>>,
}

impl ServerGroup {
    /// Wraps `servers`, attaching a counting hook to each.
    pub fn new(servers: Vec<Server>) -> ServerGroup {
        let mut tracked = Vec::with_capacity(servers.len());
        for mut server in servers {
            let counter = Arc::new(ConnCounter::new());
            let hook_counter = Arc::clone(&counter);
            let name = server.name().to_string();
            server.set_conn_state_hook(Arc::new(move |peer: SocketAddr, state: ConnState| {
                debug!("[{}] {} -> {:?}", name, peer, state);
                hook_counter.track(state);
            }));
            tracked.push(Tracked {
                counter,
                server: Arc::new(server),
            });
        }
        let wired = tracked.iter().map(|t| Arc::clone(&t.server)).collect();
        ServerGroup {
            servers: Mutex::new(tracked),
            wired,
        }
    }

    /// The wrapped instances in construction order, for listener wiring.
    pub fn servers(&self) -> &[Arc<Server>] {
        &self.wired
    }

    pub fn len(&self) -> usize {
        self.wired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wired.is_empty()
    }

    /// Returns the service of the instance with the fewest open connections.
    ///
    /// The group is stably re-sorted under the lock, so ties keep the current order.
    pub fn least_used(&self) -> Option<BoxedService> {
        self.least_used_server().map(|s| Arc::clone(s.service()))
    }

    /// `least_used` と同じ選び方でサーバ自体を返す
    pub fn least_used_server(&self) -> Option<Arc<Server>> {
        let mut servers = self.servers.lock();
        // 比較中に値が動かないよう、キーは一度だけ読む
        servers.sort_by_cached_key(|t| t.counter.open_conns());
        servers.first().map(|t| Arc::clone(&t.server))
    }

    /// 各インスタンスの (名前, 接続数) を構築順で
    pub fn open_connections(&self) -> Vec<(String, usize)> {
        let servers = self.servers.lock();
        self.wired
            .iter()
            .map(|w| {
                let open = servers
                    .iter()
                    .find(|t| Arc::ptr_eq(&t.server, w))
                    .map_or(0, |t| t.counter.open_conns());
                (w.name().to_string(), open)
            })
            .collect()
    }
}

impl std::fmt::Debug for ServerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerGroup")
            .field("open_connections", &self.open_connections())
            .finish()
    }
}
