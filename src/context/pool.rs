use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crossbeam_queue::ArrayQueue;
use log::trace;

use super::Context;

pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Lock-free pool of reusable [`Context`]s.
///
/// `acquire` hands out a guard that goes back to the pool when dropped, so the
/// context is released on every exit path of request handling, unwinding included.
/// Contexts are reset on both acquire and release.
///
/// コンテキストのプール。空なら新しく作り、満杯なら捨てる。
pub struct ContextPool {
    queue: ArrayQueue<Context>,
}

impl ContextPool {
    /// `capacity` はプールが保持する最大数 (0 は 1 に丸める)
    pub fn new(capacity: usize) -> ContextPool {
        ContextPool {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    pub fn with_default_capacity() -> ContextPool {
        ContextPool::new(DEFAULT_POOL_CAPACITY)
    }

    /// プールから取り出す
    pub fn acquire(self: &Arc<Self>) -> PooledContext {
        let mut ctx = match self.queue.pop() {
            Some(ctx) => ctx,
            None => {
                trace!("context pool empty, allocating");
                Context::new()
            }
        };
        ctx.reset();
        PooledContext {
            ctx: Some(ctx),
            pool: Arc::clone(self),
        }
    }

    /// プールへ返す
    /// 満杯ならそのまま drop する
    pub fn release(&self, mut ctx: Context) {
        ctx.reset();
        if self.queue.push(ctx).is_err() {
            trace!("context pool full, dropping context");
        }
    }

    /// 今プールで待機している数
    pub fn idle(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        ContextPool::with_default_capacity()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// A [`Context`] on loan from a [`ContextPool`].
pub struct PooledContext {
    // drop で取り出すので Option
    ctx: Option<Context>,
    pool: Arc<ContextPool>,
}

impl Deref for PooledContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        // Some であるのは drop まで保証される
        self.ctx.as_ref().unwrap_or_else(|| unreachable!("context taken before drop"))
    }
}

impl DerefMut for PooledContext {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_mut().unwrap_or_else(|| unreachable!("context taken before drop"))
    }
}

impl Drop for PooledContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}
