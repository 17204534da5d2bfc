//! Ternary search tree router (pooled Context + interceptor chain)
//!
//! 3分探索木ルータ（コンテキストプール + インターセプタチェーン）

pub mod pattern;
pub mod tree;

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    context::{Context, ContextPool},
    error::RouterError,
    handler::{BoxedHandler, Handler, NotFoundHandler, Service},
    http::{Request, Response},
    middleware::{Chain, Interceptor},
    utils::method::Method,
};

pub use pattern::Pattern;
pub use tree::Tree;

/// Routes requests by method and path through a [`Tree`].
///
/// Routes are registered through `&mut self` during startup; afterwards the router
/// is shared (usually as `Arc<Router>`) and only read.
///
/// メソッドとパスでハンドラを選ぶルータ。
/// 登録は起動時に `&mut self` で行い、その後は共有して読むだけ。
pub struct Router {
    tree: Tree<BoxedHandler>,
    chain: Chain,
    not_found: BoxedHandler,
    pool: Arc<ContextPool>,
    prefix_fallback: bool,
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

impl Router {
    pub fn new() -> Router {
        Router::with_pool(Arc::new(ContextPool::with_default_capacity()))
    }

    /// コンテキストプールを指定して初期化する
    pub fn with_pool(pool: Arc<ContextPool>) -> Router {
        Router {
            tree: Tree::new(),
            chain: Chain::default(),
            not_found: Arc::new(NotFoundHandler),
            pool,
            prefix_fallback: false,
        }
    }

    /// Registers `handler` for (`method`, `pattern`).
    ///
    /// Re-registering the same pair replaces the previous handler.
    /// 同じ (メソッド, パターン) は後勝ち
    pub fn handle<H: Handler>(&mut self, method: Method, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle_shared(method, pattern, Arc::new(handler))
    }

    /// Registers an already shared handler, e.g. one handler under several methods.
    pub fn handle_shared(&mut self, method: Method, pattern: &str, handler: BoxedHandler) -> Result<(), RouterError> {
        let pattern = Pattern::new(pattern)?;
        if self.tree.insert(method, &pattern, handler).is_some() {
            debug!("route replaced: {} {}", method, pattern);
        } else {
            debug!("route registered: {} {}", method, pattern);
        }
        self.tree.log_traversal();
        Ok(())
    }

    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::GET, pattern, handler)
    }

    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::POST, pattern, handler)
    }

    pub fn put<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::PUT, pattern, handler)
    }

    pub fn patch<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::PATCH, pattern, handler)
    }

    pub fn delete<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::DELETE, pattern, handler)
    }

    pub fn options<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::OPTIONS, pattern, handler)
    }

    pub fn head<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::HEAD, pattern, handler)
    }

    pub fn range<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<(), RouterError> {
        self.handle(Method::RANGE, pattern, handler)
    }

    /// 404（NotFound）時のハンドラを登録します。
    pub fn not_found<H: Handler>(&mut self, handler: H) {
        self.not_found = Arc::new(handler);
    }

    /// Appends an interceptor to the chain wrapped around dispatch.
    pub fn intercept<I: Interceptor>(&mut self, interceptor: I) {
        self.chain.push(interceptor);
    }

    /// チェーンを丸ごと差し替える
    pub fn use_chain(&mut self, chain: Chain) {
        self.chain = chain;
    }

    /// When set, a miss falls back to the longest registered literal prefix of the
    /// path before the not-found handler is used.
    pub fn prefix_fallback(&mut self, enabled: bool) {
        self.prefix_fallback = enabled;
    }

    /// Exact/parametric lookup; captures go into `ctx`.
    pub fn lookup(&self, method: Method, path: &str, ctx: &mut Context) -> Option<&BoxedHandler> {
        self.tree.find(method, path, ctx)
    }

    /// Longest-literal-prefix lookup; captures go into `ctx`.
    pub fn lookup_prefix(&self, method: Method, path: &str, ctx: &mut Context) -> Option<&BoxedHandler> {
        self.tree.longest_prefix(method, path, ctx)
    }

    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    pub fn tree(&self) -> &Tree<BoxedHandler> {
        &self.tree
    }

    /// Dispatches one request.
    ///
    /// A pooled context is held for the whole request and goes back to the pool
    /// when this future completes, panics or is dropped.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let mut ctx = self.pool.acquire();

        self.chain.before_all(&mut req).await;

        let handler = match self.tree.find(req.method, &req.path, &mut ctx) {
            Some(h) => h,
            None if self.prefix_fallback => self
                .tree
                .longest_prefix(req.method, &req.path, &mut ctx)
                .unwrap_or(&self.not_found),
            None => &self.not_found,
        };

        let mut res = handler.handle(&req, &ctx).await;

        self.chain.after_all(&req, &mut res).await;

        // ログ出力（レスポンスコードに応じてレベルを変える）
        if res.code >= 500 {
            error!("{} {} - {}", req.method, req.path, res.code);
        } else if res.code >= 400 {
            warn!("{} {} - {}", req.method, req.path, res.code);
        } else {
            info!("{} {} - {}", req.method, req.path, res.code);
        }
        res
    }
}

#[async_trait::async_trait]
impl Service for Router {
    async fn call(&self, req: Request) -> Response {
        self.dispatch(req).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("tree", &self.tree)
            .field("interceptors", &self.chain.len())
            .field("pool", &self.pool)
            .field("prefix_fallback", &self.prefix_fallback)
            .finish()
    }
}
