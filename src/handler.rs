//! Handler capabilities
//!
//! `Handler` はルートに登録する処理、`Service` はサーバが1リクエストごとに呼ぶ入口。
//! `Router` は `Service` を実装する。

use std::{marker::PhantomData, sync::Arc};

use log::error;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    context::Context,
    error::HttpError,
    http::{Request, Response},
};

/// Processes one routed request and produces its response.
///
/// `ctx` holds the path parameters captured while matching.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: &Request, ctx: &Context) -> Response;
}

/// Shared, type-erased handler as stored in the routing tree.
pub type BoxedHandler = Arc<dyn Handler>;

/// Entry point a server instance hands every parsed request to.
#[async_trait::async_trait]
pub trait Service: Send + Sync + 'static {
    async fn call(&self, req: Request) -> Response;
}

pub type BoxedService = Arc<dyn Service>;

/// Adapts a plain closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

/// クロージャをハンドラにする
///
/// ```
/// use kurosabi_tst::handler::handler_fn;
/// use kurosabi_tst::http::Response;
///
/// let hello = handler_fn(|_req, ctx| {
///     let mut res = Response::new();
///     res.text(&format!("hello {}", ctx.param("name").unwrap_or("guest")));
///     res
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Request, &Context) -> Response + Send + Sync + 'static,
{
    FnHandler { f }
}

#[async_trait::async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&Request, &Context) -> Response + Send + Sync + 'static,
{
    async fn handle(&self, req: &Request, ctx: &Context) -> Response {
        (self.f)(req, ctx)
    }
}

/// JSON API handler: the body is parsed as `Rqs`, the closure's return value
/// is serialized back as the JSON response.
pub struct JsonHandler<F, Rqs> {
    f: F,
    _rqs: PhantomData<fn() -> Rqs>,
}

/// JSON API をハンドラにする
/// パースに失敗しても呼ばれるので、`Err` をどう返すかはクロージャが決める
pub fn json_fn<F, Rqs, Rss>(f: F) -> JsonHandler<F, Rqs>
where
    F: Fn(&Context, Result<Rqs, serde_json::Error>) -> Rss + Send + Sync + 'static,
    Rqs: DeserializeOwned + Send + 'static,
    Rss: Serialize + Send,
{
    JsonHandler { f, _rqs: PhantomData }
}

#[async_trait::async_trait]
impl<F, Rqs, Rss> Handler for JsonHandler<F, Rqs>
where
    F: Fn(&Context, Result<Rqs, serde_json::Error>) -> Rss + Send + Sync + 'static,
    Rqs: DeserializeOwned + Send + 'static,
    Rss: Serialize + Send,
{
    async fn handle(&self, req: &Request, ctx: &Context) -> Response {
        let rss = (self.f)(ctx, req.body_json::<Rqs>());
        match serde_json::to_value(&rss) {
            Ok(value) => {
                let mut res = Response::new();
                res.json_value(&value);
                res
            }
            Err(e) => {
                error!("failed to serialize JSON response for {}: {}", req.path, e);
                HttpError::InternalServerError(e.to_string()).err_res()
            }
        }
    }
}

/// Default fallback: plain `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundHandler;

#[async_trait::async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, _req: &Request, _ctx: &Context) -> Response {
        Response::not_found()
    }
}
