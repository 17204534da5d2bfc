use std::sync::Arc;

use kurosabi_tst::{
    ContextPool, Router, RouterError, ServerGroup, handler_fn, json_fn,
    http::{Request, Response},
    middleware::Interceptor,
    server::ServerBuilder,
};
use log::{error, info};

/// 全レスポンスにサーバ名を付ける
struct PoweredBy;

#[async_trait::async_trait]
impl Interceptor for PoweredBy {
    async fn after(&self, _req: &Request, res: &mut Response) {
        res.set_header("X-Powered-By", "kurosabi-tst");
    }
}

fn build_router() -> Result<Router, RouterError> {
    let mut router = Router::with_pool(Arc::new(ContextPool::new(256)));

    router.get("/hello", handler_fn(|_req, _ctx| {
        let mut res = Response::new();
        res.text("Hello, World!");
        res
    }))?;

    router.get("/hello/:name", handler_fn(|_req, ctx| {
        let name = ctx.param("name").unwrap_or("World");
        let mut res = Response::new();
        res.text(&format!("Hello, {}!", name));
        res
    }))?;

    router.get("/field/:field/:value", handler_fn(|_req, ctx| {
        let field = ctx.param("field").unwrap_or("unknown");
        let value = ctx.param("value").unwrap_or("unknown");
        let mut res = Response::new();
        res.text(&format!("Field: {}, Value: {}", field, value));
        res
    }))?;

    router.get("/files/*path", handler_fn(|_req, ctx| {
        let mut res = Response::new();
        res.text(&format!("File: {}", ctx.param("path").unwrap_or("")));
        res
    }))?;

    router.post("/submit", handler_fn(|req, _ctx| {
        let mut res = Response::new();
        res.text(&format!("Received: {}", String::from_utf8_lossy(&req.body)));
        res
    }))?;

    router.post("/api/echo/:tag", json_fn(|ctx, req: Result<serde_json::Value, serde_json::Error>| {
        match req {
            Ok(body) => serde_json::json!({ "tag": ctx.param("tag"), "body": body }),
            Err(e) => serde_json::json!({ "tag": ctx.param("tag"), "error": e.to_string() }),
        }
    }))?;

    router.get("/static", handler_fn(|req, _ctx| {
        let mut res = Response::new();
        res.text(&format!("static fallback for {}", req.path));
        res
    }))?;
    router.prefix_fallback(true);

    router.not_found(handler_fn(|req, _ctx| {
        let mut res = Response::not_found();
        res.text(&format!("404 Not Found: {}", req.path));
        res
    }));

    router.intercept(PoweredBy);
    Ok(router)
}

#[tokio::main]
async fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    let router = match build_router() {
        Ok(router) => Arc::new(router),
        Err(e) => {
            error!("failed to build router: {}", e);
            return;
        }
    };

    let group = ServerGroup::new(vec![
        ServerBuilder::new(router.clone()).name("primary").port(8080).build(),
        ServerBuilder::new(router.clone()).name("secondary").port(8081).build(),
    ]);

    let mut tasks = Vec::new();
    for server in group.servers() {
        tasks.push(tokio::spawn(Arc::clone(server).run()));
    }
    if let Some(server) = group.least_used_server() {
        info!("least used instance: {}", server.name());
    }

    for task in tasks {
        match task.await {
            Ok(Err(e)) => error!("server stopped: {}", e),
            Err(e) => error!("server task panicked: {}", e),
            Ok(Ok(())) => {}
        }
    }
}
