use std::sync::Arc;

use crate::http::{Request, Response};

/// A request interceptor wrapped around dispatch.
///
/// Interceptors observe and adjust the request before routing and the response
/// after the handler ran. They cannot skip or repeat the handler.
#[async_trait::async_trait]
pub trait Interceptor: Send + Sync + 'static {
    /// リクエスト受信後処理（例: 認証ヘッダの正規化、ロギング等）
    #[allow(unused_variables)]
    async fn before(&self, req: &mut Request) {}
    /// レスポンス前処理（例: レスポンスヘッダー追加等）
    #[allow(unused_variables)]
    async fn after(&self, req: &Request, res: &mut Response) {}
}

/// Ordered interceptors: `before` runs first-to-last, `after` last-to-first.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Chain {
        Chain { interceptors }
    }

    pub fn push<I: Interceptor>(&mut self, interceptor: I) {
        self.interceptors.push(Arc::new(interceptor));
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub async fn before_all(&self, req: &mut Request) {
        for i in &self.interceptors {
            i.before(req).await;
        }
    }

    pub async fn after_all(&self, req: &Request, res: &mut Response) {
        for i in self.interceptors.iter().rev() {
            i.after(req, res).await;
        }
    }
}
