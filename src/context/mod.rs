//! Path-parameter context
//!
//! パスパラメータのコンテキスト。リクエストごとにプールから借りて使い回す。

pub mod pool;

use smallvec::SmallVec;

pub use pool::{ContextPool, PooledContext, DEFAULT_POOL_CAPACITY};

/// Captured path parameters of one request.
///
/// Insertion order is kept so enumeration is deterministic. A context belongs to
/// exactly one in-flight request; [`Context::reset`] clears it before reuse.
///
/// キャプチャしたパラメータ (名前, 値) を挿入順で保持する
#[derive(Debug, Default, Clone)]
pub struct Context {
    params: SmallVec<[(Box<str>, String); 4]>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            params: SmallVec::new(),
        }
    }

    /// パラメータを取得する
    /// 同名が複数あれば最初のもの
    #[inline]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| v.as_str())
    }

    /// パラメータをセットする
    /// Routerのお仕事です
    #[inline]
    pub fn add(&mut self, name: &str, value: &str) {
        self.params.push((name.into(), value.to_string()));
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (&**k, v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// 全部消す
    /// 再利用前に必ず呼ぶこと
    #[inline]
    pub fn reset(&mut self) {
        self.params.clear();
    }

    /// 失敗した探索分のキャプチャを巻き戻す
    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.params.truncate(len);
    }
}
