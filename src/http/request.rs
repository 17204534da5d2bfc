use serde::de::DeserializeOwned;

use crate::{
    http::{header::Header, version::HttpVersion},
    utils::method::Method,
};

/// A parsed request as seen by interceptors and handlers.
pub struct Request {
    pub method: Method,
    /// パス部分のみ (クエリとフラグメントは除去済み)
    pub path: String,
    pub query: Option<String>,
    pub version: HttpVersion,
    pub header: Header,
    pub body: Vec<u8>,
}

impl Request {
    /// リクエストターゲットから作る
    /// "?" 以降はクエリ、"#" 以降は捨てる
    pub fn new(method: Method, target: &str) -> Request {
        let target = target.split('#').next().unwrap_or(target);
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Request {
            method,
            path: path.to_string(),
            query,
            version: HttpVersion::HTTP11,
            header: Header::new(),
            body: Vec::new(),
        }
    }

    /// クエリパラメータを取得する
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k == key).then_some(v)
        })
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Request {
        self.header.add(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Request {
        self.body = body.into();
        self
    }

    /// ボディを JSON として読む
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// HTTP/1.0 で keep-alive 指定がない、または Connection: close
    pub fn wants_close(&self) -> bool {
        match self.header.get("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => true,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => false,
            _ => self.version == HttpVersion::HTTP10,
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("version", &self.version)
            .field("body_len", &self.body.len())
            .finish()
    }
}
