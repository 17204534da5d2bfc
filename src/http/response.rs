use crate::http::{code::HttpStatusCode, header::Header, version::HttpVersion};

/// レスポンス
/// 接続層が `write_to` でバイト列にする
#[derive(Debug, Clone)]
pub struct Response {
    pub code: u16,
    pub header: Header,
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Response::new()
    }
}

impl Response {
    pub fn new() -> Response {
        Response {
            code: HttpStatusCode::OK.as_u16(),
            header: Header::new(),
            body: Vec::new(),
        }
    }

    /// 標準の 404 レスポンス
    pub fn not_found() -> Response {
        let mut res = Response::new();
        res.set_status(HttpStatusCode::NotFound);
        res.text("404 Not Found");
        res
    }

    #[inline]
    pub fn set_status(&mut self, status: HttpStatusCode) -> &mut Self {
        self.code = status.as_u16();
        self
    }

    #[inline]
    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.header.set(key, value);
        self
    }

    /// テキストレスポンス
    #[inline]
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.header.set("Content-Type", "text/plain; charset=utf-8");
        self.body = text.as_bytes().to_vec();
        self
    }

    /// JSONレスポンス (文字列をそのまま返す)
    #[inline]
    pub fn json(&mut self, json: &str) -> &mut Self {
        self.header.set("Content-Type", "application/json");
        self.body = json.as_bytes().to_vec();
        self
    }

    /// JSONレスポンス
    #[inline]
    pub fn json_value(&mut self, value: &serde_json::Value) -> &mut Self {
        self.header.set("Content-Type", "application/json");
        self.body = value.to_string().into_bytes();
        self
    }

    #[inline]
    pub fn binary(&mut self, body: &[u8]) -> &mut Self {
        self.header.set("Content-Type", "application/octet-stream");
        self.body = body.to_vec();
        self
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// HTTP/1.1 のバイト列を書き出す
    /// Content-Length は body から毎回計算する
    pub fn write_to(&self, version: HttpVersion, keep_alive: bool, buf: &mut Vec<u8>) {
        let reason = HttpStatusCode::from_u16(self.code)
            .map(|c| c.info().message)
            .unwrap_or("Unknown");
        buf.extend_from_slice(format!("{} {} {}\r\n", version.as_str(), self.code, reason).as_bytes());
        for (k, v) in self.header.iter() {
            if k.eq_ignore_ascii_case("Content-Length") || k.eq_ignore_ascii_case("Connection") {
                continue;
            }
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        let connection = if keep_alive { "keep-alive" } else { "close" };
        buf.extend_from_slice(format!("Connection: {}\r\n\r\n", connection).as_bytes());
        buf.extend_from_slice(&self.body);
    }
}
