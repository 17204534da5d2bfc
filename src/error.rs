use crate::http::{HttpStatusCode, Response};

/// Errors surfaced by registration and by the connection layer.
///
/// Matching never fails with an error: a miss is answered by the not-found handler.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("route pattern must not be empty")]
    EmptyPattern,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("timed out reading request head")]
    HeaderTimeout,
}

impl RouterError {
    /// 接続層のエラーをクライアントに返すHTTPエラーに変換する
    /// IOエラーは返しようがないので None
    pub fn as_http_error(&self) -> Option<HttpError> {
        match self {
            RouterError::EmptyPattern => Some(HttpError::InternalServerError(self.to_string())),
            RouterError::Io(_) => None,
            RouterError::BadRequest(message) => Some(HttpError::BadRequest(message.clone())),
            RouterError::UnsupportedMethod(_) => Some(HttpError::MethodNotAllowed),
            RouterError::HeaderTimeout => Some(HttpError::RequestTimeout),
        }
    }
}

pub enum HttpError {
    BadRequest(String),
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    InternalServerError(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(message) => write!(f, "Bad Request: {}", message),
            HttpError::NotFound => write!(f, "Not Found"),
            HttpError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            HttpError::RequestTimeout => write!(f, "Request Timeout"),
            HttpError::InternalServerError(message) => write!(f, "Internal Server Error: {}", message),
        }
    }
}

impl std::fmt::Debug for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self, self.status().as_u16())
    }
}

impl HttpError {
    pub fn status(&self) -> HttpStatusCode {
        match self {
            HttpError::BadRequest(_) => HttpStatusCode::BadRequest,
            HttpError::NotFound => HttpStatusCode::NotFound,
            HttpError::MethodNotAllowed => HttpStatusCode::MethodNotAllowed,
            HttpError::RequestTimeout => HttpStatusCode::RequestTimeout,
            HttpError::InternalServerError(_) => HttpStatusCode::InternalServerError,
        }
    }

    /// エラーレスポンスを作る
    pub fn err_res(&self) -> Response {
        let mut res = Response::new();
        res.set_status(self.status());
        res.text(&self.to_string());
        res
    }
}
