//! HTTP/1.1 connection handling
//!
//! リクエストライン + ヘッダ + Content-Length のボディだけを扱う最小実装。
//! chunked や HTTP/2 は扱わない。

use std::time::Duration;

use log::{debug, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};

use crate::{
    error::RouterError,
    handler::Service,
    http::{HttpVersion, Request},
    utils::method::Method,
};

/// リクエストヘッダ全体の上限
pub const MAX_HEAD_BYTES: usize = 16 * 1024;
/// ボディの上限
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Serves requests on one connection until the peer closes it, asks for
/// `Connection: close`, or sends something unparseable.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    service: &dyn Service,
    header_read_timeout: Duration,
) -> Result<(), RouterError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut out = Vec::with_capacity(1024);

    loop {
        // タイムアウトはヘッダまで
        let parsed = match tokio::time::timeout(header_read_timeout, read_head(&mut reader)).await {
            Ok(parsed) => parsed,
            Err(_) => Err(RouterError::HeaderTimeout),
        };
        let parsed = match parsed {
            Ok(Some(mut req)) => read_body(&mut reader, &mut req).await.map(|()| Some(req)),
            other => other,
        };
        let req = match parsed {
            Ok(Some(req)) => req,
            Ok(None) => {
                debug!("peer closed connection");
                return Ok(());
            }
            Err(e) => {
                if let Some(http_err) = e.as_http_error() {
                    warn!("rejecting request: {}", http_err);
                    out.clear();
                    http_err.err_res().write_to(HttpVersion::HTTP11, false, &mut out);
                    // 送れなくても元のエラーを返す
                    let _ = write_all(&mut writer, &out).await;
                }
                return Err(e);
            }
        };

        let version = req.version;
        let keep_alive = !req.wants_close();
        let res = service.call(req).await;

        out.clear();
        res.write_to(version, keep_alive, &mut out);
        write_all(&mut writer, &out).await?;

        if !keep_alive {
            return Ok(());
        }
    }
}

async fn write_all<W: AsyncWrite + Unpin>(writer: &mut W, buf: &[u8]) -> std::io::Result<()> {
    writer.write_all(buf).await?;
    writer.flush().await
}

/// Reads one request. `Ok(None)` means the peer closed the connection cleanly
/// before sending anything.
pub async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Request>, RouterError> {
    let Some(mut req) = read_head(reader).await? else {
        return Ok(None);
    };
    read_body(reader, &mut req).await?;
    Ok(Some(req))
}

/// リクエストラインとヘッダだけを読む
async fn read_head<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<Request>, RouterError> {
    let mut line = Vec::new();
    let mut head_len = 0;

    let n = read_line(reader, &mut line, &mut head_len).await?;
    if n == 0 {
        return Ok(None);
    }
    let request_line = std::str::from_utf8(&line)
        .map_err(|_| RouterError::BadRequest("request line is not UTF-8".to_string()))?;

    let mut parts = request_line.split(' ');
    let (raw_method, target, raw_version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) if !t.is_empty() => (m, t, v),
        _ => return Err(RouterError::BadRequest("invalid request line format".to_string())),
    };
    let method = Method::from_str(raw_method).ok_or_else(|| RouterError::UnsupportedMethod(raw_method.to_string()))?;
    let version = HttpVersion::parse(raw_version)
        .ok_or_else(|| RouterError::BadRequest(format!("unsupported HTTP version: {}", raw_version)))?;

    let mut req = Request::new(method, target);
    req.version = version;

    loop {
        let n = read_line(reader, &mut line, &mut head_len).await?;
        if n == 0 {
            return Err(RouterError::BadRequest("unexpected EOF in headers".to_string()));
        }
        if line.is_empty() {
            break;
        }
        let header_line = std::str::from_utf8(&line)
            .map_err(|_| RouterError::BadRequest("header is not UTF-8".to_string()))?;
        let (key, value) = header_line
            .split_once(':')
            .ok_or_else(|| RouterError::BadRequest(format!("malformed header: {}", header_line)))?;
        req.header.add(key.trim(), value.trim());
    }

    Ok(Some(req))
}

/// `Content-Length` 分のボディを読む
async fn read_body<R: AsyncBufRead + Unpin>(reader: &mut R, req: &mut Request) -> Result<(), RouterError> {
    if let Some(raw_len) = req.header.get("Content-Length") {
        let len: usize = raw_len
            .parse()
            .map_err(|_| RouterError::BadRequest(format!("invalid Content-Length: {}", raw_len)))?;
        if len > MAX_BODY_BYTES {
            return Err(RouterError::BadRequest("body too large".to_string()));
        }
        let mut body = vec![0; len];
        reader.read_exact(&mut body).await?;
        req.body = body;
    }
    Ok(())
}

/// Reads one line into `line` without its CRLF / LF.
/// Returns the number of raw bytes consumed (0 on EOF).
/// Never buffers more than one byte past `MAX_HEAD_BYTES` for the whole head.
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut Vec<u8>,
    head_len: &mut usize,
) -> Result<usize, RouterError> {
    line.clear();
    let budget = (MAX_HEAD_BYTES - *head_len + 1) as u64;
    let n = (&mut *reader).take(budget).read_until(b'\n', line).await?;
    *head_len += n;
    if *head_len > MAX_HEAD_BYTES {
        return Err(RouterError::BadRequest("request head too large".to_string()));
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(n)
}
