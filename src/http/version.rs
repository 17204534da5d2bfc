#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    HTTP10,
    HTTP11,
}

impl HttpVersion {
    #[inline(always)]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::HTTP10 => "HTTP/1.0",
            HttpVersion::HTTP11 => "HTTP/1.1",
        }
    }

    #[inline]
    pub fn parse(raw: &str) -> Option<HttpVersion> {
        match raw {
            "HTTP/1.0" => Some(HttpVersion::HTTP10),
            "HTTP/1.1" => Some(HttpVersion::HTTP11),
            _ => None,
        }
    }
}
