/// Methods the router can register handlers for.
///
/// Each variant carries a distinct single-bit flag, so a terminal node can key
/// its handler table per verb without ambiguity.
///
/// ルータが扱うHTTPメソッドの閉じた集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Method {
    GET = 1 << 0,
    POST = 1 << 1,
    PUT = 1 << 2,
    PATCH = 1 << 3,
    OPTIONS = 1 << 4,
    HEAD = 1 << 5,
    /// 非標準だけど古いクライアントが送ってくる
    RANGE = 1 << 6,
    DELETE = 1 << 7,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::OPTIONS,
        Method::HEAD,
        Method::RANGE,
        Method::DELETE,
    ];

    /// 文字列からMethodを取得する
    /// 未知のメソッドは None
    #[inline]
    pub fn from_str(method: &str) -> Option<Method> {
        match method {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "OPTIONS" => Some(Method::OPTIONS),
            "HEAD" => Some(Method::HEAD),
            "RANGE" => Some(Method::RANGE),
            "DELETE" => Some(Method::DELETE),
            _ => None,
        }
    }

    #[inline]
    pub fn to_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::OPTIONS => "OPTIONS",
            Method::HEAD => "HEAD",
            Method::RANGE => "RANGE",
            Method::DELETE => "DELETE",
        }
    }

    #[inline]
    pub fn flag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Method {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct_single_bits() {
        let mut seen = 0u8;
        for method in Method::ALL {
            let flag = method.flag();
            assert_eq!(flag.count_ones(), 1, "{}", method);
            assert_eq!(seen & flag, 0, "{}", method);
            seen |= flag;
            assert_eq!(Method::from_str(method.to_str()), Some(method));
        }
        assert_eq!(seen, u8::MAX);
        assert_eq!(Method::from_str("get"), None);
    }
}
