// mod http では http 関連の定義、機能が実装されます
pub mod code;
pub mod header;
pub mod request;
pub mod response;
pub mod version;

pub use code::HttpStatusCode;
pub use header::Header;
pub use request::Request;
pub use response::Response;
pub use version::HttpVersion;
