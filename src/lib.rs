pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;
pub mod utils;

pub use crate::context::{Context, ContextPool};
pub use crate::error::{HttpError, RouterError};
pub use crate::handler::{Handler, Service, handler_fn, json_fn};
pub use crate::http::{Request, Response};
pub use crate::router::Router;
pub use crate::server::{Server, ServerGroup};
pub use crate::utils::method::Method;
pub use tokio::main as tokio_main;
