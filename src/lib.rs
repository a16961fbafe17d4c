mod error;
mod http;
mod middleware;
mod path;
mod pool;
mod request;
mod response;
mod route;
mod server;
pub mod testing;

pub use error::HttpError;
pub use http::Method;
pub use middleware::{
    ChainError, ErrorHandler, ErrorHandlerEntry, Handler, HandlerEntry, IntoHandlers, Next,
    run_chain,
};
pub use request::{parse_query_string, HeaderMap, Request};
pub use response::Response;
pub use route::Router;
pub use server::Server;
