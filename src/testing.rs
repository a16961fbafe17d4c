//! In-process test harness: drives a `Router` directly through `lookup` and
//! `run_chain`, without a socket.

use crate::http::Method;
use crate::middleware::{run_chain, ErrorHandlerEntry};
use crate::request::Request;
use crate::response::Response;
use crate::route::Router;

pub struct Client<'a> {
    router: &'a Router,
    error_handler: Option<&'a ErrorHandlerEntry>,
}

impl<'a> Client<'a> {
    pub fn new(router: &'a Router) -> Self {
        Self {
            router,
            error_handler: None,
        }
    }

    pub fn with_error_handler(mut self, handler: &'a ErrorHandlerEntry) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Resolves `method path` against the router and drives the matched
    /// chain to completion, returning the response it produced. A
    /// `NotFound`/`MethodNotAllowed` is rendered the same way the acceptor
    /// renders it: as a plain-text response carrying the error's status,
    /// bypassing any configured error handler.
    pub fn request(&self, method: Method, path: &str, mut request: Request) -> Response {
        match self.router.lookup(path, method) {
            Ok((handlers, params)) => {
                request.params = params;
                let mut res = Response::new();
                if let Err(err) = run_chain(handlers, self.error_handler, &mut request, &mut res) {
                    if !res.is_finished() {
                        res.status(500);
                        res.send(err.to_string());
                    }
                }
                res
            }
            Err(err) => {
                let mut res = Response::new();
                res.status(err.status());
                res.send(err.message());
                res
            }
        }
    }

    pub fn get(&self, path: &str) -> Response {
        self.request(Method::Get, path, Request::new(Method::Get, path))
    }

    pub fn post(&self, path: &str, body: impl Into<Vec<u8>>) -> Response {
        let mut req = Request::new(Method::Post, path);
        req.raw_body = body.into();
        self.request(Method::Post, path, req)
    }
}
