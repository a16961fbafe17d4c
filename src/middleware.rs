use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;

/// A middleware or endpoint handler. Each `call` must either produce a
/// terminal write on `res` and not call `next`, or call `next.run(...)` at
/// most once. The engine does not defend against a handler doing both or
/// calling `next` twice.
pub trait Handler: Send + Sync {
    fn call(&self, req: &mut Request, res: &mut Response, next: Next) -> anyhow::Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response, Next) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, req: &mut Request, res: &mut Response, next: Next) -> anyhow::Result<()> {
        self(req, res, next)
    }
}

/// The single catching error handler for a chain.
pub trait ErrorHandler: Send + Sync {
    fn call(&self, err: &anyhow::Error, req: &mut Request, res: &mut Response)
        -> anyhow::Result<()>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&anyhow::Error, &mut Request, &mut Response) -> anyhow::Result<()> + Send + Sync,
{
    fn call(
        &self,
        err: &anyhow::Error,
        req: &mut Request,
        res: &mut Response,
    ) -> anyhow::Result<()> {
        self(err, req, res)
    }
}

pub type HandlerEntry = Arc<dyn Handler>;
pub type ErrorHandlerEntry = Arc<dyn ErrorHandler>;

// Lets an already-boxed `HandlerEntry`/`ErrorHandlerEntry` be passed directly
// wherever a bare handler is expected (e.g. `router.get("/x", some_entry)`),
// not just freshly-wrapped closures.
impl Handler for HandlerEntry {
    fn call(&self, req: &mut Request, res: &mut Response, next: Next) -> anyhow::Result<()> {
        (**self).call(req, res, next)
    }
}

impl ErrorHandler for ErrorHandlerEntry {
    fn call(
        &self,
        err: &anyhow::Error,
        req: &mut Request,
        res: &mut Response,
    ) -> anyhow::Result<()> {
        (**self).call(err, req, res)
    }
}

/// An error that escaped the chain with no error handler configured to
/// catch it (or that was raised by the error handler itself). The acceptor
/// is responsible for it from here.
#[derive(Debug)]
pub struct ChainError(pub anyhow::Error);

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ChainError {}

/// The cooperative continuation passed to each handler. `Next` is `Copy`
/// so passing it to a handler can't move anything out from under the
/// engine; a handler that calls `run` a second time simply re-enters the
/// chain at the same point. That is undefined-but-observable behavior on
/// the handler's part, not something the engine is obligated to prevent.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [HandlerEntry],
    error_handler: Option<&'a ErrorHandlerEntry>,
    index: usize,
}

impl<'a> Next<'a> {
    pub fn new(handlers: &'a [HandlerEntry], error_handler: Option<&'a ErrorHandlerEntry>) -> Self {
        Self {
            handlers,
            error_handler,
            index: 0,
        }
    }

    /// Invokes the next handler in the chain, if any are left. Any error
    /// it returns is caught here and routed to the configured error
    /// handler exactly once; with none configured, the error propagates
    /// out as a `ChainError` for the acceptor to render a fallback
    /// response from.
    pub fn run(self, req: &mut Request, res: &mut Response) -> Result<(), ChainError> {
        if self.index >= self.handlers.len() {
            return Ok(());
        }
        let handler = &self.handlers[self.index];
        let next = Next {
            index: self.index + 1,
            ..self
        };
        match handler.call(req, res, next) {
            Ok(()) => Ok(()),
            Err(err) => match self.error_handler {
                Some(eh) => eh.call(&err, req, res).map_err(ChainError),
                None => Err(ChainError(err)),
            },
        }
    }
}

/// Drives a complete chain for one request: equivalent to constructing a
/// fresh `Next` at index 0 and running it.
pub fn run_chain(
    handlers: &[HandlerEntry],
    error_handler: Option<&ErrorHandlerEntry>,
    req: &mut Request,
    res: &mut Response,
) -> Result<(), ChainError> {
    Next::new(handlers, error_handler).run(req, res)
}

/// Converts a value into the ordered handler list a route registers.
/// Implemented for a single handler, a ready-made `Vec`, and tuples of up
/// to four handlers so `router.get("/x", (auth, log, handler))` reads the
/// way a variadic `method(pattern, handlers...)` call would in a language
/// with overloading.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<HandlerEntry>;
}

impl<H> IntoHandlers for H
where
    H: Handler + 'static,
{
    fn into_handlers(self) -> Vec<HandlerEntry> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for Vec<HandlerEntry> {
    fn into_handlers(self) -> Vec<HandlerEntry> {
        self
    }
}

macro_rules! impl_into_handlers_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Handler + 'static),+> IntoHandlers for ($($name,)+) {
            fn into_handlers(self) -> Vec<HandlerEntry> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                vec![$(Arc::new($name) as HandlerEntry),+]
            }
        }
    };
}

impl_into_handlers_for_tuple!(H1, H2);
impl_into_handlers_for_tuple!(H1, H2, H3);
impl_into_handlers_for_tuple!(H1, H2, H3, H4);
