use crate::error::HttpError;
use crate::http::Method;
use crate::middleware::{run_chain, ErrorHandlerEntry};
use crate::pool::ThreadPool;
use crate::request::{parse_query_string, Request};
use crate::response::Response;
use crate::route::Router;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_POOL_SIZE: usize = 100;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns a router, an optional top-level error handler, and a worker pool.
/// Registration on the router (and `catch`) must happen before `listen`;
/// nothing here is safe to mutate concurrently with request handling.
pub struct Server {
    host: String,
    port: u16,
    router: Router,
    error_handler: Option<ErrorHandlerEntry>,
    pool_size: usize,
    read_timeout: Duration,
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            router: Router::new(),
            error_handler: None,
            pool_size: DEFAULT_POOL_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Sets the single top-level error handler. A second call replaces the
    /// first; this is a configure-once setting, not meant to change once
    /// the server is listening.
    pub fn catch<E>(mut self, error_handler: E) -> Self
    where
        E: crate::middleware::ErrorHandler + 'static,
    {
        self.error_handler = Some(Arc::new(error_handler));
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Binds, spawns the worker pool once, and accepts connections until
    /// the listener errors out. Each connection is parsed, routed, and
    /// driven through its chain on the pool, never on a freshly spawned
    /// thread per accept.
    pub fn listen(self) -> anyhow::Result<()> {
        self.listen_with(|_addr| {})
    }

    pub fn listen_with(self, on_start: impl FnOnce(SocketAddr)) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        let local_addr = listener.local_addr()?;
        on_start(local_addr);

        let pool = ThreadPool::new(self.pool_size);
        let router = Arc::new(self.router);
        let error_handler = self.error_handler.clone();
        let read_timeout = self.read_timeout;

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    log::error!("failed to accept connection: {}", err);
                    continue;
                }
            };
            let router = router.clone();
            let error_handler = error_handler.clone();
            pool.execute(move || {
                if let Err(err) = handle_connection(stream, &router, error_handler.as_ref(), read_timeout) {
                    log::error!("error handling connection: {}", err);
                }
            });
        }

        Ok(())
    }
}

fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    error_handler: Option<&ErrorHandlerEntry>,
    read_timeout: Duration,
) -> anyhow::Result<()> {
    let _ = stream.set_read_timeout(Some(read_timeout));
    let client_address = stream.peer_addr().ok();

    let mut request = match parse_request(&mut stream, client_address) {
        Ok(req) => req,
        Err(err) => {
            log::debug!("bad request: {}", err);
            let mut res = Response::new();
            res.status(400);
            res.send("400 Bad Request");
            stream.write_all(&res.to_bytes())?;
            return Ok(());
        }
    };

    let method = request.method();
    let path = request.path().to_string();

    let response_bytes = match router.lookup(&path, method) {
        Ok((handlers, params)) => {
            request.params = params;
            let mut res = Response::new();
            match run_chain(handlers, error_handler, &mut request, &mut res) {
                Ok(()) => {}
                Err(chain_error) => {
                    log::error!("unhandled error in chain for {} {}: {}", method, path, chain_error);
                    if !res.is_finished() {
                        res.status(500);
                        res.send(chain_error.to_string());
                    }
                }
            }
            log::debug!("{} {} -> {}", method, path, res.get_status());
            res.to_bytes()
        }
        Err(err) => {
            log::debug!("{} {} -> {}", method, path, err.status());
            render_error(&err)
        }
    };

    stream.write_all(&response_bytes)?;
    Ok(())
}

fn render_error(err: &HttpError) -> Vec<u8> {
    let mut res = Response::new();
    res.status(err.status());
    res.send(err.message());
    res.to_bytes()
}

fn parse_request(stream: &mut TcpStream, client_address: Option<SocketAddr>) -> anyhow::Result<Request> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let request_line = request_line.trim_end();
    if request_line.is_empty() {
        anyhow::bail!("empty request line");
    }

    let mut parts = request_line.split(' ');
    let method: Method = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing method"))?
        .try_into()?;
    let target = parts.next().unwrap_or("/");

    let (path, query) = match target.split_once('?') {
        Some((path, raw_query)) => (path.to_string(), parse_query_string(raw_query)),
        None => (target.to_string(), std::collections::HashMap::new()),
    };

    let mut request = Request::new(method, path);
    request.query = query;
    request.client_address = client_address;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            request.headers.insert(key.trim(), value.trim());
        }
    }

    request.raw_body = read_body(&mut reader, &request)?;

    Ok(request)
}

fn read_body(reader: &mut BufReader<&mut TcpStream>, request: &Request) -> anyhow::Result<Vec<u8>> {
    if let Some(len) = request
        .get_header("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        return Ok(body);
    }

    // No Content-Length: opportunistically drain whatever is already
    // available, bounded by the socket's read timeout rather than
    // blocking forever for a body that may never come.
    let mut body = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::HandlerEntry;
    use std::io::{Read as _, Write as _};
    use std::net::TcpStream as ClientStream;
    use std::sync::mpsc;

    fn spawn_test_server(router: Router) -> SocketAddr {
        let (tx, rx) = mpsc::channel();
        let server = Server::new("127.0.0.1", 0).router(router).pool_size(4);
        std::thread::spawn(move || {
            server
                .listen_with(move |addr| {
                    let _ = tx.send(addr);
                })
                .unwrap();
        });
        rx.recv().unwrap()
    }

    fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = ClientStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
            path
        )
        .unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        response
    }

    #[test]
    fn s1_not_found_and_method_not_allowed_over_the_wire() {
        let ok: HandlerEntry = Arc::new(
            |_req: &mut Request, res: &mut Response, _next: crate::middleware::Next| {
                res.send("ok");
                Ok(())
            },
        );
        let router = Router::new()
            .get("/products", ok.clone())
            .get("/products/:id", ok);

        let addr = spawn_test_server(router);

        let hit = http_get(addr, "/products/123");
        assert!(hit.starts_with("HTTP/1.1 200"));

        let missing = http_get(addr, "/unknown");
        assert!(missing.starts_with("HTTP/1.1 404"));
        assert!(missing.contains("Cannot GET /unknown"));
    }

    #[test]
    fn s4_handler_that_writes_without_calling_next_short_circuits() {
        let write_only: HandlerEntry = Arc::new(
            |_req: &mut Request, res: &mut Response, _next: crate::middleware::Next| {
                res.send("ok");
                Ok(())
            },
        );
        let router = Router::new().get("/", write_only);
        let addr = spawn_test_server(router);

        let response = http_get(addr, "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));
    }
}
