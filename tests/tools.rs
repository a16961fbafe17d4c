use rhttp::Server;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc;
use std::time::Duration;

/// Spawns `server` on an ephemeral port and blocks until it reports the
/// address it bound to.
pub fn spawn(server: Server) -> SocketAddr {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        server
            .listen_with(move |addr| {
                let _ = tx.send(addr);
            })
            .expect("server should accept connections");
    });
    rx.recv_timeout(Duration::from_secs(2))
        .expect("server should report its bound address")
}

pub struct RawResponse {
    pub status_line: String,
    pub body: String,
}

fn send(addr: SocketAddr, request: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut raw = String::new();
    let _ = stream.read_to_string(&mut raw);

    let mut parts = raw.splitn(2, "\r\n\r\n");
    let head = parts.next().unwrap_or_default();
    let body = parts.next().unwrap_or_default().to_string();
    let status_line = head.lines().next().unwrap_or_default().to_string();

    RawResponse { status_line, body }
}

pub fn get(addr: SocketAddr, path: &str) -> RawResponse {
    send(
        addr,
        &format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
            path
        ),
    )
}

pub fn post(addr: SocketAddr, path: &str) -> RawResponse {
    send(
        addr,
        &format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
            path
        ),
    )
}
