//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths (directory listings and the files they link
//! to) with GET. Unknown paths get 404, other methods 405.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingServerOptions {
    /// Delay before every response (simulates a slow mirror).
    pub delay: Option<Duration>,
}

/// Starts a server in a background thread serving `routes` (path -> body).
/// Returns the base URL (e.g. "http://127.0.0.1:12345/"). The server runs
/// until the process exits.
pub fn start(routes: Vec<(&str, Vec<u8>)>) -> String {
    start_with_options(routes, ListingServerOptions::default())
}

pub fn start_with_options(routes: Vec<(&str, Vec<u8>)>, opts: ListingServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, body)| (path.to_string(), body))
            .collect(),
    );
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

/// Apache-style index page linking `names` relative to the listed directory.
pub fn index_page(dir: &str, names: &[&str]) -> Vec<u8> {
    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><title>Index of {dir}</title></head><body>\n<h1>Index of {dir}</h1>\n<a href=\"../\">Parent Directory</a>\n"
    );
    for name in names {
        html.push_str(&format!("<a href=\"{name}\">{name}</a>\n"));
    }
    html.push_str("</body></html>\n");
    html.into_bytes()
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Vec<u8>>, opts: ListingServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path) = parse_request_line(request);
    if let Some(delay) = opts.delay {
        thread::sleep(delay);
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    let path = path.split('?').next().unwrap_or(path);
    match routes.get(path) {
        Some(body) => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(body);
        }
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    }
}

/// Returns (method, path) from the request line.
fn parse_request_line(request: &str) -> (&str, &str) {
    let line = request.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");
    (method, path)
}
