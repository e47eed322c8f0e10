//! Minimal single-purpose HTTP/1.1 stub server for integration tests.
//!
//! Not a mock library: just enough of the protocol to serve fixed bodies
//! by exact path, since the examples pack carries no HTTP-mocking crate
//! to reuse.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

/// Bind to an ephemeral local port and serve `routes` (exact path match)
/// for the lifetime of the test process. Returns the server's base URL.
pub fn start_stub_server(routes: HashMap<&'static str, &'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let addr = listener.local_addr().expect("stub server local addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let routes = routes.clone();
            thread::spawn(move || handle_connection(stream, &routes));
        }
    });
    format!("http://{addr}")
}

fn handle_connection(stream: TcpStream, routes: &HashMap<&'static str, &'static str>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stub stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line.trim().is_empty() => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status_line, body) = match routes.get(path) {
        Some(body) => ("200 OK", *body),
        None => ("404 Not Found", "<html><body>not found</body></html>"),
    };
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.as_bytes().len(),
        body
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
