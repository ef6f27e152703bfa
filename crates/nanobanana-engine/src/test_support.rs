//! One-shot HTTP stub for adapter tests.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Default)]
pub(crate) struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

pub(crate) struct StubServer {
    pub base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl StubServer {
    pub fn finish(self) -> CapturedRequest {
        self.handle.join().expect("stub server thread panicked")
    }
}

/// Accepts one connection, records the request and answers with `status` / `body`.
pub(crate) fn serve_once(status: u16, body: &str) -> io::Result<StubServer> {
    let body = body.to_string();
    spawn(move |mut stream, captured| {
        let response = format!(
            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
        Ok(captured)
    })
}

/// Accepts one connection, reads the request and never answers within `hold`.
pub(crate) fn serve_silently(hold: Duration) -> io::Result<StubServer> {
    spawn(move |_stream, captured| {
        thread::sleep(hold);
        Ok(captured)
    })
}

fn spawn<F>(respond: F) -> io::Result<StubServer>
where
    F: FnOnce(TcpStream, CapturedRequest) -> io::Result<CapturedRequest> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("stub accept failed");
        let captured = read_request(&stream).expect("stub read failed");
        respond(stream, captured).expect("stub respond failed")
    });
    Ok(StubServer { base_url, handle })
}

fn read_request(stream: &TcpStream) -> io::Result<CapturedRequest> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut captured = CapturedRequest::default();

    let mut line = String::new();
    reader.read_line(&mut line)?;
    captured.request_line = line.trim_end().to_string();

    let mut content_length = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let value = value.trim().to_string();
            if key.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            captured.headers.push((key.trim().to_string(), value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    captured.body = String::from_utf8_lossy(&body).into_owned();
    Ok(captured)
}
