//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one file body at `/<file_name>` (HEAD, and GET with Range → 206) and
//! an HTML landing page at `/index.html` whose `{base}` placeholder is
//! replaced with the server's base URL. Faults can be scripted per range
//! start, and every GET is counted by the start offset of its Range header.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Reply with this status and an empty body.
    Status(u16),
    /// Promise the full range length but send only half of it, then close.
    ShortBody,
    /// Send the 206 headers, then nothing for this long, then close.
    Stall(Duration),
    /// Answer 206 with the file's first bytes and a `Content-Range` starting
    /// at 0, whatever range was asked for.
    WrongRange,
}

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    pub file_name: String,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Landing page HTML; `{base}` becomes e.g. `http://127.0.0.1:1234`.
    pub page: Option<String>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            file_name: "vd240113.jdb".to_string(),
            support_ranges: true,
            page: None,
        }
    }
}

#[derive(Default)]
struct State {
    /// range start -> (fault, remaining count)
    faults: HashMap<u64, (Fault, u32)>,
    /// range start (0 for un-ranged GETs) -> GET count
    gets: HashMap<u64, u32>,
}

pub struct RangeServer {
    base: String,
    file_name: String,
    state: Arc<Mutex<State>>,
}

impl RangeServer {
    /// `http://127.0.0.1:PORT`, no trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn file_url(&self) -> String {
        format!("{}/{}", self.base, self.file_name)
    }

    pub fn page_url(&self) -> String {
        format!("{}/index.html", self.base)
    }

    /// Fail the next `count` GETs whose range starts at `start` with `fault`.
    pub fn inject(&self, start: u64, fault: Fault, count: u32) {
        self.state.lock().unwrap().faults.insert(start, (fault, count));
    }

    /// GETs seen so far for ranges starting at `start`.
    pub fn gets_for(&self, start: u64) -> u32 {
        self.state.lock().unwrap().gets.get(&start).copied().unwrap_or(0)
    }

    pub fn total_gets(&self) -> u32 {
        self.state.lock().unwrap().gets.values().sum()
    }
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Starts the server on a background thread. It runs until the process exits.
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}", port);
    let state = Arc::new(Mutex::new(State::default()));
    let server = RangeServer {
        base: base.clone(),
        file_name: opts.file_name.clone(),
        state: Arc::clone(&state),
    };
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            let state = Arc::clone(&state);
            let base = base.clone();
            thread::spawn(move || handle(stream, &body, &opts, &state, &base));
        }
    });
    server
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: &RangeServerOptions,
    state: &Mutex<State>,
    base: &str,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range) = parse_request(request);
    let head = method.eq_ignore_ascii_case("HEAD");

    if path == "/index.html" {
        match &opts.page {
            Some(page) if method.eq_ignore_ascii_case("GET") => {
                let html = page.replace("{base}", base);
                respond(&mut stream, "200 OK", "text/html", &[], html.as_bytes(), html.len());
            }
            _ => respond(&mut stream, "404 Not Found", "text/plain", &[], b"", 0),
        }
        return;
    }
    if path != format!("/{}", opts.file_name) {
        respond(&mut stream, "404 Not Found", "text/plain", &[], b"", 0);
        return;
    }

    let total = body.len() as u64;
    let accept_ranges = accept_ranges_line(opts);
    if head {
        respond_head(&mut stream, total, &accept_ranges);
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        respond(&mut stream, "405 Method Not Allowed", "text/plain", &[], b"", 0);
        return;
    }

    let start = range.map(|(s, _)| s).unwrap_or(0);
    let fault = {
        let mut st = state.lock().unwrap();
        *st.gets.entry(start).or_insert(0) += 1;
        match st.faults.get_mut(&start) {
            Some((fault, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(*fault)
            }
            _ => None,
        }
    };

    let (status, mut headers, slice) = match range {
        Some((s, end_incl)) if opts.support_ranges => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if s >= total || s > end_incl {
                (
                    "416 Range Not Satisfiable",
                    vec![format!("Content-Range: bytes */{}", total)],
                    &body[0..0],
                )
            } else {
                let slice = &body[s as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    vec![format!("Content-Range: bytes {}-{}/{}", s, end_incl, total)],
                    slice,
                )
            }
        }
        _ => ("200 OK", Vec::new(), body),
    };
    headers.extend(accept_ranges);

    match fault {
        Some(Fault::Status(code)) => {
            let status = format!("{} Injected", code);
            respond(&mut stream, &status, "text/plain", &[], b"", 0);
        }
        Some(Fault::ShortBody) => {
            let half = &slice[..slice.len() / 2];
            respond(&mut stream, status, "application/octet-stream", &headers, half, slice.len());
        }
        Some(Fault::Stall(pause)) => {
            respond(&mut stream, status, "application/octet-stream", &headers, b"", slice.len());
            thread::sleep(pause);
        }
        Some(Fault::WrongRange) => {
            let len = slice.len().min(body.len());
            let mut shifted = vec![format!(
                "Content-Range: bytes 0-{}/{}",
                len.saturating_sub(1),
                total
            )];
            shifted.extend(accept_ranges_line(opts));
            respond(
                &mut stream,
                "206 Partial Content",
                "application/octet-stream",
                &shifted,
                &body[..len],
                len,
            );
        }
        None => respond(
            &mut stream,
            status,
            "application/octet-stream",
            &headers,
            slice,
            slice.len(),
        ),
    }
}

fn accept_ranges_line(opts: &RangeServerOptions) -> Vec<String> {
    if opts.support_ranges {
        vec!["Accept-Ranges: bytes".to_string()]
    } else {
        Vec::new()
    }
}

fn respond_head(stream: &mut TcpStream, total: u64, extra: &[String]) {
    let mut head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n",
        total
    );
    for h in extra {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");
    let _ = stream.write_all(head.as_bytes());
}

/// Writes a response announcing `content_length` but sending `body` (which may be shorter).
fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    extra: &[String],
    body: &[u8],
    content_length: usize,
) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: {}\r\n",
        status, content_length, content_type
    );
    for h in extra {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Returns (method, path, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    if let Some((a, b)) = value[6..].trim().split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
