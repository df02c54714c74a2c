//! A reference HTTP/1.1 listener for a [`Bridge`].
//!
//! One thread accepts connections and each connection gets its own thread.
//! Every connection carries exactly one request: the body is read in full
//! (`Content-Length` is required), dispatched, answered and the connection is
//! closed. There is no streaming and no keep-alive.
//!
//! | Request          | Response                                        |
//! |------------------|-------------------------------------------------|
//! | `POST /mcp`      | MCP JSON-RPC reply, or `202` for notifications  |
//! | `GET /mcp`       | `405`, there is no server-sent event stream     |
//! | `POST` elsewhere | envelope reply from [`Bridge::handle`]          |
//!
//! ```no_run
//! use toolbridge::{Bridge, BridgeConfig};
//! use toolbridge::http::Server;
//! use toolbridge::registry::Registry;
//!
//! let bridge = Bridge::new(Registry::builder().build(), BridgeConfig::default()).unwrap();
//! let server = Server::bind("127.0.0.1:8000", bridge).unwrap();
//! println!("listening on {}", server.local_addr());
//! std::thread::park();
//! ```

use crate::bridge::{Bridge, Stage};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

/// Path served by the MCP endpoint.
pub const MCP_PATH: &str = "/mcp";

const READ_TIMEOUT: Duration = Duration::from_secs(30);
// request line plus all headers
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// Why a request could not be read.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("malformed request line")]
    BadRequestLine,
    #[error("malformed header")]
    BadHeader,
    #[error("request head too large")]
    HeadTooLarge,
    #[error("Content-Length header required")]
    LengthRequired,
    #[error("body of {length} bytes exceeds the limit of {limit}")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("connection closed before the request was complete")]
    Truncated,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HttpError {
    /// The status line to answer with, if the connection is still usable.
    fn status(&self) -> Option<&'static str> {
        match self {
            HttpError::BadRequestLine | HttpError::BadHeader => Some("400 Bad Request"),
            HttpError::HeadTooLarge => Some("431 Request Header Fields Too Large"),
            HttpError::LengthRequired => Some("411 Length Required"),
            HttpError::BodyTooLarge { .. } => Some("413 Payload Too Large"),
            HttpError::Truncated | HttpError::Io(_) => None,
        }
    }
}

fn read_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<String, HttpError> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(*budget as u64 + 1)
        .read_until(b'\n', &mut line)?;
    if read == 0 {
        return Err(HttpError::Truncated);
    }
    if read > *budget {
        return Err(HttpError::HeadTooLarge);
    }
    *budget -= read;
    if line.last() != Some(&b'\n') {
        return Err(HttpError::Truncated);
    }
    let line = String::from_utf8(line).map_err(|_| HttpError::BadHeader)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads one request from `reader`.
///
/// ```
/// use toolbridge::http::{HttpError, read_request};
///
/// let raw = b"POST /mcp HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
/// let request = read_request(&mut &raw[..], 1024).unwrap();
/// assert_eq!(request.path, "/mcp");
/// assert_eq!(request.body, b"{}");
///
/// let raw = b"POST / HTTP/1.1\r\n\r\n";
/// assert!(matches!(read_request(&mut &raw[..], 1024), Err(HttpError::LengthRequired)));
/// ```
///
/// # Errors
///
/// [`HttpError`] for anything that is not a complete, well-formed request
/// with a body of at most `max_body` bytes.
pub fn read_request<R: BufRead>(reader: &mut R, max_body: usize) -> Result<HttpRequest, HttpError> {
    let mut budget = MAX_HEAD_BYTES;
    let request_line = read_line(reader, &mut budget)?;
    let mut parts = request_line.split(' ');
    let (method, path) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version), None)
            if !method.is_empty() && path.starts_with('/') && version.starts_with("HTTP/1.") =>
        {
            (method.to_string(), path.to_string())
        }
        _ => return Err(HttpError::BadRequestLine),
    };

    let mut content_length = None;
    loop {
        let line = read_line(reader, &mut budget)?;
        if line.is_empty() {
            break;
        }
        let (key, value) = line.split_once(':').ok_or(HttpError::BadHeader)?;
        if key.trim().eq_ignore_ascii_case("Content-Length") {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|_| HttpError::BadHeader)?;
            // repeats must agree, or the body boundary is ambiguous
            if content_length.is_some_and(|seen| seen != length) {
                return Err(HttpError::BadHeader);
            }
            content_length = Some(length);
        }
    }

    let body = match (method.as_str(), content_length) {
        (_, Some(length)) if length > max_body => {
            return Err(HttpError::BodyTooLarge {
                length,
                limit: max_body,
            });
        }
        (_, Some(length)) => {
            let mut body = vec![0; length];
            reader.read_exact(&mut body).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => HttpError::Truncated,
                _ => HttpError::Io(e),
            })?;
            body
        }
        ("POST", None) => return Err(HttpError::LengthRequired),
        (_, None) => Vec::new(),
    };

    Ok(HttpRequest { method, path, body })
}

/// A response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn json(body: Vec<u8>) -> Self {
        HttpResponse {
            status: "200 OK",
            body,
        }
    }

    fn empty(status: &'static str) -> Self {
        HttpResponse {
            status,
            body: Vec::new(),
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.body.len()
        )?;
        if self.status.starts_with("405") {
            writer.write_all(b"Allow: POST\r\n")?;
        }
        writer.write_all(b"\r\n")?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

/// Routes a request to the bridge.
pub fn respond(bridge: &Bridge, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", MCP_PATH) => match bridge.handle_mcp(&request.body) {
            Some(body) => HttpResponse::json(body),
            None => HttpResponse::empty("202 Accepted"),
        },
        (_, MCP_PATH) => HttpResponse::empty("405 Method Not Allowed"),
        ("POST", _) => HttpResponse::json(bridge.handle(&request.body)),
        _ => HttpResponse::empty("405 Method Not Allowed"),
    }
}

/// A running listener.
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
}

impl Server {
    /// Binds `addr` and starts accepting connections on a background thread.
    ///
    /// # Errors
    ///
    /// Any error from binding the socket or spawning the accept thread.
    pub fn bind<A: ToSocketAddrs>(addr: A, bridge: Bridge) -> io::Result<Server> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        logwise::info_sync!("listening on {addr}", addr = local_addr.to_string());
        thread::Builder::new()
            .name("toolbridge-accept".to_string())
            .spawn(move || {
                for stream in listener.incoming() {
                    match stream {
                        Ok(stream) => on_accept(stream, bridge.clone()),
                        Err(e) => {
                            logwise::warn_sync!("accept failed: {error}", error = e.to_string())
                        }
                    }
                }
            })?;
        Ok(Server { local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn on_accept(stream: TcpStream, bridge: Bridge) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let spawned = thread::Builder::new()
        .name(format!("toolbridge-conn-{peer}"))
        .spawn(move || {
            if let Err(e) = serve_connection(stream, &bridge) {
                logwise::warn_sync!(
                    "connection from {peer} failed: {error}",
                    peer = peer,
                    error = e.to_string()
                );
            }
        });
    if let Err(e) = spawned {
        logwise::error_sync!("could not spawn connection thread: {error}", error = e.to_string());
    }
}

fn serve_connection(stream: TcpStream, bridge: &Bridge) -> Result<(), HttpError> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let response = match read_request(&mut reader, bridge.config().max_body_bytes) {
        Ok(request) => respond(bridge, &request),
        Err(e) => match e.status() {
            Some(status) => {
                logwise::warn_sync!("rejected request: {error}", error = e.to_string());
                HttpResponse::empty(status)
            }
            None => return Err(e),
        },
    };
    response.write_to(&mut writer)?;
    logwise::info_sync!(
        "response {status} {stage}",
        status = response.status.to_string(),
        stage = Stage::Sent.to_string()
    );
    Ok(())
}
