//! Minimal HTTP/1.1 server answering canned responses, for tests that
//! exercise the real download path without leaving the machine.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A canned answer for one request target.
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// `200 OK` with the given body.
    Ok(String),
    /// The given status code with an empty body.
    Status(u16),
    /// `302 Found` pointing at another target on the same server.
    Redirect(String),
    /// `200 OK` with the given body, sent only after the delay.
    Delay(Duration, String),
}

/// A background server bound to an ephemeral localhost port.
///
/// Requests are matched on their full target (path and query). Unknown
/// targets get a `404`. The server stops when dropped.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Binds a new server serving `routes`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(routes: Vec<(String, StubResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let hits = Arc::new(AtomicUsize::new(0));
        let routes = Arc::new(routes);

        let counter = Arc::clone(&hits);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let _ = serve(stream, &routes).await;
                });
            }
        });

        Self { addr, hits, handle }
    }

    /// Base URL of the server, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, routes: &[(String, StubResponse)]) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request = String::from_utf8_lossy(&buf);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let response = routes
        .iter()
        .find(|(route, _)| route == target)
        .map_or(StubResponse::Status(404), |(_, response)| response.clone());

    let raw = match response {
        StubResponse::Ok(body) => ok_response(&body),
        StubResponse::Delay(delay, body) => {
            tokio::time::sleep(delay).await;
            ok_response(&body)
        }
        StubResponse::Status(code) => format!(
            "HTTP/1.1 {code} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ),
        StubResponse::Redirect(location) => format!(
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ),
    };

    stream.write_all(raw.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
