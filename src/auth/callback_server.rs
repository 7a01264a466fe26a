//! Callback route
//!
//! A one-shot HTTP listener on the application origin that receives the
//! provider redirect to `/auth/callback`, and the handler that turns that
//! redirect into a session. Everything the handler needs comes from the
//! callback URL itself.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use url::Url;
use crate::Result;
use crate::api::ApiClient;
use crate::error::Error;
use super::redirect::CALLBACK_PATH;
use super::session::SessionStore;

/// Time a connection gets to send its request line
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest request line accepted
const MAX_REQUEST_LINE: usize = 8192;

/// Page shown after the session is established
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>vidopt | Signed in</title>
    <style>
        body {
            background-color: #030712;
            color: #e5e7eb;
            font-family: -apple-system, system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        h1 { font-size: 24px; color: #3b82f6; margin: 0 0 12px; }
        p { font-size: 15px; color: #9ca3af; line-height: 1.6; }
    </style>
</head>
<body>
    <div>
        <h1>Signed in</h1>
        <p>You can close this window and return to your terminal.</p>
    </div>
</body>
</html>"#;

/// Page shown when the sign-in could not be completed
const FAILURE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>vidopt | Sign-in failed</title>
    <style>
        body {
            background-color: #030712;
            color: #e5e7eb;
            font-family: -apple-system, system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        h1 { font-size: 24px; color: #ef4444; margin: 0 0 12px; }
        p { font-size: 15px; color: #9ca3af; line-height: 1.6; }
    </style>
</head>
<body>
    <div>
        <h1>Sign-in failed</h1>
        <p>Something went wrong while completing sign in.<br>Check your terminal and try again.</p>
    </div>
</body>
</html>"#;

/// Where the user goes once the callback has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Signed in; the analysis area
    App,
    /// Unauthenticated entry point
    Landing,
}

/// Query parameters of a provider redirect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Parse a callback URL. Accepts an absolute URL or an origin-relative target
/// such as `/auth/callback?code=abc`.
pub fn parse_callback_url(target: &str) -> Result<CallbackParams> {
    let url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost")
            .and_then(|base| base.join(target))
            .map_err(|e| Error::Callback(format!("Failed to parse callback URL: {}", e)))?,
        Err(e) => return Err(Error::Callback(format!("Failed to parse callback URL: {}", e))),
    };

    if url.path() != CALLBACK_PATH {
        return Err(Error::Callback(format!("Unexpected callback path: {}", url.path())));
    }

    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            "error_description" => params.error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(params)
}

/// Complete a sign-in from the callback URL.
///
/// Owns exactly one exchange attempt. With no `code` the session is left alone
/// and the user goes back to [`Destination::Landing`] without any exchange call.
/// When `expected_state` is given, the returned `state` must match it.
/// On error the session is unchanged and the caller routes to the landing page.
pub async fn handle_callback(
    target: &str,
    expected_state: Option<&str>,
    api: &ApiClient,
    session: &mut SessionStore,
) -> Result<Destination> {
    let params = parse_callback_url(target)?;

    if let Some(err) = params.error {
        let description = params.error_description.unwrap_or_else(|| "Unknown error".to_string());
        return Err(Error::Callback(format!("Authorization failed: {} - {}", err, description)));
    }

    let code = match params.code.filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => {
            tracing::info!("Callback without authorization code, returning to landing");
            return Ok(Destination::Landing);
        }
    };

    if let Some(expected) = expected_state {
        match params.state.as_deref() {
            Some(s) if s == expected => {}
            Some(_) => return Err(Error::Callback("State mismatch".to_string())),
            None => return Err(Error::Callback("Missing state parameter".to_string())),
        }
    }

    let tokens = api.exchange_code_for_token(&code).await?;
    session.set_token(tokens.id_token);
    Ok(Destination::App)
}

/// Listener bound to the application origin
pub struct CallbackListener {
    listener: TcpListener,
}

/// A callback request waiting for its answer page
pub struct PendingCallback {
    socket: TcpStream,
    target: String,
}

impl CallbackListener {
    /// Bind to the host and port of `origin`
    pub async fn bind(origin: &Url) -> Result<Self> {
        let host = origin
            .host_str()
            .ok_or_else(|| Error::Config(format!("origin {} has no host", origin)))?;
        let port = origin
            .port_or_known_default()
            .ok_or_else(|| Error::Config(format!("origin {} has no port", origin)))?;

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            Error::Callback(format!("Failed to start callback server on {}:{}: {}", host, port, e))
        })?;

        tracing::info!("Callback server listening on {}", origin);
        Ok(Self { listener })
    }

    pub fn local_port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Wait for the browser to hit the callback path. Other requests
    /// (favicon probes and the like) get a 404 and are skipped.
    ///
    /// Every connection is read on its own task, so an idle speculative
    /// connection cannot hold up the real redirect.
    pub async fn accept(&self) -> Result<PendingCallback> {
        let (tx, mut rx) = mpsc::channel::<PendingCallback>(1);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, _) = accepted
                        .map_err(|e| Error::Callback(format!("Failed to accept connection: {}", e)))?;
                    tokio::spawn(serve_connection(socket, tx.clone()));
                }
                Some(pending) = rx.recv() => return Ok(pending),
            }
        }
    }
}

/// Read one request line; callback requests are handed back, the rest get a 404
async fn serve_connection(mut socket: TcpStream, tx: mpsc::Sender<PendingCallback>) {
    let line = match timeout(REQUEST_READ_TIMEOUT, read_request_line(&mut socket)).await {
        Ok(Some(line)) => line,
        Ok(None) => return,
        Err(_) => {
            tracing::debug!("Dropping idle connection");
            return;
        }
    };

    match request_target(&line) {
        Some(target) if target.split('?').next() == Some(CALLBACK_PATH) => {
            let pending = PendingCallback { socket, target: target.to_string() };
            let _ = tx.send(pending).await;
        }
        other => {
            tracing::debug!(target = ?other, "Ignoring non-callback request");
            write_response(&mut socket, "404 Not Found", "").await;
        }
    }
}

/// Bytes up to the first CRLF. `None` on EOF, read error or an oversized line.
async fn read_request_line(socket: &mut TcpStream) -> Option<String> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = buffer.windows(2).position(|w| w == b"\r\n") {
            return Some(String::from_utf8_lossy(&buffer[..end]).into_owned());
        }
        if buffer.len() >= MAX_REQUEST_LINE {
            return None;
        }

        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

impl PendingCallback {
    /// Origin-relative request target, e.g. `/auth/callback?code=abc`
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Send the result page and close the connection
    pub async fn respond(mut self, destination: &Result<Destination>) {
        let (status, body) = match destination {
            Ok(Destination::App) => ("200 OK", SUCCESS_HTML),
            Ok(Destination::Landing) | Err(_) => ("400 Bad Request", FAILURE_HTML),
        };
        write_response(&mut self.socket, status, body).await;
    }
}

/// Request target from `GET /path?query HTTP/1.1`
fn request_target(request: &str) -> Option<&str> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target),
        _ => None,
    }
}

async fn write_response(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    // The browser may already be gone; nothing to do about it
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_success() {
        let params = parse_callback_url("/auth/callback?code=abc123&state=xyz789").unwrap();
        assert_eq!(params.code.as_deref(), Some("abc123"));
        assert_eq!(params.state.as_deref(), Some("xyz789"));
        assert!(params.error.is_none());
    }

    #[test]
    fn test_parse_absolute_url() {
        let params = parse_callback_url("http://localhost:3000/auth/callback?code=a%2Bb").unwrap();
        assert_eq!(params.code.as_deref(), Some("a+b"));
    }

    #[test]
    fn test_parse_callback_without_code() {
        let params = parse_callback_url("/auth/callback").unwrap();
        assert_eq!(params, CallbackParams::default());
    }

    #[test]
    fn test_parse_provider_error() {
        let params =
            parse_callback_url("/auth/callback?error=access_denied&error_description=User+denied")
                .unwrap();
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User denied"));
    }

    #[test]
    fn test_parse_wrong_path() {
        let err = parse_callback_url("/callback?code=abc").unwrap_err();
        assert!(err.to_string().contains("Unexpected callback path"));
    }

    #[test]
    fn test_request_target() {
        let request = "GET /auth/callback?code=abc HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(request_target(request), Some("/auth/callback?code=abc"));
        assert_eq!(request_target("POST /auth/callback HTTP/1.1\r\n\r\n"), None);
        assert_eq!(request_target(""), None);
    }

    #[tokio::test]
    async fn test_provider_error_skips_exchange() {
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut session = SessionStore::new();

        let err = handle_callback(
            "/auth/callback?error=access_denied&code=abc",
            None,
            &api,
            &mut session,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("access_denied"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_state_mismatch_skips_exchange() {
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut session = SessionStore::new();

        let err = handle_callback("/auth/callback?code=abc&state=wrong", Some("expected"), &api, &mut session)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mismatch"));

        let err = handle_callback("/auth/callback?code=abc", Some("expected"), &api, &mut session)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing state"));

        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_callback() {
        let origin = Url::parse("http://127.0.0.1:0").unwrap();
        let listener = CallbackListener::bind(&origin).await.unwrap();
        let port = listener.local_port().unwrap();

        // Speculative connection that never sends anything
        let _idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream.write_all(b"GET /auth/callback?code=abc HTTP/1.1\r\n\r\n").await.unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let pending = timeout(Duration::from_secs(3), listener.accept())
            .await
            .expect("callback accepted while an idle connection is open")
            .unwrap();
        assert_eq!(pending.target(), "/auth/callback?code=abc");
        pending.respond(&Ok(Destination::App)).await;

        assert!(client.await.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_request_line_split_across_writes() {
        let origin = Url::parse("http://127.0.0.1:0").unwrap();
        let listener = CallbackListener::bind(&origin).await.unwrap();
        let port = listener.local_port().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream.set_nodelay(true).unwrap();
            stream.write_all(b"GET /auth/callback?co").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            stream.write_all(b"de=abc HTTP/1.1\r\n\r\n").await.unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let pending = listener.accept().await.unwrap();
        assert_eq!(pending.target(), "/auth/callback?code=abc");

        let params = parse_callback_url(pending.target()).unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));

        pending.respond(&Ok(Destination::App)).await;
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_serves_callback() {
        let origin = Url::parse("http://127.0.0.1:0").unwrap();
        let listener = CallbackListener::bind(&origin).await.unwrap();
        let port = listener.local_port().unwrap();

        let client = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            favicon.write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n").await.unwrap();
            let mut reply = String::new();
            favicon.read_to_string(&mut reply).await.unwrap();
            assert!(reply.starts_with("HTTP/1.1 404"));

            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream.write_all(b"GET /auth/callback?code=abc HTTP/1.1\r\n\r\n").await.unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let pending = listener.accept().await.unwrap();
        assert_eq!(pending.target(), "/auth/callback?code=abc");
        pending.respond(&Ok(Destination::App)).await;

        let reply = client.await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.contains("Signed in"));
    }
}
