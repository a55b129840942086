//! Tokio and [`async_tungstenite`] backed [`WsConnector`].
//!
//! Plain sockets are opened directly, or tunnelled through an HTTP proxy
//! with `CONNECT` when one is configured. TLS for `wss` uses the bundled
//! web PKI roots; certificates are verified.

use ::tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use async_tungstenite::{tokio::client_async_tls, tungstenite::Message, WebSocketStream};
use base64::Engine;
use futures::{future::BoxFuture, AsyncRead, AsyncWrite, FutureExt, StreamExt};
use tungstenite::{
    client::IntoClientRequest,
    http::{
        header::{HeaderValue, AUTHORIZATION},
        Uri,
    },
};
use wot_binding_core::security::Credential;

use crate::{
    connection::{Frame, WsConnection, WsConnector, WsTarget},
    error::WebSocketError,
};

/// Largest proxy `CONNECT` response header accepted.
const MAX_PROXY_RESPONSE: usize = 8 * 1024;

/// Opens WebSockets over Tokio TCP.
#[derive(Debug, Clone, Default)]
pub struct TokioWsConnector {
    proxy: Option<String>,
}

impl TokioWsConnector {
    /// Connect directly, or through `proxy` (an `http://host:port` URL) when
    /// given.
    #[must_use]
    pub const fn new(proxy: Option<String>) -> Self {
        Self { proxy }
    }

    async fn open(&self, target: WsTarget) -> Result<Box<dyn WsConnection>, WebSocketError> {
        let mut request = target.uri.as_str().into_client_request()?;
        if let Some(value) = authorization(target.credential.as_ref()) {
            let value =
                HeaderValue::from_str(&value).map_err(|_| WebSocketError::InvalidAuthorization)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (host, port) = host_and_port(request.uri())
            .ok_or_else(|| WebSocketError::InvalidUri(target.uri.clone()))?;

        let stream = match &self.proxy {
            Some(proxy) => tunnel(proxy, &host, port).await?,
            None => TcpStream::connect((host.as_str(), port)).await?,
        };

        tracing::info!("connecting to WebSocket server at {}", target.uri);
        let (ws, _resp) = client_async_tls(request, stream).await?;
        Ok(Box::new(TokioWsConnection { inner: ws }))
    }
}

impl WsConnector for TokioWsConnector {
    fn connect(
        &self,
        target: WsTarget,
    ) -> BoxFuture<'_, Result<Box<dyn WsConnection>, WebSocketError>> {
        self.open(target).boxed()
    }
}

/// The `Authorization` header for a credential, if it can be sent up front.
fn authorization(credential: Option<&Credential>) -> Option<String> {
    match credential? {
        Credential::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{username}:{password}"));
            Some(format!("Basic {encoded}"))
        }
        Credential::Bearer { token } => Some(format!("Bearer {token}")),
        Credential::Digest { .. } => {
            tracing::warn!("digest authentication is not supported for WebSocket, connecting without credentials");
            None
        }
    }
}

fn host_and_port(uri: &Uri) -> Option<(String, u16)> {
    let host = uri.host()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
        .to_string();
    let port = uri
        .port_u16()
        .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });
    Some((host, port))
}

fn authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Open a TCP tunnel to `host:port` through an HTTP proxy.
async fn tunnel(proxy: &str, host: &str, port: u16) -> Result<TcpStream, WebSocketError> {
    let proxy_url =
        url::Url::parse(proxy).map_err(|e| WebSocketError::Proxy(format!("{proxy}: {e}")))?;
    let proxy_host = proxy_url
        .host_str()
        .ok_or_else(|| WebSocketError::Proxy(format!("{proxy}: no host")))?;
    let proxy_port = proxy_url.port_or_known_default().unwrap_or(80);

    tracing::debug!("tunnelling to {host}:{port} through proxy {proxy_host}:{proxy_port}");
    let mut stream = TcpStream::connect((proxy_host, proxy_port)).await?;

    let target = authority(host, port);
    let mut connect = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
    if !proxy_url.username().is_empty() {
        let userinfo = format!(
            "{}:{}",
            proxy_url.username(),
            proxy_url.password().unwrap_or_default()
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(userinfo);
        connect.push_str(&format!("Proxy-Authorization: Basic {encoded}\r\n"));
    }
    connect.push_str("\r\n");
    stream.write_all(connect.as_bytes()).await?;

    let mut response = Vec::new();
    let mut chunk = [0u8; 512];
    while !response.windows(4).any(|w| w == b"\r\n\r\n") {
        if response.len() > MAX_PROXY_RESPONSE {
            return Err(WebSocketError::Proxy("response header too large".into()));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(WebSocketError::Proxy("proxy closed the connection".into()));
        }
        response.extend_from_slice(&chunk[..n]);
    }

    let status_line = response
        .split(|b| *b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .unwrap_or_default();
    let accepted = status_line
        .split_whitespace()
        .nth(1)
        .is_some_and(|code| code.starts_with('2'));
    if !accepted {
        return Err(WebSocketError::Proxy(status_line));
    }

    Ok(stream)
}

/// An open [`async_tungstenite`] socket.
struct TokioWsConnection<S> {
    inner: WebSocketStream<S>,
}

impl<S> WsConnection for TokioWsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Frame, WebSocketError>> {
        async move {
            loop {
                match self.inner.next().await {
                    None => {
                        return Ok(Frame::Close {
                            code: None,
                            reason: String::new(),
                        })
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => return Ok(Frame::Data(text.into_bytes())),
                    Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Data(bytes)),
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(match frame {
                            Some(frame) => Frame::Close {
                                code: Some(frame.code.into()),
                                reason: frame.reason.into_owned(),
                            },
                            None => Frame::Close {
                                code: None,
                                reason: String::new(),
                            },
                        })
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                }
            }
        }
        .boxed()
    }

    fn close(mut self: Box<Self>) -> BoxFuture<'static, ()> {
        async move {
            if let Err(e) = self.inner.close(None).await {
                tracing::debug!("error closing websocket: {e}");
            }
        }
        .boxed()
    }
}
