//! [`reqwest`]-backed implementation of [`HttpClient`].

use futures::{future::BoxFuture, FutureExt};
use reqwest::{
    header::{AUTHORIZATION, WWW_AUTHENTICATE},
    Method, StatusCode,
};
use wot_binding_core::{config::BindingConfig, security::Credential};

use crate::{
    error::ReqwestHttpError,
    http_client::{HttpClient, HttpRequest, HttpResponse},
};

/// A [`reqwest`]-backed implementation of [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client from the binding configuration.
    ///
    /// Certificate verification follows `accept_invalid_certs`; the optional
    /// `request_timeout` bounds every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &BindingConfig) -> Result<Self, ReqwestHttpError> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }

    async fn send(
        &self,
        method: &Method,
        request: &HttpRequest,
        authorization: Authorization<'_>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = self.inner.request(method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder = match authorization {
            Authorization::None => builder,
            Authorization::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Authorization::Bearer(token) => builder.bearer_auth(token),
            Authorization::Header(value) => builder.header(AUTHORIZATION, value),
        };

        builder.send().await
    }
}

enum Authorization<'a> {
    None,
    Basic { username: &'a str, password: &'a str },
    Bearer(&'a str),
    Header(String),
}

impl<'a> Authorization<'a> {
    /// What goes out with the first request.
    fn initial(credential: Option<&'a Credential>) -> Self {
        match credential {
            Some(Credential::Basic { username, password }) => Self::Basic { username, password },
            Some(Credential::Bearer { token }) => Self::Bearer(token),
            Some(Credential::Digest { .. }) | None => Self::None,
        }
    }
}

/// Answer a `WWW-Authenticate: Digest` challenge.
fn digest_response(
    challenge: &str,
    username: &str,
    password: &str,
    method: &Method,
    url: &str,
    body: Option<&[u8]>,
) -> Result<String, ReqwestHttpError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ReqwestHttpError::Digest(e.to_string()))?;
    let uri = match parsed.query() {
        Some(q) => format!("{}?{q}", parsed.path()),
        None => parsed.path().to_string(),
    };

    let mut prompt =
        digest_auth::parse(challenge).map_err(|e| ReqwestHttpError::Digest(e.to_string()))?;
    let context = digest_auth::AuthContext::new_with_method(
        username,
        password,
        &uri,
        body,
        digest_auth::HttpMethod::from(method.as_str()),
    );
    let answer = prompt
        .respond(&context)
        .map_err(|e| ReqwestHttpError::Digest(e.to_string()))?;

    Ok(answer.to_header_string())
}

async fn into_response(resp: reqwest::Response) -> Result<HttpResponse, ReqwestHttpError> {
    let status = resp.status().as_u16();
    let url = resp.url().to_string();

    let headers: Vec<(String, String)> = resp
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let body = resp.bytes().await?.to_vec();

    Ok(HttpResponse {
        status,
        body,
        headers,
        url,
    })
}

impl HttpClient for ReqwestHttpClient {
    type Error = ReqwestHttpError;

    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        async move {
            let method = Method::from_bytes(request.method.as_bytes())
                .map_err(|_| ReqwestHttpError::InvalidMethod(request.method.clone()))?;

            let first = self
                .send(
                    &method,
                    &request,
                    Authorization::initial(request.credential.as_ref()),
                )
                .await?;

            let Some(Credential::Digest { username, password }) = &request.credential else {
                return into_response(first).await;
            };
            if first.status() != StatusCode::UNAUTHORIZED {
                return into_response(first).await;
            }

            let challenge = first
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .filter(|v| v.trim_start().to_ascii_lowercase().starts_with("digest"))
                .map(str::to_string);

            match challenge {
                Some(challenge) => {
                    tracing::debug!("answering digest challenge for {}", request.url);
                    let header = digest_response(
                        &challenge,
                        username,
                        password,
                        &method,
                        &request.url,
                        request.body.as_deref(),
                    )?;
                    let second = self
                        .send(&method, &request, Authorization::Header(header))
                        .await?;
                    into_response(second).await
                }
                None => into_response(first).await,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use crate::{binding::HttpBinding, http_client::ErrorCode};
    use wot_binding_core::{
        codec::Payload,
        interaction::{Interaction, Operation},
        message::Status,
        td::Form,
    };

    const CHALLENGE: &str = r#"Digest realm="lamp", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", qop="auth""#;

    /// Serve `count` requests, one connection each, answering every request
    /// head with `reply`. Returns the request heads seen, lower-cased.
    async fn serve(
        count: usize,
        reply: fn(&str) -> String,
    ) -> TestResult<(String, JoinHandle<Vec<String>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base = format!("http://{}", listener.local_addr()?);

        let server = tokio::spawn(async move {
            let mut heads = Vec::new();
            while heads.len() < count {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).to_lowercase();
                let _ = stream.write_all(reply(&head).as_bytes()).await;
                let _ = stream.shutdown().await;
                heads.push(head);
            }
            heads
        });

        Ok((base, server))
    }

    fn digest_gate(head: &str) -> String {
        if head.contains("authorization: digest ") {
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 4\r\nconnection: close\r\n\r\ntrue".into()
        } else {
            format!(
                "HTTP/1.1 401 Unauthorized\r\nwww-authenticate: {CHALLENGE}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            )
        }
    }

    fn basic_challenge(_head: &str) -> String {
        "HTTP/1.1 401 Unauthorized\r\nwww-authenticate: Basic realm=\"lamp\"\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".into()
    }

    fn get(url: String, credential: Option<Credential>) -> HttpRequest {
        HttpRequest {
            method: "GET".into(),
            url,
            headers: Vec::new(),
            body: None,
            credential,
        }
    }

    fn digest() -> Option<Credential> {
        Some(Credential::Digest {
            username: "u".into(),
            password: "p".into(),
        })
    }

    #[tokio::test]
    async fn digest_is_sent_only_after_challenge() -> TestResult {
        let (base, server) = serve(2, digest_gate).await?;
        let client = ReqwestHttpClient::new(&BindingConfig::default())?;

        let resp = client
            .execute(get(format!("{base}/status"), digest()))
            .await?;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"true");

        let heads = server.await?;
        assert_eq!(heads.len(), 2);
        assert!(!heads[0].contains("authorization:"));
        assert!(heads[1].contains(r#"authorization: digest username="u", realm="lamp""#));
        assert!(heads[1].contains(r#"uri="/status""#));
        Ok(())
    }

    #[tokio::test]
    async fn non_digest_challenge_is_returned_without_retry() -> TestResult {
        let (base, server) = serve(1, basic_challenge).await?;
        let client = ReqwestHttpClient::new(&BindingConfig::default())?;

        let resp = client
            .execute(get(format!("{base}/status"), digest()))
            .await?;
        assert_eq!(resp.status, 401);

        let heads = server.await?;
        assert_eq!(heads.len(), 1);
        assert!(!heads[0].contains("authorization:"));
        Ok(())
    }

    #[tokio::test]
    async fn basic_is_sent_up_front() -> TestResult {
        let (base, server) = serve(1, digest_gate).await?;
        let client = ReqwestHttpClient::new(&BindingConfig::default())?;

        let credential = Some(Credential::Basic {
            username: "user".into(),
            password: "pass".into(),
        });
        let resp = client
            .execute(get(format!("{base}/status"), credential))
            .await?;
        assert_eq!(resp.status, 401);

        let heads = server.await?;
        assert!(heads[0].contains("authorization: basic dxnlcjpwyxnz"));
        Ok(())
    }

    #[test]
    fn digest_response_answers_fixed_challenge() -> TestResult {
        let header = digest_response(
            CHALLENGE,
            "Mufasa",
            "Circle Of Life",
            &Method::GET,
            "http://lamp.local/dir/index.html?x=1",
            None,
        )?;

        assert!(header.starts_with("Digest "));
        assert!(header.contains(r#"username="Mufasa""#));
        assert!(header.contains(r#"realm="lamp""#));
        assert!(header.contains(r#"nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093""#));
        assert!(header.contains(r#"uri="/dir/index.html?x=1""#));
        assert!(header.contains("qop=auth"));
        Ok(())
    }

    #[test]
    fn unusable_challenge_is_an_auth_error() {
        let result = digest_response(
            "Digest qop=\"auth\"",
            "u",
            "p",
            &Method::GET,
            "http://lamp.local/",
            None,
        );
        assert!(matches!(result, Err(ReqwestHttpError::Digest(_))));
        assert_eq!(result.err().map(|e| e.code()), Some("EAUTH"));
    }

    #[tokio::test]
    async fn transport_error_names_the_target_once() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/status", listener.local_addr()?);
        drop(listener);

        let binding = HttpBinding::new(ReqwestHttpClient::new(&BindingConfig::default())?);
        let form = Form {
            href: url.clone(),
            content_type: "application/json".into(),
            security: None,
            http_method: None,
            coap_method: None,
            response_content_type: None,
            op: Vec::new(),
        };
        let msg = binding
            .execute(&Interaction::new(Operation::ReadProperty, form))
            .await;

        let Some(Payload::Text(text)) = &msg.payload else {
            return Err(format!("expected a diagnostic text payload, got {:?}", msg.payload).into());
        };
        assert!(text.ends_with(&format!(": {url}")));
        assert_eq!(text.matches(url.as_str()).count(), 1);
        assert_eq!(msg.status, Some(Status::Transport("ECONNECT".into())));
        Ok(())
    }
}
