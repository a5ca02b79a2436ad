// Digest-authenticated HTTP client
//
// Wraps `reqwest::Client` with the challenge-response dance the router's
// command interface requires. The first request after startup goes out
// unauthenticated; the 401 challenge seeds a session that authenticates
// every later request preemptively until the router rejects the nonce.
// A second 401 on a retried request is terminal for that call, never a
// loop.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::digest::{DigestChallenge, DigestSession};
use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client for a single router endpoint, with transparent
/// Digest authentication and challenge caching.
pub struct DigestClient {
    http: reqwest::Client,
    endpoint: Url,
    username: String,
    password: SecretString,
    session: Mutex<Option<DigestSession>>,
}

impl DigestClient {
    /// Create a client for `endpoint` (e.g. `http://192.168.1.1/ci`).
    pub fn new(
        endpoint: Url,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            endpoint,
            username: username.into(),
            password,
            session: Mutex::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            endpoint,
            username: username.into(),
            password,
            session: Mutex::new(None),
        }
    }

    /// The configured router endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST an XML body to the router and return the response text.
    ///
    /// Handles the Digest handshake: an initial 401 is answered exactly
    /// once with computed credentials; a second 401 surfaces as
    /// [`Error::Authentication`]. Any other non-2xx status is
    /// [`Error::Status`].
    pub async fn post_xml(&self, body: &str) -> Result<String, Error> {
        let mut session = self.session.lock().await;

        // Preemptive auth when a cached challenge is held avoids the
        // extra 401 round trip on every poll.
        let mut request = self.xml_request(body);
        if let Some(ref mut cached) = *session {
            trace!("authenticating preemptively from cached challenge");
            request = request.header(
                AUTHORIZATION,
                cached.authorization("POST", self.endpoint.path(), &self.username, &self.password),
            );
        }

        let response = request.send().await.map_err(Error::Transport)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response).await;
        }

        // Stale or missing credentials: take the fresh challenge and
        // replay the request once.
        debug!("router challenged request; retrying with digest credentials");
        let challenge = parse_challenge(&response)?;
        let mut fresh = DigestSession::new(challenge);
        let authorization =
            fresh.authorization("POST", self.endpoint.path(), &self.username, &self.password);
        *session = Some(fresh);

        let retry = self
            .xml_request(body)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(Error::Transport)?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            // Wrong credentials. Drop the session so the next call
            // starts the handshake from scratch.
            *session = None;
            return Err(Error::Authentication {
                message: "router rejected digest credentials".into(),
            });
        }

        read_body(retry).await
    }

    fn xml_request(&self, body: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/xml")
            .header(CONTENT_TYPE, "application/xml")
            .body(body.to_owned())
    }
}

fn parse_challenge(response: &reqwest::Response) -> Result<DigestChallenge, Error> {
    let header = response
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Authentication {
            message: "401 response carried no WWW-Authenticate challenge".into(),
        })?;
    DigestChallenge::parse(header)
}

async fn read_body(response: reqwest::Response) -> Result<String, Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(Error::Transport)
}
