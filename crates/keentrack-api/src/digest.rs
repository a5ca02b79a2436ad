// HTTP Digest authentication (RFC 7616 / RFC 2617, MD5 only)
//
// Keenetic firmware challenges with `qop="auth"` and `algorithm=MD5`;
// older releases omit qop entirely. Both forms are handled. The session
// keeps the last accepted challenge and a nonce counter so follow-up
// requests can authenticate preemptively without an extra round trip.

use md5::{Digest as _, Md5};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Parsed `WWW-Authenticate: Digest ...` challenge parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    ///
    /// Only the `Digest` scheme is accepted. Parameter values may be
    /// quoted or bare; quoted values can contain commas (`qop="auth,auth-int"`).
    pub fn parse(header: &str) -> Result<Self, Error> {
        let rest = header
            .trim_start()
            .strip_prefix("Digest ")
            .or_else(|| header.trim_start().strip_prefix("digest "))
            .ok_or_else(|| Error::Authentication {
                message: format!(
                    "unsupported authentication scheme: {}",
                    header.split_whitespace().next().unwrap_or("<empty>")
                ),
            })?;

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop = None;
        let mut algorithm = None;

        for (key, value) in split_params(rest) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop = Some(value),
                "algorithm" => algorithm = Some(value),
                _ => {}
            }
        }

        let realm = realm.ok_or_else(|| missing("realm"))?;
        let nonce = nonce.ok_or_else(|| missing("nonce"))?;

        if let Some(ref alg) = algorithm {
            if !alg.eq_ignore_ascii_case("md5") {
                return Err(Error::Authentication {
                    message: format!("unsupported digest algorithm: {alg}"),
                });
            }
        }

        Ok(Self {
            realm,
            nonce,
            opaque,
            qop,
            algorithm,
        })
    }

    /// The qop value to use in the response, if the challenge offered one.
    ///
    /// Only `auth` is supported; `auth-int` would require hashing the body.
    fn response_qop(&self) -> Option<&str> {
        self.qop
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|q| *q == "auth")
    }
}

/// Mutable digest session state: the last accepted challenge plus the
/// nonce-count counter, retained across requests for preemptive auth.
#[derive(Debug)]
pub struct DigestSession {
    challenge: DigestChallenge,
    nonce_count: u32,
}

impl DigestSession {
    pub fn new(challenge: DigestChallenge) -> Self {
        Self {
            challenge,
            nonce_count: 0,
        }
    }

    /// Compute an `Authorization` header for one request, consuming a
    /// nonce-count and generating a fresh client nonce.
    pub fn authorization(
        &mut self,
        method: &str,
        uri: &str,
        username: &str,
        password: &SecretString,
    ) -> String {
        self.nonce_count += 1;
        let cnonce = hex::encode(rand::random::<[u8; 8]>());
        self.header(method, uri, username, password, &cnonce, self.nonce_count)
    }

    /// Header computation with explicit cnonce/nc, split out so the
    /// digest math is testable against the RFC reference vector.
    fn header(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        password: &SecretString,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let challenge = &self.challenge;
        let ha1 = md5_hex(&format!(
            "{username}:{}:{}",
            challenge.realm,
            password.expose_secret()
        ));
        let ha2 = md5_hex(&format!("{method}:{uri}"));

        let qop = challenge.response_qop();
        let response = match qop {
            Some(qop) => md5_hex(&format!(
                "{ha1}:{}:{nc:08x}:{cnonce}:{qop}:{ha2}",
                challenge.nonce
            )),
            None => md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce)),
        };

        let mut header = format!(
            "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", \
             response=\"{response}\", algorithm=MD5",
            challenge.realm, challenge.nonce
        );
        if let Some(qop) = qop {
            header.push_str(&format!(", qop={qop}, nc={nc:08x}, cnonce=\"{cnonce}\""));
        }
        if let Some(ref opaque) = challenge.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn missing(param: &str) -> Error {
    Error::Authentication {
        message: format!("digest challenge is missing the {param} parameter"),
    }
}

/// Split a comma-separated parameter list into `(key, value)` pairs,
/// honoring quoted values (which may themselves contain commas).
fn split_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut segment = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                segment.push(ch);
            }
            ',' if !in_quotes => {
                push_param(&mut params, &segment);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }
    push_param(&mut params, &segment);
    params
}

fn push_param(params: &mut Vec<(String, String)>, segment: &str) {
    if let Some((key, value)) = segment.split_once('=') {
        params.push((
            key.trim().to_ascii_lowercase(),
            value.trim().trim_matches('"').to_owned(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rfc_challenge() -> DigestChallenge {
        DigestChallenge::parse(
            "Digest realm=\"testrealm@host.com\", qop=\"auth,auth-int\", \
             nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", \
             opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"",
        )
        .unwrap()
    }

    #[test]
    fn parses_challenge_parameters() {
        let challenge = rfc_challenge();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(
            challenge.opaque.as_deref(),
            Some("5ccc069c403ebaf9f0171e9517f40e41")
        );
        assert_eq!(challenge.qop.as_deref(), Some("auth,auth-int"));
        assert_eq!(challenge.response_qop(), Some("auth"));
    }

    #[test]
    fn rejects_non_digest_scheme() {
        let err = DigestChallenge::parse("Basic realm=\"router\"").unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn rejects_challenge_without_nonce() {
        let err = DigestChallenge::parse("Digest realm=\"router\"").unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn rejects_unsupported_algorithm() {
        let err = DigestChallenge::parse(
            "Digest realm=\"r\", nonce=\"n\", algorithm=SHA-256",
        )
        .unwrap_err();
        assert!(err.is_auth());
    }

    // Reference vector from RFC 2617 §3.5 (also RFC 7616 §3.9.1).
    #[test]
    fn computes_rfc2617_reference_response() {
        let session = DigestSession::new(rfc_challenge());
        let password = SecretString::from("Circle Of Life".to_owned());

        let header = session.header(
            "GET",
            "/dir/index.html",
            "Mufasa",
            &password,
            "0a4f113b",
            1,
        );

        assert!(
            header.contains("response=\"6629fae49393a05397450978507c4ef1\""),
            "unexpected header: {header}"
        );
        assert!(header.contains("nc=00000001"));
        assert!(header.contains("qop=auth"));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }

    #[test]
    fn nonce_count_increments_per_request() {
        let mut session = DigestSession::new(rfc_challenge());
        let password = SecretString::from("secret".to_owned());

        let first = session.authorization("POST", "/ci", "admin", &password);
        let second = session.authorization("POST", "/ci", "admin", &password);

        assert!(first.contains("nc=00000001"));
        assert!(second.contains("nc=00000002"));
    }

    #[test]
    fn omits_qop_fields_when_challenge_has_none() {
        let challenge =
            DigestChallenge::parse("Digest realm=\"router\", nonce=\"abc123\"").unwrap();
        let mut session = DigestSession::new(challenge);
        let password = SecretString::from("secret".to_owned());

        let header = session.authorization("POST", "/ci", "admin", &password);

        assert!(!header.contains("qop="));
        assert!(!header.contains("nc="));
        assert!(!header.contains("cnonce="));
    }
}
