//! HTTP Digest access authentication (RFC 7616, compatible with RFC 2617).

use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;

use http::{HeaderValue, Method, StatusCode};
use md5::Md5;
use rand::Rng;
use sha2::{Digest as _, Sha256};

use super::parse_www_authenticate;
use crate::client::{Request, Response};
use crate::scheme::Credentials;
use crate::Result;

/// Send `request` unauthenticated, answer a Digest challenge once.
pub(super) async fn execute<F, Fut>(
    request: Request,
    creds: &Credentials,
    execute_fn: &mut F,
) -> Result<Response>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let original_request = request.clone();
    let response = execute_fn(request).await?;

    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(response);
    }

    let challenges = parse_www_authenticate(response.headers());
    if challenges.digest.is_empty() {
        if challenges.basic {
            log::debug!("server offers Basic but not Digest");
        } else {
            log::debug!("401 without a Digest challenge");
        }
        return Ok(response);
    }

    let challenge = Challenge::select(&challenges.digest)?;
    let uri = original_request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_owned();
    let answer = challenge.respond(creds, original_request.method(), &uri, &cnonce(), 1);

    let mut auth_request = original_request;
    let mut header = HeaderValue::from_str(&answer)
        .map_err(|_| crate::error::auth("invalid Digest authorization header"))?;
    header.set_sensitive(true);
    auth_request
        .headers_mut()
        .insert(http::header::AUTHORIZATION, header);

    log::debug!(
        "answering Digest challenge for realm {:?} ({})",
        challenge.realm,
        challenge.algorithm.as_str()
    );
    execute_fn(auth_request).await
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Some(Algorithm::Md5),
            "MD5-SESS" => Some(Algorithm::Md5Sess),
            "SHA-256" => Some(Algorithm::Sha256),
            "SHA-256-SESS" => Some(Algorithm::Sha256Sess),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(self) -> bool {
        matches!(self, Algorithm::Md5Sess | Algorithm::Sha256Sess)
    }

    fn hash(self, data: &str) -> String {
        match self {
            Algorithm::Md5 | Algorithm::Md5Sess => format!("{:x}", Md5::digest(data.as_bytes())),
            Algorithm::Sha256 | Algorithm::Sha256Sess => {
                format!("{:x}", Sha256::digest(data.as_bytes()))
            }
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug)]
pub(crate) struct Challenge {
    realm: String,
    nonce: String,
    opaque: Option<String>,
    algorithm: Algorithm,
    /// Only `auth` is supported; `auth-int` alone is treated as absent.
    qop_auth: bool,
}

impl Challenge {
    pub(crate) fn parse(params: &str) -> Result<Self> {
        let params = parse_params(params);

        let nonce = params
            .get("nonce")
            .cloned()
            .ok_or_else(|| crate::error::auth("Digest challenge without a nonce"))?;
        let algorithm = match params.get("algorithm") {
            Some(name) => Algorithm::parse(name).ok_or_else(|| {
                crate::error::auth(format!("unsupported Digest algorithm '{name}'"))
            })?,
            None => Algorithm::Md5,
        };
        let qop_auth = params
            .get("qop")
            .map(|qop| qop.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")))
            .unwrap_or(false);

        Ok(Challenge {
            realm: params.get("realm").cloned().unwrap_or_default(),
            nonce,
            opaque: params.get("opaque").cloned(),
            algorithm,
            qop_auth,
        })
    }

    /// The first offer we can answer. Servers may send one challenge per
    /// algorithm; if none is usable the first offer's error is returned.
    pub(crate) fn select(offers: &[String]) -> Result<Self> {
        let mut first_err = None;
        for offer in offers {
            match Challenge::parse(offer) {
                Ok(challenge) => return Ok(challenge),
                Err(err) => {
                    log::debug!("skipping Digest offer: {err}");
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or_else(|| crate::error::auth("no Digest challenge offered")))
    }

    /// Build the `Authorization` header value.
    pub(crate) fn respond(
        &self,
        creds: &Credentials,
        method: &Method,
        uri: &str,
        cnonce: &str,
        nonce_count: u32,
    ) -> String {
        let alg = self.algorithm;
        let nc = format!("{nonce_count:08x}");

        let mut ha1 = alg.hash(&format!(
            "{}:{}:{}",
            creds.username(),
            self.realm,
            creds.password()
        ));
        if alg.is_session() {
            ha1 = alg.hash(&format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = alg.hash(&format!("{}:{uri}", method.as_str()));

        let response = if self.qop_auth {
            alg.hash(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            alg.hash(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{response}\"",
            quote(creds.username()),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            alg.as_str(),
        );
        if self.qop_auth {
            let _ = write!(header, ", qop=auth, nc={nc}, cnonce=\"{cnonce}\"");
        }
        if let Some(ref opaque) = self.opaque {
            let _ = write!(header, ", opaque=\"{}\"", quote(opaque));
        }
        header
    }
}

/// Escape `"` and `\\` for use inside a quoted-string.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn cnonce() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().fold(String::with_capacity(32), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Split `key=value, key="quoted, value"` pairs. Keys are lowercased.
fn parse_params(s: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = s.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_owned();
        }
        params.insert(key, value);
    }

    params
}
