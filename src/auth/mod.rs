//! Authentication exchanges for each credential scheme.
//!
//! Basic is sent preemptively. Digest, NTLM and Negotiate answer the
//! server's `WWW-Authenticate` challenge and replay the request, so every
//! request handed to these functions must be cheaply clonable.

mod basic;
mod digest;
mod negotiate;
pub mod sspi;

use std::future::Future;
use std::sync::Arc;

use base64::Engine as _;
use http::HeaderMap;

use crate::client::{Request, Response};
use crate::scheme::{CredentialScheme, Credentials};
use crate::Result;

use self::sspi::SecurityProvider;

/// How a client authenticates, fixed when the client is built.
#[derive(Clone)]
pub(crate) enum Authenticator {
    Basic(Credentials),
    Digest(Credentials),
    /// NTLM or Negotiate with the ambient identity. Explicit credentials
    /// never reach this variant.
    Ambient {
        scheme: CredentialScheme,
        provider: Arc<dyn SecurityProvider>,
    },
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authenticator::Basic(creds) => f.debug_tuple("Basic").field(creds).finish(),
            Authenticator::Digest(creds) => f.debug_tuple("Digest").field(creds).finish(),
            Authenticator::Ambient { scheme, .. } => {
                f.debug_struct("Ambient").field("scheme", scheme).finish()
            }
        }
    }
}

impl Authenticator {
    pub(crate) fn scheme(&self) -> CredentialScheme {
        match self {
            Authenticator::Basic(_) => CredentialScheme::Basic,
            Authenticator::Digest(_) => CredentialScheme::Digest,
            Authenticator::Ambient { scheme, .. } => *scheme,
        }
    }
}

/// Execute `request`, performing whatever authentication exchange the
/// authenticator calls for. `execute_fn` sends a single HTTP request.
pub(crate) async fn execute_with_auth<F, Fut>(
    request: Request,
    auth: &Authenticator,
    mut execute_fn: F,
) -> Result<Response>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    match auth {
        Authenticator::Basic(creds) => basic::execute(request, creds, &mut execute_fn).await,
        Authenticator::Digest(creds) => digest::execute(request, creds, &mut execute_fn).await,
        Authenticator::Ambient { scheme, provider } => {
            negotiate::execute(request, *scheme, provider.as_ref(), &mut execute_fn).await
        }
    }
}

/// The challenges a server offered in its `WWW-Authenticate` headers.
///
/// For the token based schemes: `Some(None)` is a bare challenge,
/// `Some(Some(token))` carries a decoded server token.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Challenges {
    pub(crate) negotiate: Option<Option<Vec<u8>>>,
    pub(crate) ntlm: Option<Option<Vec<u8>>>,
    pub(crate) basic: bool,
    /// Raw parameters following `Digest `, one entry per offered challenge
    /// in header order.
    pub(crate) digest: Vec<String>,
}

pub(crate) fn parse_www_authenticate(headers: &HeaderMap) -> Challenges {
    let mut challenges = Challenges::default();

    for value in headers.get_all(http::header::WWW_AUTHENTICATE) {
        let Ok(value_str) = value.to_str() else {
            continue;
        };
        let trimmed = value_str.trim();
        let (scheme, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((scheme, rest)) => (scheme, rest.trim()),
            None => (trimmed, ""),
        };

        if scheme.eq_ignore_ascii_case("negotiate") {
            challenges.negotiate = Some(decode_token(rest));
        } else if scheme.eq_ignore_ascii_case("ntlm") {
            challenges.ntlm = Some(decode_token(rest));
        } else if scheme.eq_ignore_ascii_case("basic") {
            challenges.basic = true;
        } else if scheme.eq_ignore_ascii_case("digest") && !rest.is_empty() {
            challenges.digest.push(rest.to_owned());
        }
    }

    challenges
}

fn decode_token(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(s).ok()
}
