//! HTTP Negotiate (RFC 4559) and NTLM over HTTP.
//!
//! Both are connection-oriented multi-leg exchanges: the client answers each
//! `401` challenge with the next token from its security context until the
//! server accepts or stops challenging.

use std::future::Future;

use base64::Engine as _;
use http::{HeaderValue, StatusCode};

use super::parse_www_authenticate;
use super::sspi::{Package, SecurityProvider};
use crate::client::{Request, Response};
use crate::scheme::CredentialScheme;
use crate::Result;

const MAX_ROUNDTRIPS: usize = 5;

/// Derive the Service Principal Name (SPN) from a URL.
///
/// For HTTP authentication, the SPN format is "HTTP/<hostname>".
///
/// # Examples
/// ```ignore
/// assert_eq!(derive_spn("http://example.com/path"), Ok("HTTP/example.com"));
/// assert_eq!(derive_spn("https://server.corp.com:8080/"), Ok("HTTP/server.corp.com"));
/// ```
pub(crate) fn derive_spn(url: &url::Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| crate::error::auth("URL has no host for SPN"))?;

    Ok(format!("HTTP/{}", host))
}

pub(super) async fn execute<F, Fut>(
    request: Request,
    scheme: CredentialScheme,
    provider: &dyn SecurityProvider,
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

    // Negotiate falls back to NTLM when that's all the server offers; the
    // NTLM scheme never upgrades to Negotiate.
    let package = match scheme {
        CredentialScheme::Windows if challenges.negotiate.is_some() => Package::Negotiate,
        CredentialScheme::Windows | CredentialScheme::Ntlm if challenges.ntlm.is_some() => {
            Package::Ntlm
        }
        _ => {
            log::debug!("401 without a challenge usable by {}", scheme.display_name());
            return Ok(response);
        }
    };

    let spn = derive_spn(original_request.url())?;
    token_exchange(&original_request, package, &spn, provider, execute_fn).await
}

async fn token_exchange<F, Fut>(
    original_request: &Request,
    package: Package,
    spn: &str,
    provider: &dyn SecurityProvider,
    execute_fn: &mut F,
) -> Result<Response>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let mut ctx = provider.acquire_credentials(package).map_err(|status| {
        crate::error::auth(format!("acquiring {package} credentials failed: {status}"))
    })?;

    let mut input_token: Option<Vec<u8>> = None;
    let mut round = 0;

    loop {
        if round >= MAX_ROUNDTRIPS {
            return Err(crate::error::auth("Too many authentication round-trips"));
        }

        let (output_token, is_complete) = ctx
            .initialize_context(spn, input_token.as_deref())
            .map_err(|status| {
                crate::error::auth(format!("initializing {package} context failed: {status}"))
            })?;

        let token_base64 = base64::engine::general_purpose::STANDARD.encode(&output_token);

        let mut auth_request = original_request.clone();
        let mut header = HeaderValue::from_str(&format!("{} {}", package, token_base64))
            .map_err(|_| crate::error::auth("Invalid authorization header"))?;
        header.set_sensitive(true);
        auth_request
            .headers_mut()
            .insert(http::header::AUTHORIZATION, header);

        log::debug!("{package} leg {} for {spn}", round + 1);
        let response = execute_fn(auth_request).await?;

        let challenges = parse_www_authenticate(response.headers());
        let server_token = match package {
            Package::Negotiate => challenges.negotiate,
            Package::Ntlm => challenges.ntlm,
        };
        let server_token = server_token.flatten();

        match response.status() {
            StatusCode::UNAUTHORIZED => match server_token {
                Some(token) if !is_complete => {
                    input_token = Some(token);
                    round += 1;
                }
                _ => {
                    log::debug!("{package} credentials rejected by server");
                    return Ok(response);
                }
            },
            status if status.is_success() => {
                if let Some(token) = server_token {
                    if !is_complete {
                        // mutual auth
                        ctx.initialize_context(spn, Some(&token)).map_err(|status| {
                            crate::error::auth(format!(
                                "verifying {package} server token failed: {status}"
                            ))
                        })?;
                    }
                }
                return Ok(response);
            }
            _ => return Ok(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_spn() {
        let url = url::Url::parse("http://example.com/path").unwrap();
        assert_eq!(derive_spn(&url).unwrap(), "HTTP/example.com");

        let url = url::Url::parse("https://server.corp.com:8080/api").unwrap();
        assert_eq!(derive_spn(&url).unwrap(), "HTTP/server.corp.com");
    }
}
