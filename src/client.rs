use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::auth::sspi::{self, SecurityProvider};
use crate::auth::{self, Authenticator};
use crate::scheme::{CredentialScheme, Credentials, EndpointAddress, SecurityMode};
use crate::tls::TlsOptions;
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for an echo service protected by one credential type.
///
/// The security mode, credential type and credentials are fixed when the
/// client is built, the same way a binding is configured before a channel
/// is opened. `EchoClient` holds a connection pool internally, so cloning
/// it is cheap.
#[derive(Clone)]
pub struct EchoClient {
    inner: Arc<ClientRef>,
}

/// A `EchoClientBuilder` can be used to create an `EchoClient` with custom
/// configuration.
#[must_use]
pub struct EchoClientBuilder {
    config: Config,
}

struct Config {
    security: SecurityMode,
    credential_type: Option<CredentialScheme>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    tls: TlsOptions,
    security_provider: Option<Arc<dyn SecurityProvider>>,
    error: Option<Error>,
}

struct ClientRef {
    hyper: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    security: SecurityMode,
    auth: Option<Authenticator>,
    timeout: Option<Duration>,
}

impl Default for EchoClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoClientBuilder {
    /// Constructs a new `EchoClientBuilder`.
    ///
    /// Defaults to transport security, no credential type and a 30 second
    /// timeout.
    pub fn new() -> EchoClientBuilder {
        EchoClientBuilder {
            config: Config {
                security: SecurityMode::Transport,
                credential_type: None,
                credentials: None,
                timeout: Some(DEFAULT_TIMEOUT),
                connect_timeout: None,
                tls: TlsOptions::default(),
                security_provider: None,
                error: None,
            },
        }
    }

    /// Returns an `EchoClient` that uses this configuration.
    ///
    /// # Errors
    ///
    /// Fails if a Basic or Digest client has no username, or if the TLS
    /// configuration can't be built.
    pub fn build(self) -> Result<EchoClient> {
        let config = self.config;

        if let Some(err) = config.error {
            return Err(err);
        }

        let auth = match config.credential_type {
            None => None,
            Some(scheme) if scheme.requires_credentials() => {
                let creds = config
                    .credentials
                    .filter(|creds| !creds.is_empty())
                    .ok_or_else(|| {
                        crate::error::config(format!(
                            "{} authentication requires a username and password",
                            scheme.display_name()
                        ))
                    })?;
                if scheme == CredentialScheme::Basic {
                    Some(Authenticator::Basic(creds))
                } else {
                    Some(Authenticator::Digest(creds))
                }
            }
            Some(scheme) => {
                if config.credentials.is_some() {
                    log::debug!(
                        "ignoring explicit credentials, {} uses the ambient identity",
                        scheme.display_name()
                    );
                }
                let provider = config
                    .security_provider
                    .unwrap_or_else(sspi::default_provider);
                Some(Authenticator::Ambient { scheme, provider })
            }
        };

        let tls = config.tls.build()?;

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(config.connect_timeout);

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let hyper = HyperClient::builder(TokioExecutor::new()).build(https);

        Ok(EchoClient {
            inner: Arc::new(ClientRef {
                hyper,
                security: config.security,
                auth,
                timeout: config.timeout,
            }),
        })
    }

    /// Where security is applied. Defaults to `Transport`.
    pub fn security(mut self, mode: SecurityMode) -> EchoClientBuilder {
        self.config.security = mode;
        self
    }

    /// The credential type presented to the service.
    pub fn credential_type(mut self, scheme: CredentialScheme) -> EchoClientBuilder {
        self.config.credential_type = Some(scheme);
        self
    }

    /// Username and password for Basic and Digest.
    ///
    /// Ignored for NTLM and Windows, which authenticate with the ambient
    /// identity.
    pub fn credentials(mut self, credentials: Credentials) -> EchoClientBuilder {
        self.config.credentials = Some(credentials);
        self
    }

    /// Bound the whole echo call, including every authentication leg.
    ///
    /// Default is 30 seconds. Pass `None` to disable.
    pub fn timeout(mut self, timeout: Option<Duration>) -> EchoClientBuilder {
        self.config.timeout = timeout;
        self
    }

    /// Set a timeout for only the connect phase.
    pub fn connect_timeout(mut self, timeout: Duration) -> EchoClientBuilder {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Trust every certificate in a PEM bundle in addition to the built-in
    /// roots.
    pub fn add_root_certificate_pem(mut self, pem: &[u8]) -> EchoClientBuilder {
        if let Err(err) = self.config.tls.add_pem(pem) {
            self.config.error = Some(err);
        }
        self
    }

    /// Controls the use of certificate validation.
    ///
    /// # Warning
    ///
    /// Any certificate for any site will be trusted. Only use this against
    /// throwaway test services.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> EchoClientBuilder {
        self.config.tls.accept_invalid_certs = accept;
        self
    }

    /// Install the provider that produces NTLM and Negotiate tokens for the
    /// ambient identity.
    pub fn security_provider(mut self, provider: Arc<dyn SecurityProvider>) -> EchoClientBuilder {
        self.config.security_provider = Some(provider);
        self
    }
}

impl EchoClient {
    pub fn builder() -> EchoClientBuilder {
        EchoClientBuilder::new()
    }

    /// The configured credential type, if any.
    pub fn credential_type(&self) -> Option<CredentialScheme> {
        self.inner.auth.as_ref().map(Authenticator::scheme)
    }

    /// POST `payload` to `endpoint` and return the body the service sent
    /// back.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint doesn't match the security mode, on any
    /// connection, TLS or authentication failure, on timeout, or if the
    /// final response isn't a success status.
    pub async fn echo(&self, endpoint: &EndpointAddress, payload: &str) -> Result<String> {
        let url = endpoint.url().clone();
        let expected = self.inner.security.url_scheme();
        if url.scheme() != expected {
            return Err(crate::error::config(format!(
                "{:?} security requires an {expected} endpoint",
                self.inner.security
            ))
            .with_url(url));
        }

        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| crate::error::builder(e).with_url(url.clone()))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        let request = Request {
            method: Method::POST,
            url: url.clone(),
            uri,
            headers,
            body: Bytes::copy_from_slice(payload.as_bytes()),
        };

        let response = match self.inner.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.inner.send(request))
                .await
                .map_err(|_| crate::error::timeout().with_url(url.clone()))??,
            None => self.inner.send(request).await?,
        };

        if !response.status.is_success() {
            return Err(crate::error::status_code(url, response.status));
        }

        String::from_utf8(response.body.to_vec()).map_err(|e| crate::error::body(e).with_url(url))
    }
}

impl ClientRef {
    async fn send(&self, request: Request) -> Result<Response> {
        match self.auth {
            Some(ref auth) => {
                auth::execute_with_auth(request, auth, move |req| self.execute_once(req)).await
            }
            None => self.execute_once(request).await,
        }
    }

    async fn execute_once(&self, request: Request) -> Result<Response> {
        let url = request.url.clone();
        let res = self.hyper.request(request.into_http()).await.map_err(|e| {
            let err = if e.is_connect() {
                crate::error::connect(e)
            } else {
                crate::error::request(e)
            };
            err.with_url(url.clone())
        })?;

        let (parts, body) = res.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| crate::error::body(e).with_url(url.clone()))?
            .to_bytes();

        log::trace!("{} answered {}", url, parts.status);

        Ok(Response {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

impl fmt::Debug for EchoClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EchoClient")
            .field("security", &self.inner.security)
            .field("auth", &self.inner.auth)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl fmt::Debug for EchoClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EchoClientBuilder")
            .field("security", &self.config.security)
            .field("credential_type", &self.config.credential_type)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}

/// A fully buffered request that can be replayed for each authentication
/// leg.
#[derive(Clone, Debug)]
pub(crate) struct Request {
    method: Method,
    url: Url,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub(crate) fn method(&self) -> &Method {
        &self.method
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn uri(&self) -> &Uri {
        &self.uri
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn into_http(self) -> http::Request<Full<Bytes>> {
        let mut req = http::Request::new(Full::new(self.body));
        *req.method_mut() = self.method;
        *req.uri_mut() = self.uri;
        *req.headers_mut() = self.headers;
        req
    }
}

#[derive(Debug)]
pub(crate) struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
