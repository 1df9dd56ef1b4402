use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use url::Url;

/// A `Result` alias where the `Err` case is `authprobe::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The Errors that may occur while configuring or running an echo round trip.
///
/// Note: Errors may include the full URL used to make the `Request`. If the
/// URL contains sensitive information (e.g. an API key as a query
/// parameter), be sure to remove it ([`without_url`](Error::without_url)).
pub struct Error {
    inner: Box<Inner>,
}

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Add a url related to this error (overwriting any existing)
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information)
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if the error came from building a client or endpoint.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the scenario configuration was rejected before any
    /// request was sent.
    pub fn is_config(&self) -> bool {
        matches!(self.inner.kind, Kind::Config)
    }

    /// Returns true if the error is related to connecting.
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    /// Returns true if the server answered with a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status(_))
    }

    /// Returns true if an authentication exchange could not be completed.
    pub fn is_auth(&self) -> bool {
        matches!(self.inner.kind, Kind::Auth)
    }

    /// Returns true if the echoed body didn't match what was sent.
    pub fn is_mismatch(&self) -> bool {
        matches!(self.inner.kind, Kind::Mismatch)
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Status(code) => Some(code),
            _ => None,
        }
    }

    /// Render this error with every source in its chain, separated by `: `.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = StdError::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("authprobe::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::Config => f.write_str("invalid scenario configuration")?,
            Kind::Connect => f.write_str("error trying to connect")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Body => f.write_str("error reading response body")?,
            Kind::Auth => f.write_str("authentication failed")?,
            Kind::Timeout => f.write_str("request timed out")?,
            Kind::Mismatch => f.write_str("echo mismatch")?,
            Kind::Status(ref code) => {
                let prefix = if code.is_client_error() {
                    "HTTP status client error"
                } else {
                    debug_assert!(code.is_server_error() || code.is_redirection());
                    "HTTP status server error"
                };
                if let Some(reason) = code.canonical_reason() {
                    write!(f, "{prefix} ({} {})", code.as_u16(), reason)?;
                } else {
                    write!(f, "{prefix} ({})", code.as_u16())?;
                }
            }
        };

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({})", url)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    Config,
    Connect,
    Request,
    Body,
    Auth,
    Timeout,
    Mismatch,
    Status(StatusCode),
}

// constructors

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn config<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Config, Some(e))
}

pub(crate) fn connect<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connect, Some(e))
}

pub(crate) fn request<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Request, Some(e))
}

pub(crate) fn body<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Body, Some(e))
}

pub(crate) fn auth<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Auth, Some(e))
}

pub(crate) fn mismatch<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Mismatch, Some(e))
}

pub(crate) fn timeout() -> Error {
    Error::new(Kind::Timeout, Some(TimedOut))
}

pub(crate) fn status_code(url: Url, status: StatusCode) -> Error {
    Error::new(Kind::Status(status), None::<Error>).with_url(url)
}

#[derive(Debug)]
pub(crate) struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl StdError for TimedOut {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_source_chain() {
        let root = Error::new(Kind::Request, None::<Error>);
        assert!(root.source().is_none());

        let link = super::auth(root);
        assert!(link.source().is_some());
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn chain_includes_sources() {
        let err = super::connect(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(err.is_connect());
        assert_eq!(err.chain(), "error trying to connect: connection refused");
    }

    #[test]
    fn status_error_mentions_code() {
        let url = Url::parse("https://localhost/BasicAuth.svc/https").unwrap();
        let err = super::status_code(url, StatusCode::UNAUTHORIZED);
        assert!(err.is_status());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(
            err.to_string(),
            "HTTP status client error (401 Unauthorized) for url (https://localhost/BasicAuth.svc/https)"
        );
    }

    #[test]
    fn is_timeout() {
        let err = super::timeout();
        assert!(err.is_timeout());
        assert_eq!(err.chain(), "request timed out: operation timed out");
    }
}
