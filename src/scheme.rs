//! Credential types, security modes and endpoint addresses.

use std::fmt;
use std::str::FromStr;

use url::Url;

/// The authentication scheme a client presents to the echo service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum CredentialScheme {
    /// `Authorization: Basic`, explicit username and password.
    Basic,
    /// HTTP Digest, explicit username and password.
    Digest,
    /// NTLM using the ambient identity.
    Ntlm,
    /// Negotiate (Kerberos/SPNEGO, falling back to NTLM) using the ambient
    /// identity.
    Windows,
}

impl CredentialScheme {
    /// Every scheme, in the order scenarios are usually reported.
    pub const ALL: [CredentialScheme; 4] = [
        CredentialScheme::Basic,
        CredentialScheme::Digest,
        CredentialScheme::Ntlm,
        CredentialScheme::Windows,
    ];

    /// Whether an explicit username/password pair must be supplied.
    ///
    /// NTLM and Windows authenticate as whoever is running the process.
    pub fn requires_credentials(self) -> bool {
        matches!(self, CredentialScheme::Basic | CredentialScheme::Digest)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CredentialScheme::Basic => "basic",
            CredentialScheme::Digest => "digest",
            CredentialScheme::Ntlm => "ntlm",
            CredentialScheme::Windows => "windows",
        }
    }

    /// Human readable name, e.g. `Basic` or `NTLM`.
    pub fn display_name(self) -> &'static str {
        match self {
            CredentialScheme::Basic => "Basic",
            CredentialScheme::Digest => "Digest",
            CredentialScheme::Ntlm => "NTLM",
            CredentialScheme::Windows => "Windows",
        }
    }
}

impl fmt::Display for CredentialScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialScheme {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(CredentialScheme::Basic),
            "digest" => Ok(CredentialScheme::Digest),
            "ntlm" => Ok(CredentialScheme::Ntlm),
            "windows" | "negotiate" => Ok(CredentialScheme::Windows),
            other => Err(crate::error::builder(format!(
                "unknown credential scheme '{other}'"
            ))),
        }
    }
}

/// Where security is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SecurityMode {
    /// Plain HTTP. Only meant for loopback test services.
    None,
    /// TLS at the transport layer; endpoints must be `https`.
    #[default]
    Transport,
}

impl SecurityMode {
    pub(crate) fn url_scheme(self) -> &'static str {
        match self {
            SecurityMode::None => "http",
            SecurityMode::Transport => "https",
        }
    }
}

/// A username/password pair for Basic and Digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.username.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The address of one echo service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointAddress(Url);

impl EndpointAddress {
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(crate::error::builder("endpoint address is empty"));
        }
        let url = Url::parse(s).map_err(crate::error::builder)?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> crate::Result<Self> {
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(crate::error::builder(format!(
                "endpoint address '{url}' has no host"
            )));
        }
        Ok(EndpointAddress(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EndpointAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        EndpointAddress::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_requirement_follows_scheme() {
        assert!(CredentialScheme::Basic.requires_credentials());
        assert!(CredentialScheme::Digest.requires_credentials());
        assert!(!CredentialScheme::Ntlm.requires_credentials());
        assert!(!CredentialScheme::Windows.requires_credentials());
    }

    #[test]
    fn parse_scheme() {
        assert_eq!("Basic".parse::<CredentialScheme>().unwrap(), CredentialScheme::Basic);
        assert_eq!("NTLM".parse::<CredentialScheme>().unwrap(), CredentialScheme::Ntlm);
        assert_eq!(
            "negotiate".parse::<CredentialScheme>().unwrap(),
            CredentialScheme::Windows
        );
        assert!("bearer".parse::<CredentialScheme>().is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("wcf-test", "wcfSaysHell0World!");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("wcf-test"));
        assert!(!debug.contains("wcfSaysHell0World!"));
    }

    #[test]
    fn endpoint_rejects_empty_and_relative() {
        assert!(EndpointAddress::parse("").unwrap_err().is_builder());
        assert!(EndpointAddress::parse("   ").is_err());
        assert!(EndpointAddress::parse("/BasicAuth.svc/https").is_err());
        assert!(EndpointAddress::parse("mailto:someone@example.com").is_err());

        let endpoint = EndpointAddress::parse("https://localhost:44300/BasicAuth.svc/https").unwrap();
        assert_eq!(endpoint.url().host_str(), Some("localhost"));
    }
}
