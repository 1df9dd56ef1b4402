//! The directory of echo services, one per credential scheme.

use crate::scheme::{CredentialScheme, EndpointAddress};
use crate::Result;

/// One echo service address per credential scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub basic: EndpointAddress,
    pub digest: EndpointAddress,
    pub ntlm: EndpointAddress,
    pub windows: EndpointAddress,
}

impl Endpoints {
    /// Derive every address from the `host[:port][/path]` the test services
    /// are hosted under.
    ///
    /// ```
    /// let endpoints = authprobe::Endpoints::from_base_address("localhost:44300").unwrap();
    /// assert_eq!(
    ///     endpoints.basic.as_str(),
    ///     "https://localhost:44300/BasicAuth.svc/https"
    /// );
    /// ```
    pub fn from_base_address(base: &str) -> Result<Endpoints> {
        let base = base.trim();
        let base = match base.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => rest,
            Some((scheme, _)) => {
                return Err(crate::error::builder(format!(
                    "base address must be host[:port][/path] or https://, got a {scheme}:// address"
                )));
            }
            None => base,
        };
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            return Err(crate::error::builder("base address is empty"));
        }

        let address = |service: &str| {
            EndpointAddress::parse(&format!("https://{base}/{service}.svc/https"))
        };

        Ok(Endpoints {
            basic: address("BasicAuth")?,
            digest: address("DigestAuth")?,
            ntlm: address("NtlmAuth")?,
            windows: address("WindowsAuth")?,
        })
    }

    pub fn address(&self, scheme: CredentialScheme) -> &EndpointAddress {
        match scheme {
            CredentialScheme::Basic => &self.basic,
            CredentialScheme::Digest => &self.digest,
            CredentialScheme::Ntlm => &self.ntlm,
            CredentialScheme::Windows => &self.windows,
        }
    }

    /// Replace the address for one scheme.
    pub fn set(&mut self, scheme: CredentialScheme, address: EndpointAddress) {
        match scheme {
            CredentialScheme::Basic => self.basic = address,
            CredentialScheme::Digest => self.digest = address,
            CredentialScheme::Ntlm => self.ntlm = address,
            CredentialScheme::Windows => self.windows = address,
        }
    }
}
