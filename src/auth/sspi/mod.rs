//! Security package seam for NTLM and Negotiate.
//!
//! The HTTP side of both schemes lives in this crate; producing the tokens
//! for the ambient identity (SSPI on Windows, GSS-API elsewhere) is the job
//! of a [`SecurityProvider`] installed with
//! [`EchoClientBuilder::security_provider`](crate::EchoClientBuilder::security_provider).
//!
//! With the `negotiate` feature on Windows, [`CurrentUser`] is installed by
//! default and authenticates as the logged-in user through SSPI.

use std::fmt;
use std::sync::Arc;

#[cfg(all(windows, feature = "negotiate"))]
mod current_user;

#[cfg(all(windows, feature = "negotiate"))]
pub use self::current_user::CurrentUser;

/// A security package name, also used as the HTTP auth scheme token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Package {
    Ntlm,
    Negotiate,
}

impl Package {
    pub fn as_str(self) -> &'static str {
        match self {
            Package::Ntlm => "NTLM",
            Package::Negotiate => "Negotiate",
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An SSPI style status code.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecurityStatus(pub i32);

impl SecurityStatus {
    pub const NOT_SUPPORTED: SecurityStatus = SecurityStatus(0x8009_0302_u32 as i32);
    pub const NO_CREDENTIALS: SecurityStatus = SecurityStatus(0x8009_030E_u32 as i32);
    pub const LOGON_DENIED: SecurityStatus = SecurityStatus(0x8009_030C_u32 as i32);
    pub const INVALID_TOKEN: SecurityStatus = SecurityStatus(0x8009_0308_u32 as i32);

    fn name(self) -> Option<&'static str> {
        match self {
            SecurityStatus::NOT_SUPPORTED => Some("SEC_E_UNSUPPORTED_FUNCTION"),
            SecurityStatus::NO_CREDENTIALS => Some("SEC_E_NO_CREDENTIALS"),
            SecurityStatus::LOGON_DENIED => Some("SEC_E_LOGON_DENIED"),
            SecurityStatus::INVALID_TOKEN => Some("SEC_E_INVALID_TOKEN"),
            _ => None,
        }
    }
}

impl fmt::Debug for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0 as u32),
            None => write!(f, "0x{:08X}", self.0 as u32),
        }
    }
}

impl std::error::Error for SecurityStatus {}

/// Acquires outbound credentials for the ambient identity.
pub trait SecurityProvider: Send + Sync {
    /// Start a new client context for `package`.
    fn acquire_credentials(
        &self,
        package: Package,
    ) -> Result<Box<dyn SecurityContext>, SecurityStatus>;
}

/// One client-side security context.
pub trait SecurityContext: Send {
    /// Produce the next token for `spn`, given the server's last token.
    ///
    /// Returns the token to send and whether the context is complete.
    fn initialize_context(
        &mut self,
        spn: &str,
        input_token: Option<&[u8]>,
    ) -> Result<(Vec<u8>, bool), SecurityStatus>;
}

/// The provider used when none is installed: every package is unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl SecurityProvider for Unsupported {
    fn acquire_credentials(
        &self,
        package: Package,
    ) -> Result<Box<dyn SecurityContext>, SecurityStatus> {
        log::debug!("no security provider installed for {package}");
        Err(SecurityStatus::NOT_SUPPORTED)
    }
}

/// The provider a client uses when none is installed.
pub(crate) fn default_provider() -> Arc<dyn SecurityProvider> {
    #[cfg(all(windows, feature = "negotiate"))]
    {
        Arc::new(CurrentUser)
    }
    #[cfg(not(all(windows, feature = "negotiate")))]
    {
        Arc::new(Unsupported)
    }
}
