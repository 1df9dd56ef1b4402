use std::sync::{Arc, Mutex};

use authprobe::auth::sspi::{Package, SecurityContext, SecurityProvider, SecurityStatus};
use base64::Engine as _;

pub const NEGOTIATE_TOKEN: &[u8] = b"client-hello";
pub const SERVER_CHALLENGE: &[u8] = b"server-challenge";
pub const AUTHENTICATE_TOKEN: &[u8] = b"client-proof";

/// Stands in for the logged-in user: a two-leg exchange, hello then proof.
#[derive(Clone, Default)]
pub struct FakeIdentity {
    acquired: Arc<Mutex<Vec<Package>>>,
    refuse: bool,
}

impl FakeIdentity {
    pub fn new() -> FakeIdentity {
        FakeIdentity::default()
    }

    /// An identity with no usable credentials.
    pub fn logged_out() -> FakeIdentity {
        FakeIdentity {
            refuse: true,
            ..FakeIdentity::default()
        }
    }

    pub fn acquired(&self) -> Vec<Package> {
        self.acquired.lock().unwrap().clone()
    }
}

impl SecurityProvider for FakeIdentity {
    fn acquire_credentials(
        &self,
        package: Package,
    ) -> Result<Box<dyn SecurityContext>, SecurityStatus> {
        self.acquired.lock().unwrap().push(package);
        if self.refuse {
            return Err(SecurityStatus::NO_CREDENTIALS);
        }
        Ok(Box::new(FakeContext { legs: 0 }))
    }
}

struct FakeContext {
    legs: usize,
}

impl SecurityContext for FakeContext {
    fn initialize_context(
        &mut self,
        spn: &str,
        input_token: Option<&[u8]>,
    ) -> Result<(Vec<u8>, bool), SecurityStatus> {
        assert!(spn.starts_with("HTTP/"), "unexpected SPN {spn}");
        self.legs += 1;
        match input_token {
            None => Ok((NEGOTIATE_TOKEN.to_vec(), false)),
            Some(SERVER_CHALLENGE) => Ok((AUTHENTICATE_TOKEN.to_vec(), true)),
            Some(_) => Err(SecurityStatus::INVALID_TOKEN),
        }
    }
}

pub fn encode(token: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(token)
}

/// What a server should answer to an `Authorization` header for `scheme`
/// (`NTLM` or `Negotiate`): `Ok(None)` to accept, `Ok(Some(token))` to
/// challenge again, `Err` to reject.
pub fn server_step(scheme: &str, authorization: Option<&str>) -> Result<Option<String>, ()> {
    let Some(value) = authorization else {
        return Ok(Some(String::new()));
    };
    let Some(token) = value.strip_prefix(scheme).map(str::trim) else {
        return Err(());
    };
    if token == encode(NEGOTIATE_TOKEN) {
        Ok(Some(encode(SERVER_CHALLENGE)))
    } else if token == encode(AUTHENTICATE_TOKEN) {
        Ok(None)
    } else {
        Err(())
    }
}
