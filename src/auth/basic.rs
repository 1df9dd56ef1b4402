use std::future::Future;

use base64::prelude::BASE64_STANDARD;
use base64::write::EncoderWriter;
use http::HeaderValue;

use crate::client::{Request, Response};
use crate::scheme::Credentials;
use crate::Result;

pub(super) async fn execute<F, Fut>(
    mut request: Request,
    creds: &Credentials,
    execute_fn: &mut F,
) -> Result<Response>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let header = basic_auth(creds.username(), Some(creds.password()));
    request
        .headers_mut()
        .insert(http::header::AUTHORIZATION, header);

    log::debug!("sending Basic credentials for {}", creds.username());
    execute_fn(request).await
}

pub(crate) fn basic_auth<U, P>(username: U, password: Option<P>) -> HeaderValue
where
    U: std::fmt::Display,
    P: std::fmt::Display,
{
    use std::io::Write;

    let mut buf = b"Basic ".to_vec();
    {
        let mut encoder = EncoderWriter::new(&mut buf, &BASE64_STANDARD);
        let _ = write!(encoder, "{username}:");
        if let Some(password) = password {
            let _ = write!(encoder, "{password}");
        }
    }
    let mut header = HeaderValue::from_bytes(&buf).expect("base64 is always valid HeaderValue");
    header.set_sensitive(true);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_username_and_password() {
        let header = basic_auth("clark", Some("querty"));
        assert_eq!(header, "Basic Y2xhcms6cXVlcnR5");
        assert!(header.is_sensitive());
    }

    #[test]
    fn encodes_empty_password() {
        let header = basic_auth("wcf-test", None::<&str>);
        assert_eq!(header, "Basic d2NmLXRlc3Q6");
    }
}
