//! TLS configuration for transport security.
//!
//! Trust starts from the Mozilla root set bundled by `webpki-roots`. Test
//! services usually present a certificate from their own root, which can be
//! added as PEM.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::Result;

#[derive(Clone, Debug, Default)]
pub(crate) struct TlsOptions {
    pub(crate) root_certs: Vec<CertificateDer<'static>>,
    pub(crate) accept_invalid_certs: bool,
}

impl TlsOptions {
    /// Parse every certificate in a PEM bundle.
    pub(crate) fn add_pem(&mut self, pem: &[u8]) -> Result<()> {
        let mut reader = pem;
        let mut found = 0;
        for cert in rustls_pemfile::certs(&mut reader) {
            self.root_certs.push(cert.map_err(crate::error::builder)?);
            found += 1;
        }
        if found == 0 {
            return Err(crate::error::builder("no certificates found in PEM"));
        }
        Ok(())
    }

    pub(crate) fn build(&self) -> Result<ClientConfig> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(crate::error::builder)?;

        if self.accept_invalid_certs {
            log::warn!("TLS certificate verification is disabled");
            return Ok(builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth());
        }

        let mut roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        for cert in &self.root_certs {
            roots.add(cert.clone()).map_err(crate::error::builder)?;
        }

        Ok(builder.with_root_certificates(roots).with_no_client_auth())
    }
}

#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        TlsOptions::default().build().unwrap();
    }

    #[test]
    fn insecure_config_builds() {
        let opts = TlsOptions {
            accept_invalid_certs: true,
            ..TlsOptions::default()
        };
        opts.build().unwrap();
    }

    #[test]
    fn pem_without_certificates_is_rejected() {
        let mut opts = TlsOptions::default();
        let err = opts.add_pem(b"not a certificate").unwrap_err();
        assert!(err.is_builder());
        assert!(opts.root_certs.is_empty());
    }
}
