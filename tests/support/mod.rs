pub mod server;

// Fake ambient-identity provider for the NTLM/Negotiate tests.
#[allow(unused)]
pub mod provider;
