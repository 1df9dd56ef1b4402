#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # authprobe
//!
//! A conformance harness for HTTP client credential types.
//!
//! Each [`Scenario`] configures an [`EchoClient`] for one scheme (Basic,
//! Digest, NTLM or Windows/Negotiate) over TLS, performs a single echo round
//! trip against that scheme's endpoint, and yields a [`ScenarioResult`]:
//! success, or failure with every diagnostic collected along the way.
//! Nothing that goes wrong inside a scenario escapes it.
//!
//! ```no_run
//! # async fn run() -> authprobe::Result<()> {
//! use authprobe::{CredentialScheme, Credentials, EndpointAddress};
//!
//! let endpoint = EndpointAddress::parse("https://localhost:44300/BasicAuth.svc/https")?;
//! let creds = Credentials::new("wcf-test", "wcfSaysHell0World!");
//!
//! let result = authprobe::run_scenario(CredentialScheme::Basic, &endpoint, Some(&creds)).await;
//! assert!(result.success, "{}", result.message());
//! # Ok(())
//! # }
//! ```
//!
//! ## Ambient identity
//!
//! NTLM and Windows authenticate as the current user. The tokens come from
//! a [`SecurityProvider`](auth::sspi::SecurityProvider) installed on the
//! [`Runner`] or [`EchoClientBuilder`]; without one those scenarios fail
//! with an unsupported-package diagnostic.
//!
//! ## Optional Features
//!
//! - **cli** *(enabled by default)*: the `authprobe` binary.
//! - **json**: [`Report::to_json`].

pub use http::StatusCode;
pub use url::Url;

pub use self::client::{EchoClient, EchoClientBuilder};
pub use self::endpoints::Endpoints;
pub use self::error::{Error, Result};
pub use self::report::Report;
pub use self::scenario::{run_scenario, Runner, Scenario, ScenarioResult, DEFAULT_PAYLOAD};
pub use self::scheme::{CredentialScheme, Credentials, EndpointAddress, SecurityMode};

pub mod auth;
mod client;
mod endpoints;
mod error;
mod report;
mod scenario;
mod scheme;
mod tls;
