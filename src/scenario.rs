//! Authentication scenarios and the runner that verifies them.
//!
//! A scenario exercises exactly one credential scheme against its own echo
//! endpoint. Whatever goes wrong while configuring the client or during the
//! round trip is collected as a diagnostic line; nothing escapes
//! [`Runner::run`], which always produces a [`ScenarioResult`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use crate::auth::sspi::SecurityProvider;
use crate::client::{EchoClient, EchoClientBuilder};
use crate::endpoints::Endpoints;
use crate::scheme::{CredentialScheme, Credentials, EndpointAddress, SecurityMode};

/// The payload sent when a scenario doesn't set its own.
pub const DEFAULT_PAYLOAD: &str = "Hello";

/// One end-to-end check of a single credential scheme.
#[derive(Clone, Debug)]
pub struct Scenario {
    name: String,
    scheme: CredentialScheme,
    endpoint: EndpointAddress,
    credentials: Option<Credentials>,
    known_issue: Option<u32>,
    payload: String,
}

impl Scenario {
    pub fn new(scheme: CredentialScheme, endpoint: EndpointAddress) -> Scenario {
        let name = match scheme {
            CredentialScheme::Basic => "BasicAuthentication",
            CredentialScheme::Digest => "DigestAuthentication",
            CredentialScheme::Ntlm => "NtlmAuthentication",
            CredentialScheme::Windows => "WindowsAuthentication",
        };
        Scenario {
            name: name.to_owned(),
            scheme,
            endpoint,
            credentials: None,
            known_issue: None,
            payload: DEFAULT_PAYLOAD.to_owned(),
        }
    }

    /// The four standard scenarios. `credentials` are attached to Basic and
    /// Digest only.
    pub fn standard(endpoints: &Endpoints, credentials: &Credentials) -> Vec<Scenario> {
        CredentialScheme::ALL
            .iter()
            .map(|&scheme| {
                let scenario = Scenario::new(scheme, endpoints.address(scheme).clone());
                if scheme.requires_credentials() {
                    scenario.with_credentials(credentials.clone())
                } else {
                    scenario
                }
            })
            .collect()
    }

    /// Tag the scenario with the defect tracked against its scheme: #69 for
    /// Basic and Digest, #5 for NTLM, #6 for Windows.
    pub fn with_tracked_issue(self) -> Scenario {
        let id = tracked_issue(self.scheme);
        self.known_issue(id)
    }

    pub fn named(mut self, name: impl Into<String>) -> Scenario {
        self.name = name.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Scenario {
        self.credentials = Some(credentials);
        self
    }

    /// Tag this scenario as expected to fail because of a tracked defect.
    ///
    /// A tagged failure doesn't fail the [`Report`](crate::Report).
    pub fn known_issue(mut self, id: u32) -> Scenario {
        self.known_issue = Some(id);
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Scenario {
        self.payload = payload.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> CredentialScheme {
        self.scheme
    }

    pub fn endpoint(&self) -> &EndpointAddress {
        &self.endpoint
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn issue(&self) -> Option<u32> {
        self.known_issue
    }
}

fn tracked_issue(scheme: CredentialScheme) -> u32 {
    match scheme {
        CredentialScheme::Basic | CredentialScheme::Digest => 69,
        CredentialScheme::Ntlm => 5,
        CredentialScheme::Windows => 6,
    }
}

/// The verdict of one scenario run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ScenarioResult {
    pub name: String,
    pub scheme: CredentialScheme,
    pub endpoint: String,
    /// `true` iff `diagnostics` is empty.
    pub success: bool,
    pub diagnostics: Vec<String>,
    pub known_issue: Option<u32>,
    #[cfg_attr(feature = "json", serde(skip))]
    pub elapsed: Duration,
}

impl ScenarioResult {
    fn new(scenario: &Scenario, diagnostics: Vec<String>, elapsed: Duration) -> ScenarioResult {
        ScenarioResult {
            name: scenario.name.clone(),
            scheme: scenario.scheme,
            endpoint: scenario.endpoint.to_string(),
            success: diagnostics.is_empty(),
            diagnostics,
            known_issue: scenario.known_issue,
            elapsed,
        }
    }

    /// Every diagnostic, one per line.
    pub fn diagnostics_text(&self) -> String {
        self.diagnostics.join("\n")
    }

    /// A single aggregated message for the whole scenario.
    pub fn message(&self) -> String {
        if self.success {
            format!("Test Case: {} passed", self.name)
        } else {
            format!(
                "Test Case: {} FAILED with the following errors: {}",
                self.name,
                self.diagnostics_text()
            )
        }
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Runs scenarios with one shared transport configuration.
///
/// Scenarios share nothing mutable: every run builds its own client.
#[derive(Clone)]
pub struct Runner {
    security: SecurityMode,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    root_certs: Vec<Vec<u8>>,
    accept_invalid_certs: bool,
    security_provider: Option<Arc<dyn SecurityProvider>>,
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new()
    }
}

impl Runner {
    /// Transport security, 30 second timeout, built-in roots.
    pub fn new() -> Runner {
        Runner {
            security: SecurityMode::Transport,
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: None,
            root_certs: Vec::new(),
            accept_invalid_certs: false,
            security_provider: None,
        }
    }

    pub fn security(mut self, mode: SecurityMode) -> Runner {
        self.security = mode;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Runner {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Runner {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn add_root_certificate_pem(mut self, pem: impl Into<Vec<u8>>) -> Runner {
        self.root_certs.push(pem.into());
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Runner {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn security_provider(mut self, provider: Arc<dyn SecurityProvider>) -> Runner {
        self.security_provider = Some(provider);
        self
    }

    /// Run one scenario to completion.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        log::debug!("{}: running against {}", scenario.name, scenario.endpoint);

        let diagnostics = match AssertUnwindSafe(self.attempt(scenario))
            .catch_unwind()
            .await
        {
            Ok(diagnostics) => diagnostics,
            Err(panic) => vec![format!(
                "Unexpected panic was caught: {}",
                panic_message(&*panic)
            )],
        };

        let result = ScenarioResult::new(scenario, diagnostics, start.elapsed());
        if result.success {
            log::info!("{}: passed in {:?}", result.name, result.elapsed);
        } else {
            log::warn!("{}", result.message());
        }
        result
    }

    /// Run every scenario concurrently, returning results in input order.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
        futures_util::future::join_all(scenarios.iter().map(|scenario| self.run(scenario))).await
    }

    async fn attempt(&self, scenario: &Scenario) -> Vec<String> {
        let mut diagnostics = Vec::new();

        let client = match self.client_for(scenario) {
            Ok(client) => client,
            Err(err) => {
                diagnostics.push(err.chain());
                return diagnostics;
            }
        };

        match client.echo(&scenario.endpoint, &scenario.payload).await {
            Ok(reply) if reply == scenario.payload => {}
            Ok(reply) => {
                let err = crate::error::mismatch(format!(
                    "expected {:?}, received {:?}",
                    scenario.payload, reply
                ))
                .with_url(scenario.endpoint.url().clone());
                diagnostics.push(err.chain());
            }
            Err(err) => diagnostics.push(err.chain()),
        }

        diagnostics
    }

    fn client_for(&self, scenario: &Scenario) -> crate::Result<EchoClient> {
        let mut builder = EchoClientBuilder::new()
            .security(self.security)
            .credential_type(scenario.scheme)
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        for pem in &self.root_certs {
            builder = builder.add_root_certificate_pem(pem);
        }
        if let Some(ref provider) = self.security_provider {
            builder = builder.security_provider(provider.clone());
        }
        // NTLM and Windows never send them; the builder decides.
        if let Some(ref credentials) = scenario.credentials {
            builder = builder.credentials(credentials.clone());
        }

        builder.build()
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("root_certs", &self.root_certs.len())
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("security_provider", &self.security_provider.is_some())
            .finish()
    }
}

/// Run one scheme's echo round trip with the default [`Runner`].
///
/// `credentials` are required for Basic and Digest and ignored for NTLM and
/// Windows.
pub async fn run_scenario(
    scheme: CredentialScheme,
    endpoint: &EndpointAddress,
    credentials: Option<&Credentials>,
) -> ScenarioResult {
    let mut scenario = Scenario::new(scheme, endpoint.clone());
    if let Some(credentials) = credentials {
        scenario = scenario.with_credentials(credentials.clone());
    }
    Runner::new().run(&scenario).await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
