//! Run the credential-type scenarios against a set of echo services.
//!
//! # Usage
//!
//! Every scheme under one host:
//! ```bash
//! authprobe --base-address wcf.corp.example:44300
//! ```
//!
//! Only Basic and Digest, trusting a test root:
//! ```bash
//! authprobe --base-address localhost:44300 --scheme basic --scheme digest --ca-cert root.pem
//! ```
//!
//! Tag NTLM as a known issue so its failure doesn't fail the run:
//! ```bash
//! authprobe --base-address localhost:44300 --known-issue ntlm=5
//! ```
//!
//! Or apply the tracked issue of every scheme at once:
//! ```bash
//! authprobe --base-address localhost:44300 --tracked-issues
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use authprobe::{
    CredentialScheme, Credentials, EndpointAddress, Endpoints, Report, Runner, Scenario,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "authprobe", version, about = "HTTP client credential-type conformance checks")]
struct Args {
    /// Host (and optional port/path) hosting every echo service.
    #[arg(long, env = "AUTHPROBE_BASE_ADDRESS", default_value = "localhost")]
    base_address: String,

    /// Override the Basic echo service address.
    #[arg(long, env = "AUTHPROBE_BASIC_ADDRESS")]
    basic_address: Option<EndpointAddress>,

    /// Override the Digest echo service address.
    #[arg(long, env = "AUTHPROBE_DIGEST_ADDRESS")]
    digest_address: Option<EndpointAddress>,

    /// Override the NTLM echo service address.
    #[arg(long, env = "AUTHPROBE_NTLM_ADDRESS")]
    ntlm_address: Option<EndpointAddress>,

    /// Override the Windows echo service address.
    #[arg(long, env = "AUTHPROBE_WINDOWS_ADDRESS")]
    windows_address: Option<EndpointAddress>,

    /// Username for Basic and Digest.
    #[arg(short, long, env = "AUTHPROBE_USERNAME", default_value = "wcf-test")]
    username: String,

    /// Password for Basic and Digest.
    #[arg(
        short,
        long,
        env = "AUTHPROBE_PASSWORD",
        default_value = "wcfSaysHell0World!",
        hide_default_value = true,
        hide_env_values = true
    )]
    password: String,

    /// Only run these schemes. Defaults to all four.
    #[arg(short, long = "scheme")]
    schemes: Vec<CredentialScheme>,

    /// Tag a scheme as expected to fail, e.g. `ntlm=5`.
    #[arg(long = "known-issue", value_parser = parse_known_issue)]
    known_issues: Vec<(CredentialScheme, u32)>,

    /// Tag every scenario with the defect tracked against its scheme
    /// (Basic/Digest #69, NTLM #5, Windows #6). `--known-issue` wins.
    #[arg(long)]
    tracked_issues: bool,

    /// Don't run scenarios tagged with a known issue.
    #[arg(long)]
    skip_known_issues: bool,

    /// Per-scenario timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Additional PEM root certificate to trust.
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Skip TLS certificate verification.
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Print the report as JSON.
    #[cfg(feature = "json")]
    #[arg(long)]
    json: bool,
}

fn parse_known_issue(s: &str) -> Result<(CredentialScheme, u32), String> {
    let (scheme, id) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <scheme>=<id>, got '{s}'"))?;
    let scheme = scheme.parse().map_err(|e: authprobe::Error| e.chain())?;
    let id = id
        .trim()
        .parse()
        .map_err(|e| format!("invalid issue id '{id}': {e}"))?;
    Ok((scheme, id))
}

fn endpoints(args: &Args) -> authprobe::Result<Endpoints> {
    let mut endpoints = Endpoints::from_base_address(&args.base_address)?;
    let overrides = [
        (CredentialScheme::Basic, &args.basic_address),
        (CredentialScheme::Digest, &args.digest_address),
        (CredentialScheme::Ntlm, &args.ntlm_address),
        (CredentialScheme::Windows, &args.windows_address),
    ];
    for (scheme, address) in overrides {
        if let Some(address) = address {
            endpoints.set(scheme, address.clone());
        }
    }
    Ok(endpoints)
}

fn scenarios(args: &Args, endpoints: &Endpoints) -> Vec<Scenario> {
    let credentials = Credentials::new(args.username.as_str(), args.password.as_str());

    Scenario::standard(endpoints, &credentials)
        .into_iter()
        .filter(|s| args.schemes.is_empty() || args.schemes.contains(&s.scheme()))
        .map(|s| {
            match args.known_issues.iter().find(|(scheme, _)| *scheme == s.scheme()) {
                Some(&(_, id)) => s.known_issue(id),
                None if args.tracked_issues => s.with_tracked_issue(),
                None => s,
            }
        })
        .filter(|s| !(args.skip_known_issues && s.issue().is_some()))
        .collect()
}

async fn run(args: Args) -> Result<Report, String> {
    let endpoints = endpoints(&args).map_err(|e| e.chain())?;
    let scenarios = scenarios(&args, &endpoints);

    let mut runner = Runner::new()
        .timeout(Some(Duration::from_secs(args.timeout)))
        .danger_accept_invalid_certs(args.insecure);
    if let Some(ref path) = args.ca_cert {
        let pem = std::fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
        runner = runner.add_root_certificate_pem(pem);
    }

    log::info!("running {} scenario(s)", scenarios.len());
    let results = runner.run_all(&scenarios).await;
    Ok(Report::from_results(results))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    #[cfg(feature = "json")]
    let json = args.json;

    let report = match run(args).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    #[cfg(feature = "json")]
    if json {
        match report.to_json() {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("error: {}", err.chain());
                return ExitCode::from(2);
            }
        }
        return exit_code(&report);
    }

    println!("{report}");
    exit_code(&report)
}

fn exit_code(report: &Report) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
