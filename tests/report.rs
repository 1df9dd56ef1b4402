mod support;

use std::time::Duration;

use authprobe::{CredentialScheme, Credentials, EndpointAddress, Report, Runner, Scenario, SecurityMode};
use http::StatusCode;
use support::server;

#[tokio::test]
async fn known_issue_failures_do_not_fail_the_report() {
    let server = server::http(|req| async move {
        if req.uri().path() == "/NtlmAuth.svc/https" {
            server::challenge("NTLM")
        } else {
            server::response(StatusCode::OK, server::body_string(req).await)
        }
    });
    let basic = EndpointAddress::parse(&server.url("/BasicAuth.svc/https")).unwrap();
    let ntlm = EndpointAddress::parse(&server.url("/NtlmAuth.svc/https")).unwrap();

    let scenarios = vec![
        Scenario::new(CredentialScheme::Basic, basic)
            .with_credentials(Credentials::new("wcf-test", "wcfSaysHell0World!")),
        Scenario::new(CredentialScheme::Ntlm, ntlm).known_issue(5),
    ];
    let results = Runner::new()
        .security(SecurityMode::None)
        .timeout(Some(Duration::from_secs(5)))
        .run_all(&scenarios)
        .await;
    let report = Report::from_results(results);

    assert_eq!(report.passed().count(), 1);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.known_issues().count(), 1);
    assert!(report.is_success());

    let text = report.to_string();
    assert!(text.contains("FAIL (known issue #5)"));
    assert!(text.ends_with("1 passed, 1 failed (1 known issues)"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["scheme"], "basic");
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["known_issue"], 5);
    assert!(results[1]["diagnostics"][0]
        .as_str()
        .unwrap()
        .contains("SEC_E_UNSUPPORTED_FUNCTION"));
}

#[tokio::test]
async fn untagged_failure_fails_the_report() {
    let port = server::unused_port();
    let endpoint = EndpointAddress::parse(&format!("https://127.0.0.1:{port}/BasicAuth.svc/https")).unwrap();

    let scenario = Scenario::new(CredentialScheme::Basic, endpoint)
        .with_credentials(Credentials::new("wcf-test", "wcfSaysHell0World!"));
    let report = Report::from_results(vec![Runner::new().run(&scenario).await]);

    assert!(!report.is_success());
    assert_eq!(report.unexpected_failures().count(), 1);
}
