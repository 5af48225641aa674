use crate::cli::args::OutputFormat;
use crate::core::audit::{AuditReport, ClusterOutcome};
use crate::core::principals::{LookupOutcome, PrincipalReport};
use crate::core::probe::LoginReport;
use crate::core::runner::{PassRecord, RunTotals, UserRun};
use crate::domain::config::ProbeConfig;
use crate::domain::error::ProbeError;
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_login_runs(&self, run_id: &str, runs: &[UserRun<LoginReport>]) -> Result<(), OutputError>;
    fn write_audit_runs(&self, run_id: &str, runs: &[UserRun<AuditReport>]) -> Result<(), OutputError>;
    fn write_principal_runs(&self, run_id: &str, runs: &[UserRun<PrincipalReport>]) -> Result<(), OutputError>;
    fn write_config(&self, config: &ProbeConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Formatting error: {0}")]
    FormatError(#[from] std::fmt::Error),
}

impl From<OutputError> for ProbeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_login_runs(&self, run_id: &str, runs: &[UserRun<LoginReport>]) -> Result<(), OutputError> {
        print!("{}", render_login(self.format, run_id, runs)?);
        Ok(())
    }

    fn write_audit_runs(&self, run_id: &str, runs: &[UserRun<AuditReport>]) -> Result<(), OutputError> {
        print!("{}", render_audit(self.format, run_id, runs)?);
        Ok(())
    }

    fn write_principal_runs(&self, run_id: &str, runs: &[UserRun<PrincipalReport>]) -> Result<(), OutputError> {
        print!("{}", render_principals(self.format, run_id, runs)?);
        Ok(())
    }

    fn write_config(&self, config: &ProbeConfig) -> Result<(), OutputError> {
        let config = config.redacted();
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            _ => print!("{}", toml::to_string_pretty(&config)?),
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// JSON document for one command invocation
#[derive(Serialize)]
struct RunDocument<'a, T: Serialize> {
    run_id: &'a str,
    command: &'static str,
    totals: RunTotals,
    users: Vec<UserView<'a, T>>,
}

#[derive(Serialize)]
struct UserView<'a, T: Serialize> {
    user: usize,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    passes: Vec<PassView<'a, T>>,
}

#[derive(Serialize)]
struct PassView<'a, T: Serialize> {
    iteration: u32,
    started_after_ms: u128,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a T>,
}

/// Report carried by a pass, including the one inside a failed audit.
fn pass_report<'a, T>(pass: &'a PassRecord<T>, recover: fn(&ProbeError) -> Option<&T>) -> Option<&'a T> {
    match &pass.result {
        Ok(report) => Some(report),
        Err(e) => recover(e),
    }
}

fn no_report<T>(_: &ProbeError) -> Option<&T> {
    None
}

fn document<'a, T: Serialize>(
    command: &'static str,
    run_id: &'a str,
    runs: &'a [UserRun<T>],
    recover: fn(&ProbeError) -> Option<&T>,
) -> RunDocument<'a, T> {
    let users = runs
        .iter()
        .map(|run| UserView {
            user: run.user,
            succeeded: run.succeeded(),
            error: run.outcome.as_ref().err().map(ToString::to_string),
            passes: run
                .passes()
                .iter()
                .map(|pass| PassView {
                    iteration: pass.iteration,
                    started_after_ms: pass.started_after.as_millis(),
                    succeeded: pass.succeeded(),
                    error: pass.result.as_ref().err().map(ToString::to_string),
                    report: pass_report(pass, recover),
                })
                .collect(),
        })
        .collect();

    RunDocument {
        run_id,
        command,
        totals: RunTotals::from_runs(runs),
        users,
    }
}

fn summary_line(totals: &RunTotals) -> String {
    format!(
        "{} of {} users succeeded, {} of {} passes failed",
        totals.users_succeeded, totals.users, totals.passes_failed, totals.passes
    )
}

fn render_table<R: Tabled>(rows: Vec<R>, totals: &RunTotals) -> String {
    let mut out = String::new();
    if !rows.is_empty() {
        out.push_str(&Table::new(rows).to_string());
        out.push('\n');
    }
    out.push_str(&summary_line(totals));
    out.push('\n');
    out
}

/// Text header for a user that never got past login
fn user_failure(out: &mut String, run: &UserRun<impl Sized>) -> Result<bool, OutputError> {
    if let Err(e) = &run.outcome {
        writeln!(out, "User {}: FAILED: {}", run.user, e)?;
        return Ok(true);
    }
    Ok(false)
}

pub fn render_login(format: OutputFormat, run_id: &str, runs: &[UserRun<LoginReport>]) -> Result<String, OutputError> {
    let totals = RunTotals::from_runs(runs);
    match format {
        OutputFormat::Json => {
            let doc = document("login", run_id, runs, no_report);
            Ok(serde_json::to_string_pretty(&doc)? + "\n")
        }
        OutputFormat::Table => {
            let rows = runs
                .iter()
                .map(|run| {
                    let report = run.passes().first().and_then(|p| p.result.as_ref().ok());
                    LoginRow {
                        user: run.user,
                        status: if run.succeeded() { "ok" } else { "failed" }.to_string(),
                        csrf: report.map(|r| r.csrf_token_issued).unwrap_or(false),
                        cookies: report.map(|r| r.cookies.join(", ")).unwrap_or_default(),
                        error: run.outcome.as_ref().err().map(ToString::to_string).unwrap_or_default(),
                    }
                })
                .collect();
            Ok(render_table::<LoginRow>(rows, &totals))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for run in runs {
                if user_failure(&mut out, run)? {
                    continue;
                }
                for pass in run.passes() {
                    if let Ok(report) = &pass.result {
                        writeln!(
                            out,
                            "User {}: logged in as '{}' (csrf token: {}, cookies: {})",
                            run.user,
                            report.username,
                            if report.csrf_token_issued { "yes" } else { "no" },
                            report.cookies.join(", ")
                        )?;
                    }
                }
            }
            writeln!(out, "{}", summary_line(&totals))?;
            Ok(out)
        }
    }
}

pub fn render_audit(format: OutputFormat, run_id: &str, runs: &[UserRun<AuditReport>]) -> Result<String, OutputError> {
    let totals = RunTotals::from_runs(runs);
    match format {
        OutputFormat::Json => {
            let doc = document("audit", run_id, runs, ProbeError::audit_report);
            Ok(serde_json::to_string_pretty(&doc)? + "\n")
        }
        OutputFormat::Table => {
            let mut rows = Vec::new();
            for run in runs {
                if let Err(e) = &run.outcome {
                    rows.push(ClusterRow::failure(run.user, 0, e));
                }
                for pass in run.passes() {
                    match pass_report(pass, ProbeError::audit_report) {
                        Some(report) => rows.extend(
                            report
                                .clusters
                                .iter()
                                .map(|c| ClusterRow::from_cluster(run.user, pass.iteration, c)),
                        ),
                        None => {
                            if let Err(e) = &pass.result {
                                rows.push(ClusterRow::failure(run.user, pass.iteration, e));
                            }
                        }
                    }
                }
            }
            Ok(render_table(rows, &totals))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for run in runs {
                if user_failure(&mut out, run)? {
                    continue;
                }
                for pass in run.passes() {
                    let Some(report) = pass_report(pass, ProbeError::audit_report) else {
                        if let Err(e) = &pass.result {
                            writeln!(out, "User {} pass {}: FAILED: {}", run.user, pass.iteration, e)?;
                        }
                        continue;
                    };
                    writeln!(
                        out,
                        "User {} pass {} (+{}s): {} clusters, {} nodes, {} not compliant",
                        run.user,
                        pass.iteration,
                        pass.started_after.as_secs(),
                        report.clusters.len(),
                        report.nodes_checked(),
                        report.failed_count()
                    )?;
                    for cluster in &report.clusters {
                        match &cluster.outcome {
                            ClusterOutcome::Compliant { nodes_checked } => {
                                writeln!(out, "  {}: compliant ({} nodes)", cluster.cluster_id, nodes_checked)?;
                            }
                            ClusterOutcome::NonCompliant { nodes_checked, violations } => {
                                writeln!(
                                    out,
                                    "  {}: NON-COMPLIANT ({} of {} nodes)",
                                    cluster.cluster_id,
                                    violations.len(),
                                    nodes_checked
                                )?;
                                for violation in violations {
                                    let labels: Vec<String> = violation
                                        .labels
                                        .iter()
                                        .map(|(k, v)| format!("{}={}", k, v))
                                        .collect();
                                    writeln!(
                                        out,
                                        "    {} has none of [{}]; labels: {{{}}}",
                                        violation.node,
                                        violation.missing.join(", "),
                                        labels.join(", ")
                                    )?;
                                }
                            }
                            ClusterOutcome::QueryFailed { error } => {
                                writeln!(out, "  {}: QUERY FAILED: {}", cluster.cluster_id, error)?;
                            }
                        }
                    }
                }
            }
            writeln!(out, "{}", summary_line(&totals))?;
            Ok(out)
        }
    }
}

pub fn render_principals(
    format: OutputFormat,
    run_id: &str,
    runs: &[UserRun<PrincipalReport>],
) -> Result<String, OutputError> {
    let totals = RunTotals::from_runs(runs);
    match format {
        OutputFormat::Json => {
            let doc = document("principals", run_id, runs, no_report);
            Ok(serde_json::to_string_pretty(&doc)? + "\n")
        }
        OutputFormat::Table => {
            let mut rows = Vec::new();
            for run in runs {
                for pass in run.passes() {
                    let Ok(report) = &pass.result else { continue };
                    rows.extend(report.lookups.iter().map(|lookup| {
                        let (name, detail) = match &lookup.outcome {
                            LookupOutcome::Found { detail } => (detail.display_name.clone(), detail.login_name.clone()),
                            LookupOutcome::Failed { error } => (String::new(), error.clone()),
                        };
                        PrincipalRow {
                            user: run.user,
                            pass: pass.iteration,
                            principal: lookup.principal_id.clone(),
                            name,
                            detail,
                        }
                    }));
                }
            }
            Ok(render_table(rows, &totals))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for run in runs {
                if user_failure(&mut out, run)? {
                    continue;
                }
                for pass in run.passes() {
                    let report = match &pass.result {
                        Ok(report) => report,
                        Err(e) => {
                            writeln!(out, "User {} pass {}: FAILED: {}", run.user, pass.iteration, e)?;
                            continue;
                        }
                    };
                    writeln!(
                        out,
                        "User {} pass {}: {} bindings, {} principals, {} lookups failed",
                        run.user,
                        pass.iteration,
                        report.bindings_seen,
                        report.lookups.len(),
                        report.failed_count()
                    )?;
                    for lookup in &report.lookups {
                        match &lookup.outcome {
                            LookupOutcome::Found { detail } => {
                                writeln!(out, "  {}: {} ({})", lookup.principal_id, detail.display_name, detail.login_name)?;
                            }
                            LookupOutcome::Failed { error } => {
                                writeln!(out, "  {}: LOOKUP FAILED: {}", lookup.principal_id, error)?;
                            }
                        }
                    }
                }
            }
            writeln!(out, "{}", summary_line(&totals))?;
            Ok(out)
        }
    }
}

/// Table row for a login
#[derive(Tabled)]
struct LoginRow {
    user: usize,
    status: String,
    csrf: bool,
    cookies: String,
    error: String,
}

/// Table row for one cluster in one pass
#[derive(Tabled)]
struct ClusterRow {
    user: usize,
    pass: u32,
    cluster: String,
    status: String,
    nodes: usize,
    detail: String,
}

impl ClusterRow {
    fn from_cluster(user: usize, pass: u32, cluster: &crate::core::audit::ClusterReport) -> Self {
        let detail = match &cluster.outcome {
            ClusterOutcome::Compliant { .. } => String::new(),
            ClusterOutcome::NonCompliant { violations, .. } => violations
                .iter()
                .map(|v| v.node.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            ClusterOutcome::QueryFailed { error } => error.clone(),
        };
        Self {
            user,
            pass,
            cluster: cluster.cluster_id.to_string(),
            status: cluster.outcome.label().to_string(),
            nodes: cluster.outcome.nodes_checked(),
            detail,
        }
    }

    fn failure(user: usize, pass: u32, error: &ProbeError) -> Self {
        Self {
            user,
            pass,
            cluster: "-".to_string(),
            status: "failed".to_string(),
            nodes: 0,
            detail: error.to_string(),
        }
    }
}

/// Table row for a principal lookup
#[derive(Tabled)]
struct PrincipalRow {
    user: usize,
    pass: u32,
    principal: String,
    name: String,
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::ComplianceViolation;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn failing_report() -> AuditReport {
        let mut report = AuditReport::default();
        report.push("c-1".into(), ClusterOutcome::Compliant { nodes_checked: 2 });
        report.push(
            "c-2".into(),
            ClusterOutcome::NonCompliant {
                nodes_checked: 1,
                violations: vec![ComplianceViolation {
                    node: "bare-node".to_string(),
                    labels: BTreeMap::from([("zone".to_string(), "a".to_string())]),
                    missing: vec!["node-role.kubernetes.io/worker".to_string()],
                }],
            },
        );
        report.push(
            "c-3".into(),
            ClusterOutcome::QueryFailed {
                error: "HTTP 503".to_string(),
            },
        );
        report
    }

    fn audit_runs() -> Vec<UserRun<AuditReport>> {
        vec![
            UserRun {
                user: 1,
                outcome: Ok(vec![PassRecord {
                    iteration: 1,
                    started_after: Duration::ZERO,
                    result: failing_report().into_result(),
                }]),
            },
            UserRun {
                user: 2,
                outcome: Err(ProbeError::auth("login rejected with HTTP 401")),
            },
        ]
    }

    #[test]
    fn test_audit_json_keeps_report_of_failed_pass() {
        let out = render_audit(OutputFormat::Json, "run-1", &audit_runs()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["command"], "audit");
        assert_eq!(value["totals"]["users"], 2);
        assert_eq!(value["totals"]["users_succeeded"], 0);

        let pass = &value["users"][0]["passes"][0];
        assert_eq!(pass["succeeded"], false);
        let clusters = pass["report"]["clusters"].as_array().unwrap();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[1]["status"], "non_compliant");
        assert_eq!(clusters[1]["violations"][0]["node"], "bare-node");
        assert_eq!(clusters[2]["status"], "query_failed");

        assert!(value["users"][1]["error"].as_str().unwrap().contains("401"));
    }

    #[test]
    fn test_audit_text_lists_every_cluster() {
        let out = render_audit(OutputFormat::Text, "run-1", &audit_runs()).unwrap();

        assert!(out.contains("c-1: compliant (2 nodes)"));
        assert!(out.contains("c-2: NON-COMPLIANT"));
        assert!(out.contains("bare-node has none of [node-role.kubernetes.io/worker]"));
        assert!(out.contains("zone=a"));
        assert!(out.contains("c-3: QUERY FAILED: HTTP 503"));
        assert!(out.contains("User 2: FAILED"));
        assert!(out.contains("0 of 2 users succeeded"));
    }

    #[test]
    fn test_audit_table_has_row_per_cluster() {
        let out = render_audit(OutputFormat::Table, "run-1", &audit_runs()).unwrap();
        assert!(out.contains("non-compliant"));
        assert!(out.contains("query-failed"));
        assert!(out.contains("bare-node"));
    }

    #[test]
    fn test_login_text() {
        let runs = vec![UserRun {
            user: 1,
            outcome: Ok(vec![PassRecord {
                iteration: 1,
                started_after: Duration::ZERO,
                result: Ok(LoginReport {
                    username: "admin".to_string(),
                    csrf_token_issued: true,
                    cookies: vec!["R_SESS".to_string()],
                }),
            }]),
        }];
        let out = render_login(OutputFormat::Text, "run-1", &runs).unwrap();
        assert!(out.contains("logged in as 'admin'"));
        assert!(out.contains("1 of 1 users succeeded"));
    }
}
