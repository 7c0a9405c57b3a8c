use brainrelay_core::config::{AppConfig, LoadOptions};
use brainrelay_db::{connect_with_config, migrations, ping};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{current_thread_runtime, exit, CommandResult};

/// Table whose presence means `brainrelay migrate` has been run.
const SCHEMA_PROBE_TABLE: &str = "thread_session";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { exit::DOCTOR_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_slack_credentials(&config));
            checks.push(check_quivr_credentials(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("slack_credentials"));
            checks.push(DoctorCheck::skipped("quivr_credentials"));
            checks.push(DoctorCheck::skipped("database_connectivity"));
            checks.push(DoctorCheck::skipped("thread_state_schema"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_credentials(config: &AppConfig) -> DoctorCheck {
    let verification = if config.slack.signing_secret.is_some() {
        "request signatures are verified"
    } else {
        "no signing secret set; inbound requests are not verified"
    };
    DoctorCheck::pass(
        "slack_credentials",
        format!("bot token has the `xoxb-` shape; {verification}"),
    )
}

fn check_quivr_credentials(config: &AppConfig) -> DoctorCheck {
    if config.quivr.api_key.expose_secret().trim().is_empty() {
        return DoctorCheck::fail("quivr_credentials", "quivr.api_key is empty");
    }
    DoctorCheck::pass(
        "quivr_credentials",
        format!(
            "api key configured for `{}` (timeout {}s)",
            config.quivr.base_url, config.quivr.timeout_secs
        ),
    )
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("thread_state_schema"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck {
                        name: "thread_state_schema",
                        status: CheckStatus::Skipped,
                        details: "skipped because the database is unreachable".to_string(),
                    },
                ];
            }
        };

        let connectivity = match ping(&pool).await {
            Ok(()) => DoctorCheck::pass(
                "database_connectivity",
                format!("connected using `{}`", config.database.url),
            ),
            Err(error) => DoctorCheck::fail("database_connectivity", format!("ping failed: {error}")),
        };

        let schema = migrations::table_exists(&pool, SCHEMA_PROBE_TABLE).await;
        pool.close().await;

        let schema = match schema {
            Ok(true) => DoctorCheck::pass("thread_state_schema", "thread-state tables present"),
            Ok(false) => DoctorCheck::fail(
                "thread_state_schema",
                "thread-state tables missing; run `brainrelay migrate`",
            ),
            Err(error) => {
                DoctorCheck::fail("thread_state_schema", format!("schema lookup failed: {error}"))
            }
        };

        vec![connectivity, schema]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
