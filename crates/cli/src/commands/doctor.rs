use bonusbot_core::config::{AppConfig, LoadOptions};
use bonusbot_core::{Period, Role, SheetSource};
use bonusbot_sheets::GoogleSheetsClient;
use serde::Serialize;

use super::{CommandResult, EXIT_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

impl DoctorCheck {
    fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name: name.into(), status, details: details.into() }
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => match GoogleSheetsClient::new(&config.sheets) {
            Ok(client) => build_report(&config, &client),
            Err(error) => finish(vec![
                config_passed(),
                check_slack_tokens(&config),
                DoctorCheck::new("sheet_client", CheckStatus::Fail, error.to_string()),
            ]),
        },
        Err(error) => finish(vec![
            DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()),
            DoctorCheck::new(
                "slack_token_readiness",
                CheckStatus::Skipped,
                "skipped because configuration did not load",
            ),
            DoctorCheck::new(
                "spreadsheet_layout",
                CheckStatus::Skipped,
                "skipped because configuration did not load",
            ),
        ]),
    };

    let exit_code = match report.overall_status {
        CheckStatus::Pass => 0,
        _ => EXIT_CONFIG,
    };
    CommandResult { exit_code, output: render(&report, json_output) }
}

pub fn render(report: &DoctorReport, json_output: bool) -> String {
    if json_output {
        return serde_json::to_string_pretty(report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(report)
}

/// Checks a loaded config against the live layout of every sheet it names.
pub fn build_report(config: &AppConfig, source: &dyn SheetSource) -> DoctorReport {
    let mut checks = vec![config_passed(), check_slack_tokens(config)];

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(DoctorCheck::new(
                "spreadsheet_layout",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            ));
            return finish(checks);
        }
    };

    checks.push(runtime.block_on(check_roster(config, source)));
    for role in Role::ALL {
        for period in Period::ALL {
            checks.push(runtime.block_on(check_period_sheet(config, source, role, period)));
        }
    }

    finish(checks)
}

fn config_passed() -> DoctorCheck {
    DoctorCheck::new("config_validation", CheckStatus::Pass, "configuration loaded and validated")
}

/// Only the chat server requires tokens; the CLI reports them without requiring them.
fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    match config.validate_slack() {
        Ok(()) => DoctorCheck::new(
            "slack_token_readiness",
            CheckStatus::Pass,
            "app and bot tokens have the expected prefixes",
        ),
        Err(error) => {
            DoctorCheck::new("slack_token_readiness", CheckStatus::Fail, error.to_string())
        }
    }
}

async fn check_roster(config: &AppConfig, source: &dyn SheetSource) -> DoctorCheck {
    let layout = &config.sheets.roster;
    let name = "roster_sheet";
    let table = match source.fetch(&layout.sheet).await {
        Ok(table) => table,
        Err(error) => return DoctorCheck::new(name, CheckStatus::Fail, error.to_string()),
    };

    let Some(header) = table.row(layout.header_row) else {
        return DoctorCheck::new(
            name,
            CheckStatus::Fail,
            format!("`{}` has no header row {}", layout.sheet, layout.header_row),
        );
    };
    let needed = layout.personnel_column.max(layout.hire_date_column) + 1;
    if header.len() < needed {
        return DoctorCheck::new(
            name,
            CheckStatus::Fail,
            format!("`{}` has {} columns, layout needs {needed}", layout.sheet, header.len()),
        );
    }

    let entries = table.rows_below(layout.header_row).count();
    DoctorCheck::new(
        name,
        CheckStatus::Pass,
        format!("`{}` readable with {entries} rows below the header", layout.sheet),
    )
}

async fn check_period_sheet(
    config: &AppConfig,
    source: &dyn SheetSource,
    role: Role,
    period: Period,
) -> DoctorCheck {
    let name = format!("period_sheet.{}_{}", role.as_str(), period.as_str());
    let entry = config.sheets.routing.sheet_for(role, period);
    let table = match source.fetch(&entry.sheet).await {
        Ok(table) => table,
        Err(error) => return DoctorCheck::new(name, CheckStatus::Fail, error.to_string()),
    };

    let Some(header) = table.header(entry.header_row) else {
        return DoctorCheck::new(
            name,
            CheckStatus::Fail,
            format!("`{}` has no header row {}", entry.sheet, entry.header_row),
        );
    };
    if !header.contains(&config.sheets.personnel_header) {
        return DoctorCheck::new(
            name,
            CheckStatus::Fail,
            format!("`{}` has no `{}` column", entry.sheet, config.sheets.personnel_header),
        );
    }

    let missing: Vec<&str> = config
        .report
        .columns
        .for_role(role)
        .iter()
        .map(String::as_str)
        .filter(|column| !header.contains(column))
        .collect();
    // Missing report columns render as 0, so they do not fail the check.
    let details = if missing.is_empty() {
        format!("`{}` has every report column", entry.sheet)
    } else {
        format!("`{}` lacks report columns: {}", entry.sheet, missing.join(", "))
    };
    DoctorCheck::new(name, CheckStatus::Pass, details)
}

fn finish(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
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
