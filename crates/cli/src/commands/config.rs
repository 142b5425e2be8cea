use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bonusbot_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use bonusbot_core::{Period, Role};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "slack.app_token",
        &redact_token(config.slack.app_token.expose_secret()),
        source("slack.app_token", &["BONUSBOT_SLACK_APP_TOKEN"]),
    ));
    lines.push(render_line(
        "slack.bot_token",
        &redact_token(config.slack.bot_token.expose_secret()),
        source("slack.bot_token", &["BONUSBOT_SLACK_BOT_TOKEN"]),
    ));

    lines.push(render_line(
        "sheets.spreadsheet_id",
        &config.sheets.spreadsheet_id,
        source("sheets.spreadsheet_id", &["BONUSBOT_SHEETS_SPREADSHEET_ID"]),
    ));
    lines.push(render_line(
        "sheets.base_url",
        &config.sheets.base_url,
        source("sheets.base_url", &["BONUSBOT_SHEETS_BASE_URL"]),
    ));
    lines.push(render_line(
        "sheets.timeout_secs",
        &config.sheets.timeout_secs.to_string(),
        source("sheets.timeout_secs", &["BONUSBOT_SHEETS_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "sheets.personnel_header",
        &config.sheets.personnel_header,
        source("sheets.personnel_header", &[]),
    ));

    let roster = &config.sheets.roster;
    lines.push(render_line(
        "sheets.roster",
        &format!(
            "{} (header row {}, personnel column {}, hire date column {})",
            roster.sheet, roster.header_row, roster.personnel_column, roster.hire_date_column
        ),
        source("sheets.roster", &[]),
    ));
    for role in Role::ALL {
        for period in Period::ALL {
            let key = format!("sheets.routing.{}_{}", role.as_str(), period.as_str());
            let entry = config.sheets.routing.sheet_for(role, period);
            lines.push(render_line(
                &key,
                &format!("{} (header row {})", entry.sheet, entry.header_row),
                source(&key, &[]),
            ));
        }
    }

    lines.push(render_line(
        "report.administrator_columns",
        &format!("{} columns", config.report.columns.administrator.len()),
        source("report.administrator_columns", &[]),
    ));
    lines.push(render_line(
        "report.field_staff_columns",
        &format!("{} columns", config.report.columns.field_staff.len()),
        source("report.field_staff_columns", &[]),
    ));
    lines.push(render_line(
        "report.show_elapsed",
        &config.report.show_elapsed.to_string(),
        source("report.show_elapsed", &["BONUSBOT_REPORT_SHOW_ELAPSED"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["BONUSBOT_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", &["BONUSBOT_SERVER_HEALTH_CHECK_PORT"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["BONUSBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["BONUSBOT_LOGGING_LEVEL", "BONUSBOT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["BONUSBOT_LOGGING_FORMAT", "BONUSBOT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
