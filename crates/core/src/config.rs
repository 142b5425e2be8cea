use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::role::{Period, Role};
use crate::lookup::resolver::DEFAULT_PERSONNEL_HEADER;
use crate::lookup::{PeriodSheet, ReportColumns, RosterLayout, SheetRouting};
use crate::sheets::SheetRef;

pub const DEFAULT_CONFIG_FILE: &str = "bonusbot.toml";

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub sheets: SheetsConfig,
    pub report: ReportConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub roster: RosterLayout,
    pub routing: SheetRouting,
    pub personnel_header: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    pub columns: ReportColumns,
    pub show_elapsed: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub sheets_base_url: Option<String>,
    pub show_elapsed: Option<bool>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// The chat process needs both Slack tokens; one-shot lookups do not.
    pub require_slack_tokens: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self { app_token: String::new().into(), bot_token: String::new().into() }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            base_url: "https://docs.google.com".to_string(),
            timeout_secs: 15,
            roster: RosterLayout::default(),
            routing: SheetRouting::default(),
            personnel_header: DEFAULT_PERSONNEL_HEADER.to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { columns: ReportColumns::default(), show_elapsed: true }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            health_check_port: 8080,
            graceful_shutdown_secs: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        if options.require_slack_tokens {
            config.validate_slack()?;
        }

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(slack) = patch.slack {
            if let Some(slack_app_token_value) = slack.app_token {
                self.slack.app_token = secret_value(slack_app_token_value);
            }
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
        }

        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(base_url) = sheets.base_url {
                self.sheets.base_url = base_url;
            }
            if let Some(timeout_secs) = sheets.timeout_secs {
                self.sheets.timeout_secs = timeout_secs;
            }
            if let Some(personnel_header) = sheets.personnel_header {
                self.sheets.personnel_header = personnel_header;
            }
            if let Some(roster) = sheets.roster {
                if let Some(sheet) = sheet_ref("sheets.roster", roster.sheet, roster.gid)? {
                    self.sheets.roster.sheet = sheet;
                }
                if let Some(header_row) = roster.header_row {
                    self.sheets.roster.header_row = header_row;
                }
                if let Some(personnel_column) = roster.personnel_column {
                    self.sheets.roster.personnel_column = personnel_column;
                }
                if let Some(hire_date_column) = roster.hire_date_column {
                    self.sheets.roster.hire_date_column = hire_date_column;
                }
            }
            if let Some(routing) = sheets.routing {
                for (role, period, entry) in routing.into_entries() {
                    let Some(entry) = entry else {
                        continue;
                    };
                    let key = format!("sheets.routing.{}_{}", role.as_str(), period.as_str());
                    let target = self.sheets.routing.sheet_for_mut(role, period);
                    if let Some(sheet) = sheet_ref(&key, entry.sheet, entry.gid)? {
                        target.sheet = sheet;
                    }
                    if let Some(header_row) = entry.header_row {
                        target.header_row = header_row;
                    }
                }
            }
        }

        if let Some(report) = patch.report {
            if let Some(columns) = report.administrator_columns {
                self.report.columns.administrator = columns;
            }
            if let Some(columns) = report.field_staff_columns {
                self.report.columns.field_staff = columns;
            }
            if let Some(show_elapsed) = report.show_elapsed {
                self.report.show_elapsed = show_elapsed;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BONUSBOT_SLACK_APP_TOKEN") {
            self.slack.app_token = secret_value(value);
        }
        if let Some(value) = read_env("BONUSBOT_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }

        if let Some(value) = read_env("BONUSBOT_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("BONUSBOT_SHEETS_BASE_URL") {
            self.sheets.base_url = value;
        }
        if let Some(value) = read_env("BONUSBOT_SHEETS_TIMEOUT_SECS") {
            self.sheets.timeout_secs = parse_u64("BONUSBOT_SHEETS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BONUSBOT_REPORT_SHOW_ELAPSED") {
            self.report.show_elapsed = parse_bool("BONUSBOT_REPORT_SHOW_ELAPSED", &value)?;
        }

        if let Some(value) = read_env("BONUSBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BONUSBOT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("BONUSBOT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("BONUSBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BONUSBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("BONUSBOT_LOGGING_LEVEL").or_else(|| read_env("BONUSBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BONUSBOT_LOGGING_FORMAT").or_else(|| read_env("BONUSBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(base_url) = overrides.sheets_base_url {
            self.sheets.base_url = base_url;
        }
        if let Some(show_elapsed) = overrides.show_elapsed {
            self.report.show_elapsed = show_elapsed;
        }
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
    }

    /// Everything except the Slack tokens, which only the chat process needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sheets(&self.sheets)?;
        validate_report(&self.report)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    pub fn validate_slack(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn sheet_ref(
    key: &str,
    sheet: Option<String>,
    gid: Option<String>,
) -> Result<Option<SheetRef>, ConfigError> {
    match (sheet, gid) {
        (Some(_), Some(_)) => Err(ConfigError::Validation(format!(
            "{key} sets both `sheet` and `gid`; use exactly one"
        ))),
        (Some(name), None) => Ok(Some(SheetRef::Name(name))),
        (None, Some(gid)) => Ok(Some(SheetRef::Gid(gid))),
        (None, None) => Ok(None),
    }
}

fn validate_sheet_ref(key: &str, sheet: &SheetRef) -> Result<(), ConfigError> {
    let blank = match sheet {
        SheetRef::Name(name) => name.trim().is_empty(),
        SheetRef::Gid(gid) => gid.trim().is_empty(),
    };
    if blank {
        return Err(ConfigError::Validation(format!("{key} must name a sheet")));
    }
    if let SheetRef::Gid(gid) = sheet {
        if !gid.trim().bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!("{key}.gid must be numeric")));
        }
    }
    Ok(())
}

fn validate_sheets(sheets: &SheetsConfig) -> Result<(), ConfigError> {
    let spreadsheet_id = sheets.spreadsheet_id.trim();
    if spreadsheet_id.is_empty() {
        return Err(ConfigError::Validation(
            "sheets.spreadsheet_id is required (the id between `/d/` and `/edit` in the spreadsheet URL)"
                .to_string(),
        ));
    }
    if spreadsheet_id.contains('/') {
        return Err(ConfigError::Validation(
            "sheets.spreadsheet_id must be the bare id, not a URL".to_string(),
        ));
    }

    let base_url = sheets.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "sheets.base_url must start with http:// or https://".to_string(),
        ));
    }

    if sheets.timeout_secs == 0 || sheets.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "sheets.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if sheets.personnel_header.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sheets.personnel_header must not be empty".to_string(),
        ));
    }

    validate_sheet_ref("sheets.roster", &sheets.roster.sheet)?;
    if sheets.roster.personnel_column == sheets.roster.hire_date_column {
        return Err(ConfigError::Validation(
            "sheets.roster.personnel_column and hire_date_column must differ".to_string(),
        ));
    }

    for role in Role::ALL {
        for period in Period::ALL {
            let PeriodSheet { sheet, .. } = sheets.routing.sheet_for(role, period);
            let key = format!("sheets.routing.{}_{}", role.as_str(), period.as_str());
            validate_sheet_ref(&key, sheet)?;
        }
    }

    Ok(())
}

fn validate_report(report: &ReportConfig) -> Result<(), ConfigError> {
    for role in Role::ALL {
        let columns = report.columns.for_role(role);
        if columns.is_empty() {
            return Err(ConfigError::Validation(format!(
                "report.{}_columns must list at least one column",
                role.as_str()
            )));
        }
        if columns.iter().any(|column| column.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "report.{}_columns must not contain blank names",
                role.as_str()
            )));
        }
    }
    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required. Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens".to_string()
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    sheets: Option<SheetsPatch>,
    report: Option<ReportPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    personnel_header: Option<String>,
    roster: Option<RosterPatch>,
    routing: Option<RoutingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RosterPatch {
    sheet: Option<String>,
    gid: Option<String>,
    header_row: Option<usize>,
    personnel_column: Option<usize>,
    hire_date_column: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PeriodSheetPatch {
    sheet: Option<String>,
    gid: Option<String>,
    header_row: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutingPatch {
    administrator_current: Option<PeriodSheetPatch>,
    administrator_previous: Option<PeriodSheetPatch>,
    field_staff_current: Option<PeriodSheetPatch>,
    field_staff_previous: Option<PeriodSheetPatch>,
}

impl RoutingPatch {
    fn into_entries(self) -> [(Role, Period, Option<PeriodSheetPatch>); 4] {
        [
            (Role::Administrator, Period::Current, self.administrator_current),
            (Role::Administrator, Period::Previous, self.administrator_previous),
            (Role::FieldStaff, Period::Current, self.field_staff_current),
            (Role::FieldStaff, Period::Previous, self.field_staff_previous),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    administrator_columns: Option<Vec<String>>,
    field_staff_columns: Option<Vec<String>>,
    show_elapsed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
