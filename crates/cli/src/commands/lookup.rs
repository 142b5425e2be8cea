use std::path::PathBuf;
use std::sync::Arc;

use bonusbot_core::config::{AppConfig, LoadOptions};
use bonusbot_core::{ErrorClass, LookupPipeline, Period, Role, SheetSource};
use bonusbot_sheets::GoogleSheetsClient;

use super::{CommandResult, EXIT_CONFIG};

const COMMAND: &str = "lookup";

#[derive(Clone, Debug, Default)]
pub struct LookupArgs {
    pub role: String,
    pub period: String,
    pub identifier: String,
    pub json: bool,
    pub config_path: Option<PathBuf>,
}

pub fn run(args: &LookupArgs) -> CommandResult {
    let options = LoadOptions {
        config_path: args.config_path.clone(),
        require_file: args.config_path.is_some(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };

    let client = match GoogleSheetsClient::new(&config.sheets) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::lookup_failure(
                COMMAND,
                ErrorClass::TransientFetch,
                error.to_string(),
            );
        }
    };

    run_with_source(args, &config, Arc::new(client))
}

/// Runs the pipeline once against `source`. No session is involved, so a
/// malformed identifier is a plain failure rather than a re-prompt.
pub fn run_with_source(
    args: &LookupArgs,
    config: &AppConfig,
    source: Arc<dyn SheetSource>,
) -> CommandResult {
    let Some(role) = Role::from_label(&args.role) else {
        return CommandResult::lookup_failure(
            COMMAND,
            ErrorClass::MalformedInput,
            format!("unknown role `{}`; expected administrator or field_staff", args.role),
        );
    };
    let Some(period) = Period::from_label(&args.period) else {
        return CommandResult::lookup_failure(
            COMMAND,
            ErrorClass::MalformedInput,
            format!("unknown period `{}`; expected current or previous", args.period),
        );
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let pipeline = LookupPipeline::new(source, &config.sheets, &config.report);
    let result = runtime.block_on(pipeline.run_raw(role, period, &args.identifier));

    match result {
        Ok(report) if args.json => match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
        },
        Ok(report) => CommandResult { exit_code: 0, output: report.render() },
        Err(error) => {
            let message = format!("{} ({error})", error.user_message());
            CommandResult::lookup_failure(COMMAND, error.class(), message)
        }
    }
}
