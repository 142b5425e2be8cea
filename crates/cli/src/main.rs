use std::process::ExitCode;

fn main() -> ExitCode {
    bonusbot_cli::run()
}
