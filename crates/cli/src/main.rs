use std::process::ExitCode;

fn main() -> ExitCode {
    ragdeck_cli::run()
}
