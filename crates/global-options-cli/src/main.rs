use std::process::ExitCode;

fn main() -> ExitCode {
    global_options_cli::run()
}
