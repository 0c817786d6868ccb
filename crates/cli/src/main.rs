use std::process::ExitCode;

fn main() -> ExitCode {
    timetabler_cli::run()
}
