use std::process::ExitCode;

fn main() -> ExitCode {
    rollup_console_lib::run()
}
