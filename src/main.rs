use std::process::ExitCode;

fn main() -> ExitCode {
    m3_lib::run()
}
