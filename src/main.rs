use std::process::ExitCode;

fn main() -> ExitCode {
    mod_sync_lib::run()
}
