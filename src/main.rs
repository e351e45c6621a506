use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    match ridership_curves::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
