use std::process::ExitCode;

fn main() -> ExitCode {
    match restfit_codegen::Builder::new().emit_rerun_if_changed(true).generate() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            for line in error.to_string().lines() {
                println!("cargo:warning={line}");
            }
            ExitCode::FAILURE
        }
    }
}
