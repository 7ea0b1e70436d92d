//! `ait-codegen` binary.

fn main() {
    std::process::exit(ait_codegen_cli::run_cli());
}
