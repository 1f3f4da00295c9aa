use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    newscheck_lib::run().await
}
