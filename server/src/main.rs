use std::process::ExitCode;

use mailroute::AppConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let json = std::env::var("MAILROUTE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if let Err(e) = mailroute_server::init_logging(json) {
        eprintln!("{}", e);
    }
    info!("Starting mailroute v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match mailroute_server::start_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
