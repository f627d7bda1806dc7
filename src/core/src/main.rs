use clap::Parser;
use honeygate::configuration::{CliArgs, Config};
use honeygate::controller::Controller;
use log::{error, info};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    println!(
        "
==============================================================================
             honeygate - SSH honeypot capturing offered passwords
==============================================================================
"
    );

    info!("Importing configuration");

    let args = CliArgs::parse();

    let config = Config::load(&args).unwrap_or_else(|e| {
        error!("Unable to load configuration: {}", e);
        std::process::exit(1);
    });

    info!("Configuration imported successfully");

    let controller = Controller::new(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    match controller.run().await {
        Ok(stats) => info!(
            "Stopped after delivering {} attempt(s), {} lost",
            stats.delivered, stats.pending
        ),
        Err(e) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
    }
}
