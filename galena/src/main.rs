mod config;

use std::process::ExitCode;

use clap::Parser;
use galena_server::Server;

#[derive(Parser, Debug)]
#[command(
    name = "galena",
    version,
    about = "A lightweight Minecraft 1.9 (protocol 107) server."
)]
struct Args {
    /// JSON formatted configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let configs = match config::load(args.config.as_deref()) {
        Ok(configs) => configs,
        Err(err) => {
            eprintln!("Error parsing configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut listeners = Vec::new();
    for listener_config in configs {
        match Server::new(listener_config) {
            Ok(server) => listeners.push(server),
            Err(err) => eprintln!("Failed to start listener: {}", err),
        }
    }
    if listeners.is_empty() {
        eprintln!("No listeners started");
        return ExitCode::FAILURE;
    }

    let handles: Vec<_> = listeners
        .into_iter()
        .map(|server| std::thread::spawn(move || server.run()))
        .collect();

    let mut code = ExitCode::SUCCESS;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("Listener failed: {}", err);
                code = ExitCode::FAILURE;
            }
            Err(_) => code = ExitCode::FAILURE,
        }
    }
    code
}
