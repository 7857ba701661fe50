use clap::Parser;

use clicklinker::cli::{Cli, run_command};
use clicklinker::config::StaticConfig;
use clicklinker::system::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = if cli.command.needs_config() {
        match StaticConfig::load(&cli.config).and_then(|c| c.validate().map(|()| c)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
    } else {
        StaticConfig::default()
    };

    // guard 必须存活到进程结束，保证异步日志被刷出
    let log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, &config).await {
        drop(log_guard);
        eprintln!("{}", e.format_simple());
        std::process::exit(1);
    }
}
