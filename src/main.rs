use anyhow::Result;
use clap::{Parser, Subcommand};
use log::error;
use pdfdrop::config::{AppConfig, CONFIG_FILE};
use pdfdrop::send;

#[derive(Parser)]
#[command(name = "pdfdrop")]
#[command(about = "Upload files to a pdfdrop server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print the name the server stored it under
    Send(send::SendArgs),

    /// Generate configuration file (.pdfdrop.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load_default();

    match cli.command {
        Commands::Send(args) => {
            send::run(args, app_config.as_ref().and_then(|c| c.send.as_ref()))?;
        }

        Commands::Genconfig { force } => {
            if let Err(e) = AppConfig::generate_config_file(CONFIG_FILE, force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
