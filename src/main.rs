use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

use cli::command::{Cli, Commands, LogFormat};
use cli::info::cmd_info;

mod cli;
mod input;
pub(crate) mod timestamp;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = cli.loglevel.to_level_filter();

    let multi = MultiProgress::new();

    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(base_level);
    match cli.log_format {
        LogFormat::Plain => {
            env_builder.format_timestamp_secs();
        }
        LogFormat::Json => {
            env_builder.format(|buf, record| {
                use std::io::Write;
                let line =
                    json_log_line(buf.timestamp(), record).map_err(std::io::Error::other)?;
                writeln!(buf, "{line}")
            });
        }
    }

    let pb = if cli.progress {
        let logger = env_builder.build();
        LogWrapper::new(multi.clone(), logger).try_init()?;
        Some(&multi)
    } else {
        env_builder.try_init()?;
        None
    };

    match cli.command {
        Commands::Info(ref args) => cmd_info(args, &cli, pb)?,
    }

    Ok(())
}

/// One log record as a single-line JSON object.
fn json_log_line(
    timestamp: impl std::fmt::Display,
    record: &log::Record,
) -> serde_json::Result<String> {
    Ok(format!(
        "{{\"ts\":{},\"lvl\":\"{}\",\"target\":{},\"msg\":{}}}",
        serde_json::to_string(&timestamp.to_string())?,
        record.level(),
        serde_json::to_string(record.target())?,
        serde_json::to_string(&record.args().to_string())?
    ))
}
