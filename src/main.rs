use chat_media_export::{migrate, utils};
use clap::Parser;
use eyre::Result;
use std::ffi::OsString;
use std::path::PathBuf;

/// Copy chat media into per-contact folders named by message time.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file (ChatStorage.sqlite).
    #[arg(long, value_name = "PATH", value_parser = non_empty_path)]
    db: PathBuf,

    /// Path to the app's media folder. Must already exist.
    #[arg(long, value_name = "PATH", value_parser = non_empty_path)]
    media: PathBuf,

    /// Path to the target media folder. Created if missing.
    #[arg(long, value_name = "PATH", value_parser = non_empty_path)]
    target: PathBuf,

    /// Print each file linked, copied or left unchanged, and a final summary.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    quiet: bool,
}

fn non_empty_path(value: &str) -> Result<PathBuf, String> {
    if value.is_empty() {
        Err("path must not be empty".to_string())
    } else {
        Ok(PathBuf::from(value))
    }
}

const SINGLE_DASH_FLAGS: [&str; 3] = ["db", "media", "target"];

/// Accept `-db x` and `-db=x` alongside `--db x`.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let config = utils::MigrateConfig {
        db_path: cli.db,
        media_dir: cli.media,
        target_dir: cli.target,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    migrate::execute(&config)?;
    Ok(())
}
