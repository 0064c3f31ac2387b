use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OpenFlags, backup::Backup};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Configuration required to run the migration.
/// This decouples the logic from how the arguments were parsed.
#[derive(Clone, Debug)]
pub struct MigrateConfig {
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub target_dir: PathBuf,
    pub verbose: bool,
    pub quiet: bool,
}

/// Validate the three input paths and create the target root if needed.
pub fn prepare_paths(config: &MigrateConfig) -> Result<()> {
    if config.db_path.as_os_str().is_empty() {
        return Err(eyre!("Provide the path to the SQLite database file"));
    }
    if config.media_dir.as_os_str().is_empty() {
        return Err(eyre!("Provide the path to the media folder"));
    }
    if config.target_dir.as_os_str().is_empty() {
        return Err(eyre!("Provide the path to the target media folder"));
    }

    if !config.db_path.exists() {
        return Err(eyre!(
            "Database not found at: {}",
            config.db_path.display()
        ));
    }
    if !config.media_dir.exists() {
        return Err(eyre!(
            "Media folder does not exist: {}",
            config.media_dir.display()
        ));
    }

    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })
}

/// Create a read-only backup of the database to a temporary file.
///
/// The messaging app may hold the live database open (WAL, locks), so every
/// query runs against this snapshot instead.
pub fn backup_database(db_path: &Path, quiet: bool) -> Result<NamedTempFile> {
    let spinner = if quiet {
        indicatif::ProgressBar::hidden()
    } else {
        let s = indicatif::ProgressBar::new_spinner();
        s.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.green} {msg}")
                .map_err(|e| eyre!("Invalid spinner template: {}", e))?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        s.set_message("Snapshotting database...");
        s.enable_steady_tick(Duration::from_millis(80));
        s
    };

    let src = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .wrap_err_with(|| format!("Failed to open source database: {}", db_path.display()))?;

    let tmp = NamedTempFile::new().wrap_err("Failed to create temporary file")?;
    let mut dst =
        Connection::open(tmp.path()).wrap_err("Failed to open snapshot database connection")?;

    {
        let backup = Backup::new(&src, &mut dst).wrap_err("Failed to initialize backup")?;
        backup
            .run_to_completion(1000, Duration::from_millis(5), None)
            .wrap_err("Backup did not complete successfully")?;
    }

    drop(src);
    spinner.finish_and_clear();
    Ok(tmp)
}
