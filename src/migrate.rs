use crate::chats::ChatIndex;
use crate::media::{MEDIA_QUERY, MediaRow};
use crate::transfer::{TransferOutcome, transfer_file};
use crate::utils::{MigrateConfig, backup_database, prepare_paths};
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;

/// Totals for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrateSummary {
    pub linked: usize,
    pub copied: usize,
    pub unchanged: usize,
}

impl MigrateSummary {
    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Linked => self.linked += 1,
            TransferOutcome::Copied => self.copied += 1,
            TransferOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.linked + self.copied + self.unchanged
    }
}

/// The main entry point for the migration.
/// Validates paths, snapshots the database and runs the transfer loop.
pub fn execute(config: &MigrateConfig) -> Result<MigrateSummary> {
    prepare_paths(config)?;
    let snapshot = backup_database(&config.db_path, config.quiet)?;
    let conn = Connection::open(snapshot.path()).wrap_err("Failed to open snapshot database")?;
    run(&conn, config)
}

/// Build the chat index, then transfer every media row in query order.
/// Stops at the first failure; files already transferred stay in place.
pub fn run(conn: &Connection, config: &MigrateConfig) -> Result<MigrateSummary> {
    let chats = ChatIndex::build(conn, &config.target_dir)?;

    let total: u64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM ({})", MEDIA_QUERY),
            [],
            |row| row.get::<_, i64>(0),
        )
        .wrap_err("Failed to count media items")? as u64;

    let pb = progress_bar(total, config.quiet)?;
    if config.verbose {
        pb.println(format!(
            "Found {} chats and {} media items.",
            chats.len(),
            total
        ));
    }

    let mut stmt = conn
        .prepare(MEDIA_QUERY)
        .wrap_err("Failed to prepare media query")?;
    let mut rows = stmt.query([]).wrap_err("Failed to execute media query")?;

    let mut summary = MigrateSummary::default();
    while let Some(row) = rows.next().wrap_err("Failed to read media row")? {
        let media = MediaRow::from_row(row)?;
        let task = media.plan(&chats, &config.media_dir, &config.target_dir)?;
        let outcome = transfer_file(&task.source, &task.destination)
            .wrap_err_with(|| format!("Failed to transfer media: {}", media.local_path))?;

        if config.verbose {
            let label = match outcome {
                TransferOutcome::Linked => "Linked:   ",
                TransferOutcome::Copied => "Copied:   ",
                TransferOutcome::Unchanged => "Unchanged:",
            };
            pb.println(format!("{} {}", label, task.destination.display()));
        }
        summary.record(outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();

    if config.verbose {
        eprintln!(
            "Done. {} linked, {} copied, {} unchanged.",
            summary.linked, summary.copied, summary.unchanged
        );
    }

    Ok(summary)
}

fn progress_bar(total: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        )
        .map_err(|e| eyre!("Invalid progress template: {}", e))?
        .progress_chars("=>-"),
    );
    Ok(bar)
}
