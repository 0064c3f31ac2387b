use crate::chats::{ChatIndex, contact_dir};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use eyre::{Context, Result, eyre};
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use std::path::{Path, PathBuf};

/// Media items joined with their parent message. Rows without a local path or a
/// section identifier never made it to disk, so they are filtered out here.
pub const MEDIA_QUERY: &str = "SELECT A.ZMEDIASECTIONID, A.ZMESSAGEDATE, B.ZMEDIALOCALPATH \
     FROM ZWAMESSAGE AS A INNER JOIN ZWAMEDIAITEM AS B ON A.Z_PK = B.ZMESSAGE \
     WHERE B.ZMEDIALOCALPATH != '' AND A.ZMEDIASECTIONID != '' \
     ORDER BY A.ZMEDIASECTIONID";

/// Seconds between 1970-01-01 and 2001-01-01 (the app's reference date).
pub const APP_EPOCH_OFFSET_SECS: i64 = 978_307_200;

const FILENAME_TIME_FORMAT: &str = "%Y%m%d%H%M%S%.3f";

/// Message timestamp as stored in the database.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawTimestamp {
    /// A textual datetime column value.
    Calendar(DateTime<Utc>),
    /// Fractional seconds since the app epoch (REAL or INTEGER storage).
    AppEpochSeconds(f64),
}

impl FromSql for RawTimestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Real(secs) => Ok(RawTimestamp::AppEpochSeconds(secs)),
            ValueRef::Integer(secs) => Ok(RawTimestamp::AppEpochSeconds(secs as f64)),
            ValueRef::Text(bytes) => {
                let text =
                    std::str::from_utf8(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                parse_calendar(text.trim())
                    .map(RawTimestamp::Calendar)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

impl RawTimestamp {
    /// Shift the stored value onto the Unix epoch.
    ///
    /// The offset is applied to both representations.
    pub fn to_utc(self) -> Result<DateTime<Utc>> {
        let base = match self {
            RawTimestamp::Calendar(dt) => dt,
            RawTimestamp::AppEpochSeconds(secs) => {
                if !secs.is_finite() {
                    return Err(eyre!("Unsupported date time: {}", secs));
                }
                let whole = secs.trunc();
                let nanos = ((secs - whole) * 1_000_000_000.0) as i64;
                TimeDelta::try_seconds(whole as i64)
                    .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
                    .and_then(|d| DateTime::UNIX_EPOCH.checked_add_signed(d))
                    .ok_or_else(|| eyre!("Date time out of range: {}", secs))?
            }
        };
        base.checked_add_signed(TimeDelta::seconds(APP_EPOCH_OFFSET_SECS))
            .ok_or_else(|| eyre!("Date time out of range: {}", base))
    }
}

/// Text layouts SQLite drivers commonly write for datetime columns.
/// Values without an offset are taken as UTC.
fn parse_calendar(text: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// `YYYYMMDDHHMMSS.mmm`, fixed width so names sort by time.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(FILENAME_TIME_FORMAT).to_string()
}

/// One eligible attachment row.
#[derive(Debug, Clone)]
pub struct MediaRow {
    pub section_id: String,
    pub timestamp: RawTimestamp,
    pub local_path: String,
}

impl MediaRow {
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(MediaRow {
            section_id: row.get(0).wrap_err("Failed to read media section identifier")?,
            timestamp: row.get(1).wrap_err("Unsupported date time")?,
            local_path: row.get(2).wrap_err("Failed to read media local path")?,
        })
    }

    /// Resolve where this attachment lives and where it should go.
    pub fn plan(
        &self,
        chats: &ChatIndex,
        media_dir: &Path,
        target_dir: &Path,
    ) -> Result<TransferTask> {
        let datetime = self
            .timestamp
            .to_utc()
            .wrap_err_with(|| format!("Bad timestamp for media: {}", self.local_path))?;

        let stripped = self.local_path.trim_start_matches('/');
        let parts: Vec<&str> = stripped.split('/').collect();
        if parts.len() < 2 {
            return Err(eyre!("Invalid media path: {}", stripped));
        }

        let contact = parts[1];
        let display_name = chats
            .display_name(contact)
            .ok_or_else(|| eyre!("Chat [{}] not found: {}", contact, stripped))?;

        let file_name = parts[parts.len() - 1];
        let extension =
            file_extension(file_name).ok_or_else(|| eyre!("Invalid file name: {}", stripped))?;

        let source = parts[1..]
            .iter()
            .fold(media_dir.to_path_buf(), |path, part| path.join(part));
        let destination = contact_dir(target_dir, display_name)
            .join(format!("{}.{}", format_timestamp(&datetime), extension));

        Ok(TransferTask {
            source,
            destination,
        })
    }
}

/// Extension of a `base.ext` name. Anything but exactly one dot is rejected.
fn file_extension(file_name: &str) -> Option<&str> {
    let (_, extension) = file_name.split_once('.')?;
    if extension.contains('.') {
        return None;
    }
    Some(extension)
}

/// Source/destination pair for a single attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub source: PathBuf,
    pub destination: PathBuf,
}
