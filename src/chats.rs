use eyre::{Context, Result, eyre};
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CHAT_QUERY: &str = "SELECT ZPARTNERNAME, ZCONTACTJID FROM ZWACHATSESSION";

/// Contact identifier → display name, built once from the chat session table.
#[derive(Debug, Default)]
pub struct ChatIndex {
    names: HashMap<String, String>,
}

impl ChatIndex {
    /// Read every chat session and create one folder per contact under `target_dir`.
    ///
    /// A contact identifier that shows up twice is a data-integrity violation and
    /// aborts the build before anything else happens.
    pub fn build(conn: &Connection, target_dir: &Path) -> Result<Self> {
        let mut stmt = conn
            .prepare(CHAT_QUERY)
            .wrap_err("Failed to prepare chat session query")?;
        let mut rows = stmt
            .query([])
            .wrap_err("Failed to execute chat session query")?;

        let mut index = ChatIndex::default();
        while let Some(row) = rows.next().wrap_err("Failed to read chat session row")? {
            let name: String = row.get(0).wrap_err("Failed to read chat partner name")?;
            let id: String = row.get(1).wrap_err("Failed to read chat contact identifier")?;

            let folder = contact_dir(target_dir, &name);
            index.insert(id, name)?;

            fs::create_dir_all(&folder).wrap_err_with(|| {
                format!("Failed to create contact folder: {}", folder.display())
            })?;
        }

        Ok(index)
    }

    fn insert(&mut self, id: String, name: String) -> Result<()> {
        if self.names.contains_key(&id) {
            return Err(eyre!("Duplicate chat identifier found: {}", id));
        }
        self.names.insert(id, name);
        Ok(())
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Folder for a contact's media. Names are used verbatim; only leading
/// separators are dropped so the folder stays under the target root.
pub fn contact_dir(target_dir: &Path, display_name: &str) -> PathBuf {
    target_dir.join(display_name.trim_start_matches('/'))
}
