//! # chat-media-export
//!
//! A CLI tool that copies chat media out of a messaging app's internal storage
//! into a folder tree you can browse, one folder per contact.
//!
//! ## What it does
//!
//! The app keeps its chat metadata in a SQLite database (`ChatStorage.sqlite`) and the
//! attachments themselves in a separate media folder. This tool reads the chat sessions
//! to learn each contact's display name, then walks every media item, works out which
//! contact it belongs to from its stored path, and places the file at
//!
//! ```text
//! <target>/<contact name>/<YYYYMMDDHHMMSS.mmm>.<ext>
//! ```
//!
//! where the timestamp is the message time in UTC. Files are hard-linked when the
//! target lives on the same filesystem and copied otherwise.
//!
//! The database is snapshotted and opened **read-only**, so your data is never modified.
//!
//! ## Failure model
//!
//! The run stops at the first problem: duplicate contact identifiers, media paths that
//! point at an unknown contact, malformed file names, or any I/O error. Files already
//! placed are left where they are, and re-running is safe because a destination that
//! already is the source file is skipped.
//!
//! ## Usage
//!
//! ```sh
//! chat-media-export -db ChatStorage.sqlite -media Message/Media -target ~/Pictures/Chats
//! ```
//!
//! Display names become folder names verbatim. Names containing `/` produce nested
//! folders.

pub mod chats;
pub mod media;
pub mod migrate;
pub mod transfer;
pub mod utils;
