//! A WordNet-LMF lexical-database engine: ingest Global WordNet LMF XML
//! and CILI TSV into a SQLite store, then query, traverse, and measure
//! similarity over the resulting lexicons.
//!
//! [`Wordnet`] is the read-only query façade; writes go through
//! [`ingest::ingest`] / [`ingest::remove`]. [`graph`]/[`similarity`]/[`ic`]
//! traverse the hypernym taxonomy; [`morphy`] is the rule-based
//! lemmatizer; [`export`] projects a store to JSON/XML/CSV.

pub mod archive;
pub mod config;
pub mod entities;
pub mod error;
pub mod export;
pub mod graph;
pub mod ic;
pub mod ili;
pub mod ingest;
pub mod models;
pub mod morphy;
pub mod parse;
pub mod progress;
pub mod project;
pub mod query;
pub mod similarity;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use models::PartOfSpeech;
pub use query::{LexiconSelector, Wordnet, WordnetOptions};

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Opens (creating if absent) the store at `config`'s data directory and
/// wraps it in a [`Wordnet`] façade reading every loaded lexicon.
///
/// This is the convenience most callers want; for finer control over the
/// lexicon selector or normalizer/lemmatizer, open the store with
/// [`store::open`] directly and construct [`Wordnet::new`].
pub async fn open(config: &Config) -> Result<Wordnet> {
    config.ensure_dirs()?;
    let conn = tokio::task::spawn_blocking({
        let path = config.store_path();
        move || store::open(&path)
    })
    .await??;
    Ok(Wordnet::new(
        Arc::new(Mutex::new(conn)),
        LexiconSelector::All,
        WordnetOptions::new(),
    ))
}

/// Closes out a connection gracefully; exposed for the signal-handling
/// shutdown path (the store otherwise relies on `Drop`).
pub fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| Error::Database(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_empty_store_in_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().to_path_buf());
        let wn = open(&config).await.unwrap();
        let stats = wn.get_statistics().await.unwrap();
        assert_eq!(stats.lexicon_count, 0);
    }
}
