//! Persistent, indexed relational storage of lexicons, words, forms,
//! senses, synsets, definitions, examples, relations, and ILI entries.
//!
//! The concrete backend is embedded SQLite (one file per data directory),
//! opened with WAL journaling the way the teacher's connection setup did.
//! Unlike the teacher's `db.rs`, which looped a `prepare`d statement per
//! table over the in-memory `LexicalResource`, writes here go through one
//! generic [`batch_insert`] that chunks rows to the SQL parameter limit and
//! groups chunks into bounded outer transactions, since the ingestor now
//! feeds rows incrementally from a streaming parser rather than a fully
//! materialized document tree.

use crate::error::{Error, Result};
use crate::progress::{ProgressReporter, ProgressUpdate, report_progress_non_blocking};
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, Transaction, params, types::Value as SqlValue};
use std::path::Path;

const SCHEMA_VERSION: u32 = 1;

/// SQLite's default compiled-in limit on bound parameters per statement is
/// 999; this keeps a safety margin below that.
pub const MAX_VARS: usize = 900;

/// Default number of rows grouped into one outer transaction by
/// `batch_insert`, bounding WAL/journal growth for very large inserts.
pub const DEFAULT_TRANSACTION_CHUNK_SIZE: usize = 10_000;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_LEXICONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lexicons (
    id TEXT NOT NULL,
    version TEXT NOT NULL,
    label TEXT NOT NULL,
    language TEXT NOT NULL,
    email TEXT,
    license TEXT,
    url TEXT,
    citation TEXT,
    logo TEXT,
    PRIMARY KEY (id, version)
);";

const CREATE_WORDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS words (
    id TEXT PRIMARY KEY,
    lexicon_id TEXT NOT NULL,
    lexicon_version TEXT NOT NULL,
    lemma TEXT NOT NULL,
    lemma_lower TEXT NOT NULL,
    part_of_speech TEXT NOT NULL,
    language TEXT NOT NULL,
    FOREIGN KEY (lexicon_id, lexicon_version) REFERENCES lexicons(id, version)
);";

const CREATE_FORMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS forms (
    id TEXT PRIMARY KEY,
    word_id TEXT NOT NULL,
    written_form TEXT NOT NULL,
    written_form_lower TEXT NOT NULL,
    script TEXT,
    tag TEXT,
    FOREIGN KEY (word_id) REFERENCES words(id)
);";

const CREATE_SYNSETS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synsets (
    id TEXT PRIMARY KEY,
    lexicon_id TEXT NOT NULL,
    lexicon_version TEXT NOT NULL,
    ili TEXT,
    part_of_speech TEXT NOT NULL,
    language TEXT NOT NULL,
    FOREIGN KEY (lexicon_id, lexicon_version) REFERENCES lexicons(id, version)
);";

const CREATE_SENSES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS senses (
    id TEXT PRIMARY KEY,
    word_id TEXT NOT NULL,
    synset_id TEXT NOT NULL,
    source TEXT,
    sensekey TEXT,
    adjposition TEXT,
    subcategory TEXT,
    domain TEXT,
    register TEXT,
    lexicon_id TEXT NOT NULL,
    lexicon_version TEXT NOT NULL,
    FOREIGN KEY (word_id) REFERENCES words(id),
    FOREIGN KEY (synset_id) REFERENCES synsets(id)
);";

const CREATE_DEFINITIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS definitions (
    id TEXT PRIMARY KEY,
    synset_id TEXT NOT NULL,
    language TEXT,
    text TEXT NOT NULL,
    source TEXT,
    FOREIGN KEY (synset_id) REFERENCES synsets(id)
);";

const CREATE_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS examples (
    id TEXT PRIMARY KEY,
    synset_id TEXT,
    sense_id TEXT,
    language TEXT,
    text TEXT NOT NULL,
    source TEXT,
    FOREIGN KEY (synset_id) REFERENCES synsets(id),
    FOREIGN KEY (sense_id) REFERENCES senses(id)
);";

const CREATE_SENSE_RELATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS sense_relations (
    id TEXT PRIMARY KEY,
    source_sense_id TEXT NOT NULL,
    target_sense_id TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    source_lexicon TEXT,
    FOREIGN KEY (source_sense_id) REFERENCES senses(id),
    FOREIGN KEY (target_sense_id) REFERENCES senses(id)
);";

const CREATE_SYNSET_RELATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synset_relations (
    id TEXT PRIMARY KEY,
    source_synset_id TEXT NOT NULL,
    target_synset_id TEXT NOT NULL,
    rel_type TEXT NOT NULL,
    source_lexicon TEXT,
    FOREIGN KEY (source_synset_id) REFERENCES synsets(id),
    FOREIGN KEY (target_synset_id) REFERENCES synsets(id)
);";

const CREATE_ILIS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS ilis (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    definition TEXT,
    superseded_by TEXT,
    note TEXT,
    meta TEXT
);";

macro_rules! create_index {
    ($name:ident, $index_name:expr, $table:expr, $columns:expr) => {
        const $name: &str = concat!(
            "CREATE INDEX IF NOT EXISTS ",
            $index_name,
            " ON ",
            $table,
            " (",
            $columns,
            ");"
        );
    };
}

create_index!(IDX_WORD_LEMMA, "idx_word_lemma", "words", "lemma_lower");
create_index!(IDX_WORD_LANGUAGE, "idx_word_language", "words", "language");
create_index!(
    IDX_WORD_LEXICON,
    "idx_word_lexicon",
    "words",
    "lexicon_id, lexicon_version"
);
create_index!(
    IDX_WORD_LEMMA_POS,
    "idx_word_lemma_pos",
    "words",
    "lemma_lower, part_of_speech"
);
create_index!(
    IDX_FORM_WRITTEN,
    "idx_form_written",
    "forms",
    "written_form_lower"
);
create_index!(IDX_FORM_WORD, "idx_form_word", "forms", "word_id");
create_index!(
    IDX_SYNSET_LANGUAGE,
    "idx_synset_language",
    "synsets",
    "language"
);
create_index!(
    IDX_SYNSET_LEXICON,
    "idx_synset_lexicon",
    "synsets",
    "lexicon_id, lexicon_version"
);
create_index!(IDX_SENSE_WORD, "idx_sense_word", "senses", "word_id");
create_index!(IDX_SENSE_SYNSET, "idx_sense_synset", "senses", "synset_id");
create_index!(
    IDX_EXAMPLE_SYNSET,
    "idx_example_synset",
    "examples",
    "synset_id"
);
create_index!(
    IDX_EXAMPLE_SENSE,
    "idx_example_sense",
    "examples",
    "sense_id"
);
create_index!(
    IDX_DEFINITION_SYNSET,
    "idx_definition_synset",
    "definitions",
    "synset_id"
);
create_index!(
    IDX_SENSE_REL_SOURCE,
    "idx_sense_rel_source",
    "sense_relations",
    "source_sense_id, rel_type"
);
create_index!(
    IDX_SENSE_REL_TARGET,
    "idx_sense_rel_target",
    "sense_relations",
    "target_sense_id"
);
create_index!(
    IDX_SYNSET_REL_SOURCE,
    "idx_synset_rel_source",
    "synset_relations",
    "source_synset_id, rel_type"
);
create_index!(
    IDX_SYNSET_REL_TARGET,
    "idx_synset_rel_target",
    "synset_relations",
    "target_synset_id"
);

/// Opens (creating if absent) the SQLite file at `path` with WAL journaling
/// and foreign-key enforcement enabled, then runs [`initialize`].
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    initialize(&mut conn)?;
    Ok(conn)
}

/// Opens an in-memory store, primarily for tests.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", true)?;
    initialize(&mut conn)?;
    Ok(conn)
}

/// Creates all tables and indexes if absent, and records/validates the
/// schema version. Idempotent.
pub fn initialize(conn: &mut Connection) -> Result<()> {
    info!("initializing store schema (version {})", SCHEMA_VERSION);
    let tx = conn.transaction()?;

    tx.execute(CREATE_METADATA_TABLE, [])?;
    tx.execute(CREATE_LEXICONS_TABLE, [])?;
    tx.execute(CREATE_WORDS_TABLE, [])?;
    tx.execute(CREATE_FORMS_TABLE, [])?;
    tx.execute(CREATE_SYNSETS_TABLE, [])?;
    tx.execute(CREATE_SENSES_TABLE, [])?;
    tx.execute(CREATE_DEFINITIONS_TABLE, [])?;
    tx.execute(CREATE_EXAMPLES_TABLE, [])?;
    tx.execute(CREATE_SENSE_RELATIONS_TABLE, [])?;
    tx.execute(CREATE_SYNSET_RELATIONS_TABLE, [])?;
    tx.execute(CREATE_ILIS_TABLE, [])?;

    tx.execute(IDX_WORD_LEMMA, [])?;
    tx.execute(IDX_WORD_LANGUAGE, [])?;
    tx.execute(IDX_WORD_LEXICON, [])?;
    tx.execute(IDX_WORD_LEMMA_POS, [])?;
    tx.execute(IDX_FORM_WRITTEN, [])?;
    tx.execute(IDX_FORM_WORD, [])?;
    tx.execute(IDX_SYNSET_LANGUAGE, [])?;
    tx.execute(IDX_SYNSET_LEXICON, [])?;
    tx.execute(IDX_SENSE_WORD, [])?;
    tx.execute(IDX_SENSE_SYNSET, [])?;
    tx.execute(IDX_EXAMPLE_SYNSET, [])?;
    tx.execute(IDX_EXAMPLE_SENSE, [])?;
    tx.execute(IDX_DEFINITION_SYNSET, [])?;
    tx.execute(IDX_SENSE_REL_SOURCE, [])?;
    tx.execute(IDX_SENSE_REL_TARGET, [])?;
    tx.execute(IDX_SYNSET_REL_SOURCE, [])?;
    tx.execute(IDX_SYNSET_REL_TARGET, [])?;

    let existing: Option<String> = tx
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(v) => {
            let existing_version: u32 = v
                .parse()
                .map_err(|e| Error::ParseError(format!("bad schema_version '{}': {}", v, e)))?;
            if existing_version < SCHEMA_VERSION {
                warn!(
                    "store schema ({}) older than expected ({}); updating metadata",
                    existing_version, SCHEMA_VERSION
                );
                tx.execute(
                    "UPDATE metadata SET value = ?1 WHERE key = 'schema_version'",
                    params![SCHEMA_VERSION.to_string()],
                )?;
            } else if existing_version > SCHEMA_VERSION {
                warn!(
                    "store schema ({}) newer than expected ({}); proceeding anyway",
                    existing_version, SCHEMA_VERSION
                );
            } else {
                debug!("store schema version matches ({})", existing_version);
            }
        }
        None => {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
        }
    }

    tx.commit()?;
    info!("store schema initialization complete");
    Ok(())
}

/// Options controlling [`batch_insert`]'s chunking behavior.
#[derive(Debug, Clone, Copy)]
pub struct BatchInsertOptions {
    pub transaction_chunk_size: usize,
}

impl Default for BatchInsertOptions {
    fn default() -> Self {
        BatchInsertOptions {
            transaction_chunk_size: DEFAULT_TRANSACTION_CHUNK_SIZE,
        }
    }
}

fn report(reporter: Option<&ProgressReporter>, update: ProgressUpdate) {
    if let Some(reporter) = reporter {
        report_progress_non_blocking(reporter, update);
    }
}

/// The key write path: `INSERT OR REPLACE` of `rows` into `table` under
/// `columns`, chunked to the SQL parameter limit and grouped into bounded
/// outer transactions.
///
/// `rows` with 0 entries is a no-op. Every row must have the same arity as
/// `columns`, or `InvalidInput` is returned and nothing is written.
pub fn batch_insert(
    conn: &mut Connection,
    table: &str,
    columns: &[&str],
    rows: &[Vec<SqlValue>],
    stage_description: &str,
    reporter: Option<&ProgressReporter>,
    opts: BatchInsertOptions,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    if columns.is_empty() {
        return Err(Error::InvalidInput(
            "batch_insert requires at least one column".into(),
        ));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
        return Err(Error::InvalidInput(format!(
            "row {} has {} values, expected {} to match columns",
            bad,
            rows[bad].len(),
            columns.len()
        )));
    }

    let rows_per_stmt = (MAX_VARS / columns.len()).max(1);
    let total = rows.len() as u64;
    let mut inserted: u64 = 0;
    let mut last_reported_fraction: f64 = 0.0;

    let placeholders: String = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );

    for outer_chunk in rows.chunks(opts.transaction_chunk_size) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for stmt_chunk in outer_chunk.chunks(rows_per_stmt) {
                for row in stmt_chunk {
                    stmt.execute(rusqlite::params_from_iter(row.iter()))?;
                    inserted += 1;
                }
                let fraction = inserted as f64 / total as f64;
                if fraction - last_reported_fraction >= 0.05 || inserted == total {
                    report(
                        reporter,
                        ProgressUpdate::new(
                            stage_description.to_string(),
                            inserted,
                            Some(total),
                            Some(format!("{} rows into {}", inserted, table)),
                        ),
                    );
                    last_reported_fraction = fraction;
                }
            }
        }
        tx.commit()?;
    }

    Ok(())
}

/// Runs `f` inside a single ACID transaction; any `Err` returned by `f`
/// rolls the transaction back instead of committing.
pub fn transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Transaction) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

/// Deletes every row belonging to `(lexicon_id, lexicon_version)`, children
/// before parents, inside the caller's transaction.
pub fn delete_lexicon_data(tx: &Transaction, lexicon_id: &str, lexicon_version: &str) -> Result<()> {
    info!("removing lexicon {}:{}", lexicon_id, lexicon_version);
    tx.execute(
        "DELETE FROM sense_relations WHERE source_sense_id IN
            (SELECT id FROM senses WHERE lexicon_id = ?1 AND lexicon_version = ?2)
         OR target_sense_id IN
            (SELECT id FROM senses WHERE lexicon_id = ?1 AND lexicon_version = ?2)",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM synset_relations WHERE source_synset_id IN
            (SELECT id FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2)
         OR target_synset_id IN
            (SELECT id FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2)",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM examples WHERE synset_id IN
            (SELECT id FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2)
         OR sense_id IN
            (SELECT id FROM senses WHERE lexicon_id = ?1 AND lexicon_version = ?2)",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM definitions WHERE synset_id IN
            (SELECT id FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2)",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM senses WHERE lexicon_id = ?1 AND lexicon_version = ?2",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM forms WHERE word_id IN
            (SELECT id FROM words WHERE lexicon_id = ?1 AND lexicon_version = ?2)",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM words WHERE lexicon_id = ?1 AND lexicon_version = ?2",
        params![lexicon_id, lexicon_version],
    )?;
    tx.execute(
        "DELETE FROM lexicons WHERE id = ?1 AND version = ?2",
        params![lexicon_id, lexicon_version],
    )?;
    Ok(())
}

/// Whether a lexicon with this `(id, version)` already exists.
pub fn lexicon_exists(conn: &Connection, lexicon_id: &str, version: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM lexicons WHERE id = ?1 AND version = ?2",
        params![lexicon_id, version],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        initialize(&mut conn).unwrap();
    }

    #[test]
    fn batch_insert_rejects_arity_mismatch() {
        let mut conn = open_in_memory().unwrap();
        let rows = vec![vec![SqlValue::Text("a".into())]];
        let err = batch_insert(
            &mut conn,
            "ilis",
            &["id", "status"],
            &rows,
            "test",
            None,
            BatchInsertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn batch_insert_empty_rows_is_noop() {
        let mut conn = open_in_memory().unwrap();
        batch_insert(
            &mut conn,
            "ilis",
            &["id", "status"],
            &[],
            "test",
            None,
            BatchInsertOptions::default(),
        )
        .unwrap();
    }

    #[test]
    fn batch_insert_then_lexicon_exists() {
        let mut conn = open_in_memory().unwrap();
        let rows = vec![vec![
            SqlValue::Text("oewn".into()),
            SqlValue::Text("2021".into()),
            SqlValue::Text("Open English WordNet".into()),
            SqlValue::Text("en".into()),
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Null,
        ]];
        batch_insert(
            &mut conn,
            "lexicons",
            &[
                "id", "version", "label", "language", "email", "license", "url", "citation",
                "logo",
            ],
            &rows,
            "test",
            None,
            BatchInsertOptions::default(),
        )
        .unwrap();
        assert!(lexicon_exists(&conn, "oewn", "2021").unwrap());
        assert!(!lexicon_exists(&conn, "oewn", "2020").unwrap());
    }

    #[test]
    fn delete_lexicon_data_removes_rows() {
        let mut conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO lexicons (id, version, label, language) VALUES ('x', '1', 'X', 'en')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO words (id, lexicon_id, lexicon_version, lemma, lemma_lower, part_of_speech, language)
             VALUES ('w1', 'x', '1', 'cat', 'cat', 'n', 'en')",
            [],
        )
        .unwrap();
        transaction(&mut conn, |tx| {
            delete_lexicon_data(tx, "x", "1")?;
            Ok(())
        })
        .unwrap();
        assert!(!lexicon_exists(&conn, "x", "1").unwrap());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM words", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
