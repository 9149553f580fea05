//! Ingestion pipeline: turns a WN-LMF or CILI file (optionally archived or
//! compressed) into rows in the store.

use crate::archive::materialize_plain_file;
use crate::entities::{Definition, Example, Form, Ili, Lexicon, Sense, Synset, Word};
use crate::error::{Error, Result};
use crate::ili::parse_cili_tsv;
use crate::parse::{parse_streaming, pre_scan, ParsedLexicon};
use crate::progress::{ProgressReporter, ProgressUpdate, report_progress_non_blocking};
use crate::store::{self, BatchInsertOptions};
use log::info;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::path::Path;

/// Options controlling a single [`ingest`] call.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Overwrite an existing lexicon with the same `(id, version)` instead
    /// of failing with `LexiconExists`.
    pub force: bool,
    /// Report counts and return without writing anything.
    pub dry_run: bool,
}

/// Summary returned by a dry-run ingest.
#[derive(Debug, Clone, Default)]
pub struct DryRunReport {
    pub lexicons_to_add: usize,
    pub words_to_write: usize,
    pub synsets_to_write: usize,
    pub updates: Vec<(String, String)>,
}

/// What kind of resource a file was sniffed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sniff {
    Lmf,
    Ili,
}

fn sniff(content: &str) -> Result<Sniff> {
    let head = &content[..content.len().min(2048)];
    if head.contains("<?xml") && head.to_lowercase().contains("lexicalresource") {
        return Ok(Sniff::Lmf);
    }
    if let Some(first_line) = content.lines().next() {
        let lower = first_line.to_lowercase();
        if lower.contains('\t') && lower.contains("ili") && lower.contains("status") {
            return Ok(Sniff::Ili);
        }
    }
    Err(Error::InvalidInput(
        "input is neither a recognizable WN-LMF document nor a CILI TSV file".into(),
    ))
}

/// Ingests `path` (optionally archived/compressed) into `conn`. Returns
/// `true` if every lexicon in the file already existed and was updated in
/// place, `false` if at least one was a fresh add.
pub async fn ingest(
    conn: &mut Connection,
    path: &Path,
    work_dir: &Path,
    opts: IngestOptions,
    reporter: Option<&ProgressReporter>,
) -> Result<bool> {
    let plain_path = materialize_plain_file(path, work_dir).await?;
    let content = tokio::fs::read_to_string(&plain_path).await?;

    match sniff(&content)? {
        Sniff::Lmf => ingest_lmf(conn, &content, opts, reporter).await,
        Sniff::Ili => ingest_ili(conn, &content, reporter).await,
    }
}

async fn ingest_lmf(
    conn: &mut Connection,
    content: &str,
    opts: IngestOptions,
    reporter: Option<&ProgressReporter>,
) -> Result<bool> {
    let (_version, estimate) = pre_scan(content)?;
    let lexicons = {
        let content = content.to_string();
        let reporter = reporter.cloned();
        tokio::task::spawn_blocking(move || {
            parse_streaming(&content, reporter.as_ref().map(|r| (r, estimate)))
        })
        .await??
    };

    if lexicons.is_empty() {
        return Err(Error::InvalidInput("document contains no Lexicon elements".into()));
    }

    let mut any_update = false;
    let mut all_updates = true;
    for lex in &lexicons {
        let exists = store::lexicon_exists(conn, &lex.lexicon.id, &lex.lexicon.version)?;
        if exists {
            any_update = true;
            if !opts.force {
                return Err(Error::LexiconExists(
                    lex.lexicon.id.clone(),
                    lex.lexicon.version.clone(),
                ));
            }
        } else {
            all_updates = false;
        }
    }

    if opts.dry_run {
        info!("dry run: {} lexicon(s), not writing", lexicons.len());
        return Ok(any_update && all_updates);
    }

    for lex in &lexicons {
        if store::lexicon_exists(conn, &lex.lexicon.id, &lex.lexicon.version)? {
            store::transaction(conn, |tx| {
                store::delete_lexicon_data(tx, &lex.lexicon.id, &lex.lexicon.version)
            })?;
        }
    }

    write_lmf_rows(conn, &lexicons, reporter)?;
    Ok(any_update && all_updates)
}

fn phase_report(reporter: Option<&ProgressReporter>, description: &str, fraction: f64) {
    if let Some(reporter) = reporter {
        report_progress_non_blocking(
            reporter,
            ProgressUpdate::new(
                description.to_string(),
                (fraction * 100.0) as u64,
                Some(100),
                None,
            ),
        );
    }
}

fn write_lmf_rows(
    conn: &mut Connection,
    lexicons: &[ParsedLexicon],
    reporter: Option<&ProgressReporter>,
) -> Result<()> {
    let opts = BatchInsertOptions::default();

    let lexicon_rows: Vec<Vec<SqlValue>> = lexicons.iter().map(|l| lexicon_row(&l.lexicon)).collect();
    phase_report(reporter, "Ingest: lexicons", 0.01);
    store::batch_insert(
        conn,
        "lexicons",
        &["id", "version", "label", "language", "email", "license", "url", "citation", "logo"],
        &lexicon_rows,
        "Ingest: lexicons",
        reporter,
        opts,
    )?;

    let word_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.words).map(word_row).collect();
    phase_report(reporter, "Ingest: words", 0.10);
    store::batch_insert(
        conn,
        "words",
        &["id", "lexicon_id", "lexicon_version", "lemma", "lemma_lower", "part_of_speech", "language"],
        &word_rows,
        "Ingest: words",
        reporter,
        opts,
    )?;

    let form_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.forms).map(form_row).collect();
    phase_report(reporter, "Ingest: forms", 0.30);
    store::batch_insert(
        conn,
        "forms",
        &["id", "word_id", "written_form", "written_form_lower", "script", "tag"],
        &form_rows,
        "Ingest: forms",
        reporter,
        opts,
    )?;

    let synset_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.synsets).map(synset_row).collect();
    phase_report(reporter, "Ingest: synsets", 0.40);
    store::batch_insert(
        conn,
        "synsets",
        &["id", "lexicon_id", "lexicon_version", "ili", "part_of_speech", "language"],
        &synset_rows,
        "Ingest: synsets",
        reporter,
        opts,
    )?;

    let def_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.definitions).map(definition_row).collect();
    phase_report(reporter, "Ingest: definitions", 0.50);
    store::batch_insert(
        conn,
        "definitions",
        &["id", "synset_id", "language", "text", "source"],
        &def_rows,
        "Ingest: definitions",
        reporter,
        opts,
    )?;

    // Synsets are already committed above, so this table scan also covers
    // this batch's own synsets; senses are inserted further below, so the
    // in-memory ids from this batch have to be added to what's on disk.
    let known_synset_ids: std::collections::HashSet<String> = {
        let mut stmt = conn.prepare("SELECT id FROM synsets")?;
        stmt.query_map([], |r| r.get(0))?.collect::<std::result::Result<_, _>>()?
    };
    let mut known_sense_ids: std::collections::HashSet<String> = {
        let mut stmt = conn.prepare("SELECT id FROM senses")?;
        stmt.query_map([], |r| r.get(0))?.collect::<std::result::Result<_, _>>()?
    };
    known_sense_ids.extend(lexicons.iter().flat_map(|l| &l.senses).map(|s| s.id.clone()));

    let mut synset_rel_rows = Vec::new();
    let mut sense_rel_rows = Vec::new();
    for lex in lexicons {
        for (id, source, target, rel_type) in &lex.synset_relations {
            if !known_synset_ids.contains(target.as_str()) {
                log::warn!(
                    "dropping synset relation {id} ({source} -{rel_type}-> {target}): target synset not found"
                );
                continue;
            }
            synset_rel_rows.push(vec![
                SqlValue::Text(id.clone()),
                SqlValue::Text(source.clone()),
                SqlValue::Text(target.clone()),
                SqlValue::Text(rel_type.clone()),
                SqlValue::Text(lex.lexicon.id.clone()),
            ]);
        }
        for (id, source, target, rel_type) in &lex.sense_relations {
            if !known_sense_ids.contains(target.as_str()) {
                log::warn!(
                    "dropping sense relation {id} ({source} -{rel_type}-> {target}): target sense not found"
                );
                continue;
            }
            sense_rel_rows.push(vec![
                SqlValue::Text(id.clone()),
                SqlValue::Text(source.clone()),
                SqlValue::Text(target.clone()),
                SqlValue::Text(rel_type.clone()),
                SqlValue::Text(lex.lexicon.id.clone()),
            ]);
        }
    }
    phase_report(reporter, "Ingest: relations", 0.60);
    store::batch_insert(
        conn,
        "synset_relations",
        &["id", "source_synset_id", "target_synset_id", "rel_type", "source_lexicon"],
        &synset_rel_rows,
        "Ingest: synset relations",
        reporter,
        opts,
    )?;
    store::batch_insert(
        conn,
        "sense_relations",
        &["id", "source_sense_id", "target_sense_id", "rel_type", "source_lexicon"],
        &sense_rel_rows,
        "Ingest: sense relations",
        reporter,
        opts,
    )?;

    let sense_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.senses).map(sense_row).collect();
    phase_report(reporter, "Ingest: senses", 0.70);
    store::batch_insert(
        conn,
        "senses",
        &[
            "id", "word_id", "synset_id", "source", "sensekey", "adjposition", "subcategory",
            "domain", "register", "lexicon_id", "lexicon_version",
        ],
        &sense_rows,
        "Ingest: senses",
        reporter,
        opts,
    )?;

    let example_rows: Vec<Vec<SqlValue>> = lexicons.iter().flat_map(|l| &l.examples).map(example_row).collect();
    phase_report(reporter, "Ingest: examples", 0.80);
    store::batch_insert(
        conn,
        "examples",
        &["id", "synset_id", "sense_id", "language", "text", "source"],
        &example_rows,
        "Ingest: examples",
        reporter,
        opts,
    )?;

    phase_report(reporter, "Ingest: complete", 1.0);
    Ok(())
}

async fn ingest_ili(
    conn: &mut Connection,
    content: &str,
    reporter: Option<&ProgressReporter>,
) -> Result<bool> {
    let content = content.to_string();
    let ilis = tokio::task::spawn_blocking(move || parse_cili_tsv(content.as_bytes())).await??;
    let rows: Vec<Vec<SqlValue>> = ilis.iter().map(ili_row).collect();
    store::batch_insert(
        conn,
        "ilis",
        &["id", "status", "definition", "superseded_by", "note", "meta"],
        &rows,
        "Ingest: ILI entries",
        reporter,
        BatchInsertOptions::default(),
    )?;
    Ok(false)
}

/// Removes every row belonging to `(lexicon_id, version)`.
pub fn remove(conn: &mut Connection, lexicon_id: &str, version: &str) -> Result<()> {
    store::transaction(conn, |tx| {
        store::delete_lexicon_data(tx, lexicon_id, version)
    })
}

fn opt(s: &Option<String>) -> SqlValue {
    match s {
        Some(v) => SqlValue::Text(v.clone()),
        None => SqlValue::Null,
    }
}

fn lexicon_row(l: &Lexicon) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(l.id.clone()),
        SqlValue::Text(l.version.clone()),
        SqlValue::Text(l.label.clone()),
        SqlValue::Text(l.language.clone()),
        opt(&l.email),
        opt(&l.license),
        opt(&l.url),
        opt(&l.citation),
        opt(&l.logo),
    ]
}

fn word_row(w: &Word) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(w.id.clone()),
        SqlValue::Text(w.lexicon_id.clone()),
        SqlValue::Text(w.lexicon_version.clone()),
        SqlValue::Text(w.lemma.clone()),
        SqlValue::Text(w.lemma.to_lowercase()),
        SqlValue::Text(w.part_of_speech.as_str().to_string()),
        SqlValue::Text(w.language.clone()),
    ]
}

fn form_row(f: &Form) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(f.id.clone()),
        SqlValue::Text(f.word_id.clone()),
        SqlValue::Text(f.written_form.clone()),
        SqlValue::Text(f.written_form.to_lowercase()),
        opt(&f.script),
        opt(&f.tag),
    ]
}

fn synset_row(s: &Synset) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(s.id.clone()),
        SqlValue::Text(s.lexicon_id.clone()),
        SqlValue::Text(s.lexicon_version.clone()),
        opt(&s.ili),
        SqlValue::Text(s.part_of_speech.as_str().to_string()),
        SqlValue::Text(s.language.clone()),
    ]
}

fn sense_row(s: &Sense) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(s.id.clone()),
        SqlValue::Text(s.word_id.clone()),
        SqlValue::Text(s.synset_id.clone()),
        opt(&s.source),
        opt(&s.sensekey),
        opt(&s.adjposition),
        opt(&s.subcategory),
        opt(&s.domain),
        opt(&s.register),
        SqlValue::Text(s.lexicon_id.clone()),
        SqlValue::Text(s.lexicon_version.clone()),
    ]
}

fn definition_row(d: &Definition) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(d.id.clone()),
        SqlValue::Text(d.synset_id.clone()),
        opt(&d.language),
        SqlValue::Text(d.text.clone()),
        opt(&d.source),
    ]
}

fn example_row(e: &Example) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(e.id.clone()),
        opt(&e.synset_id),
        opt(&e.sense_id),
        opt(&e.language),
        SqlValue::Text(e.text.clone()),
        opt(&e.source),
    ]
}

fn ili_row(i: &Ili) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(i.id.clone()),
        SqlValue::Text(i.status.clone()),
        opt(&i.definition),
        opt(&i.superseded_by),
        opt(&i.note),
        opt(&i.meta),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    const MINIMAL_LMF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<LexicalResource lmfVersion="1.3">
  <Lexicon id="test-en" label="Test" language="en" version="1.0" email="a@b.com" license="lic">
    <LexicalEntry id="w1">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="s1" synset="syn1"/>
    </LexicalEntry>
    <Synset id="syn1" partOfSpeech="n">
      <Definition>A small domesticated carnivorous mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>"#;

    #[tokio::test]
    async fn ingest_lmf_writes_all_tables() {
        let mut conn = open_in_memory().unwrap();
        let added = ingest_lmf(&mut conn, MINIMAL_LMF, IngestOptions::default(), None)
            .await
            .unwrap();
        assert!(!added);
        let words: i64 = conn.query_row("SELECT COUNT(*) FROM words", [], |r| r.get(0)).unwrap();
        assert_eq!(words, 1);
        let synsets: i64 = conn.query_row("SELECT COUNT(*) FROM synsets", [], |r| r.get(0)).unwrap();
        assert_eq!(synsets, 1);
    }

    #[tokio::test]
    async fn reingest_without_force_fails() {
        let mut conn = open_in_memory().unwrap();
        ingest_lmf(&mut conn, MINIMAL_LMF, IngestOptions::default(), None)
            .await
            .unwrap();
        let err = ingest_lmf(&mut conn, MINIMAL_LMF, IngestOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LexiconExists(_, _)));
    }

    #[tokio::test]
    async fn reingest_with_force_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        ingest_lmf(&mut conn, MINIMAL_LMF, IngestOptions::default(), None)
            .await
            .unwrap();
        let updated = ingest_lmf(
            &mut conn,
            MINIMAL_LMF,
            IngestOptions { force: true, dry_run: false },
            None,
        )
        .await
        .unwrap();
        assert!(updated);
        let words: i64 = conn.query_row("SELECT COUNT(*) FROM words", [], |r| r.get(0)).unwrap();
        assert_eq!(words, 1);
    }

    #[tokio::test]
    async fn dangling_relation_targets_are_dropped_not_rejected() {
        const LMF_WITH_DANGLING_RELATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<LexicalResource lmfVersion="1.3">
  <Lexicon id="test-en" label="Test" language="en" version="1.0" email="a@b.com" license="lic">
    <LexicalEntry id="w1">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="s1" synset="syn1"/>
    </LexicalEntry>
    <Synset id="syn1" partOfSpeech="n">
      <Definition>A small domesticated carnivorous mammal.</Definition>
      <SynsetRelation relType="hypernym" target="syn-missing"/>
    </Synset>
  </Lexicon>
</LexicalResource>"#;
        let mut conn = open_in_memory().unwrap();
        ingest_lmf(&mut conn, LMF_WITH_DANGLING_RELATION, IngestOptions::default(), None)
            .await
            .unwrap();
        let synsets: i64 = conn.query_row("SELECT COUNT(*) FROM synsets", [], |r| r.get(0)).unwrap();
        assert_eq!(synsets, 1);
        let relations: i64 =
            conn.query_row("SELECT COUNT(*) FROM synset_relations", [], |r| r.get(0)).unwrap();
        assert_eq!(relations, 0);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let mut conn = open_in_memory().unwrap();
        ingest_lmf(
            &mut conn,
            MINIMAL_LMF,
            IngestOptions { force: false, dry_run: true },
            None,
        )
        .await
        .unwrap();
        let words: i64 = conn.query_row("SELECT COUNT(*) FROM words", [], |r| r.get(0)).unwrap();
        assert_eq!(words, 0);
    }
}
