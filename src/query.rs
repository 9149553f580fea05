//! Read-only query façade over the store.
//!
//! `Wordnet` is constructed against a lexicon selector (`id[:version]` or
//! `*`) plus a handful of options controlling normalization and fallback
//! lemmatization. It never mutates the store; all writes go through
//! [`crate::ingest`].

use crate::entities::{Definition, Example, Form, Ili, Lexicon, Relation, Sense, Synset, Word};
use crate::error::{Error, Result};
use crate::models::PartOfSpeech;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// A normalizing function applied to every incoming form query.
pub type Normalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// A fallback lemmatizer consulted when a direct form lookup finds
/// nothing: maps a surface form (and optional POS) to candidate lemmas per
/// POS.
pub type Lemmatizer =
    Arc<dyn Fn(&str, Option<PartOfSpeech>) -> Vec<(PartOfSpeech, String)> + Send + Sync>;

/// Selects which lexicon(s) a `Wordnet` instance reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconSelector {
    /// A specific `(id, version)` pair.
    Versioned(String, String),
    /// The most recent version of a given id (resolved lazily against the
    /// store, since "most recent" depends on what's actually loaded).
    Latest(String),
    /// Every lexicon in the store.
    All,
}

impl LexiconSelector {
    /// Parses `id[:version]` or the literal wildcard `*`.
    pub fn parse(spec: &str) -> Self {
        if spec == "*" {
            return LexiconSelector::All;
        }
        match spec.split_once(':') {
            Some((id, version)) => LexiconSelector::Versioned(id.to_string(), version.to_string()),
            None => LexiconSelector::Latest(spec.to_string()),
        }
    }
}

/// Construction options for [`Wordnet`].
#[derive(Clone, Default)]
pub struct WordnetOptions {
    /// Additional lexicon ids drawn on for cross-lexicon relation resolution.
    pub expand: Vec<String>,
    pub normalizer: Option<Normalizer>,
    pub lemmatizer: Option<Lemmatizer>,
    /// When false, the lemmatizer is never consulted even if configured.
    pub search_all_forms: bool,
    pub lang: Option<String>,
}

impl WordnetOptions {
    pub fn new() -> Self {
        WordnetOptions {
            search_all_forms: true,
            ..Default::default()
        }
    }
}

/// The read-only query façade.
#[derive(Clone)]
pub struct Wordnet {
    conn: Arc<Mutex<Connection>>,
    selector: LexiconSelector,
    options: WordnetOptions,
}

impl Wordnet {
    pub fn new(conn: Arc<Mutex<Connection>>, selector: LexiconSelector, options: WordnetOptions) -> Self {
        Wordnet { conn, selector, options }
    }

    fn normalize(&self, form: &str) -> String {
        match &self.options.normalizer {
            Some(f) => f(form),
            None => form.to_string(),
        }
    }

    /// Resolved `(id, version)` pairs this instance reads from, including
    /// any `expand` lexicons.
    fn resolved_lexicon_ids(&self, conn: &Connection) -> Result<Vec<(String, String)>> {
        let mut ids = match &self.selector {
            LexiconSelector::Versioned(id, version) => vec![(id.clone(), version.clone())],
            LexiconSelector::Latest(id) => {
                let version: Option<String> = conn
                    .query_row(
                        "SELECT version FROM lexicons WHERE id = ?1 ORDER BY version DESC LIMIT 1",
                        [id],
                        |r| r.get(0),
                    )
                    .optional()?;
                match version {
                    Some(v) => vec![(id.clone(), v)],
                    None => vec![],
                }
            }
            LexiconSelector::All => {
                let mut stmt = conn.prepare("SELECT id, version FROM lexicons")?;
                let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        for extra in &self.options.expand {
            let mut stmt = conn.prepare("SELECT id, version FROM lexicons WHERE id = ?1")?;
            let rows = stmt.query_map([extra], |r| Ok((r.get(0)?, r.get(1)?)))?;
            for row in rows {
                ids.push(row?);
            }
        }
        Ok(ids)
    }

    /// All lexicons matching this instance's selector and `lang` filter.
    pub async fn lexicons(&self) -> Result<Vec<Lexicon>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let ids = self.resolved_lexicon_ids(&conn)?;
        let mut out = Vec::new();
        for (id, version) in ids {
            if let Some(lex) = load_lexicon(&conn, &id, &version)? {
                if self.options.lang.as_deref().is_none_or(|l| l == lex.language) {
                    out.push(lex);
                }
            }
        }
        Ok(out)
    }

    fn lexicon_filter_sql(&self) -> (String, Vec<String>) {
        match &self.selector {
            LexiconSelector::Versioned(id, version) => (
                "lexicon_id = ? AND lexicon_version = ?".to_string(),
                vec![id.clone(), version.clone()],
            ),
            LexiconSelector::Latest(id) => ("lexicon_id = ?".to_string(), vec![id.clone()]),
            LexiconSelector::All => ("1=1".to_string(), vec![]),
        }
    }

    /// Words whose lemma or any form equals the normalized `form`,
    /// optionally restricted by POS. Falls back to the configured
    /// lemmatizer when nothing matches directly and `search_all_forms` is
    /// enabled.
    pub async fn words(&self, form: &str, pos: Option<PartOfSpeech>) -> Result<Vec<Word>> {
        let normalized = self.normalize(form);
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut words = self.words_direct(&conn, &normalized, pos)?;

        if words.is_empty() && self.options.search_all_forms {
            if let Some(lemmatizer) = &self.options.lemmatizer {
                for (candidate_pos, candidate_lemma) in lemmatizer(&normalized, pos) {
                    let extra = self.words_direct(&conn, &candidate_lemma, Some(candidate_pos))?;
                    words.extend(extra);
                }
                words.sort_by(|a, b| a.id.cmp(&b.id));
                words.dedup_by(|a, b| a.id == b.id);
            }
        }
        Ok(words)
    }

    fn words_direct(&self, conn: &Connection, form: &str, pos: Option<PartOfSpeech>) -> Result<Vec<Word>> {
        let (lex_sql, lex_params) = self.lexicon_filter_sql();
        let pos_sql = if pos.is_some() { " AND w.part_of_speech = ?" } else { "" };
        let sql = format!(
            "SELECT DISTINCT w.id, w.lemma, w.part_of_speech, w.language, w.lexicon_id, w.lexicon_version
             FROM words w LEFT JOIN forms f ON f.word_id = w.id
             WHERE (w.lemma_lower = ?1 OR f.written_form_lower = ?1) AND {}{}",
            lex_sql, pos_sql
        );
        let mut bind: Vec<String> = vec![form.to_lowercase()];
        bind.extend(lex_params);
        if let Some(p) = pos {
            bind.push(p.as_str().to_string());
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), word_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Every word of a given POS within this instance's selected
    /// lexicon(s), without a form filter. Used by consumers (Morphy) that
    /// need to scan the whole vocabulary rather than look up one form.
    pub async fn words_of_pos(&self, pos: PartOfSpeech) -> Result<Vec<Word>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let (lex_sql, lex_params) = self.lexicon_filter_sql();
        let sql = format!(
            "SELECT id, lemma, part_of_speech, language, lexicon_id, lexicon_version
             FROM words WHERE part_of_speech = ?1 AND {}",
            lex_sql
        );
        let mut bind: Vec<String> = vec![pos.as_str().to_string()];
        bind.extend(lex_params);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind.iter()), word_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// A single word by id, with its forms populated.
    pub async fn word(&self, id: &str) -> Result<Word> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        conn.query_row(
            "SELECT id, lemma, part_of_speech, language, lexicon_id, lexicon_version FROM words WHERE id = ?1",
            [id],
            word_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("word {}", id)))
    }

    /// The forms of a given word id, including the synthesized lemma form.
    pub async fn forms_of_word(&self, word_id: &str) -> Result<Vec<Form>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT id, word_id, written_form, script, tag FROM forms WHERE word_id = ?1",
        )?;
        let rows = stmt.query_map([word_id], |r| {
            Ok(Form {
                id: r.get(0)?,
                word_id: r.get(1)?,
                written_form: r.get(2)?,
                script: r.get(3)?,
                tag: r.get(4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Senses of words matching a form-based query.
    pub async fn senses_by_form(&self, form: &str, pos: Option<PartOfSpeech>) -> Result<Vec<Sense>> {
        let words = self.words(form, pos).await?;
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut out = Vec::new();
        for word in words {
            out.extend(senses_for_word(&conn, &word.id)?);
        }
        Ok(out)
    }

    /// Senses attached to a specific word id.
    pub async fn senses_of_word(&self, word_id: &str) -> Result<Vec<Sense>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        senses_for_word(&conn, word_id)
    }

    /// A single sense by id, with its examples populated.
    pub async fn sense(&self, id: &str) -> Result<Sense> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        conn.query_row(
            "SELECT id, word_id, synset_id, source, sensekey, adjposition, subcategory, domain,
                    register, lexicon_id, lexicon_version
             FROM senses WHERE id = ?1",
            [id],
            sense_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("sense {}", id)))
    }

    /// Examples owned by a given sense.
    pub async fn examples_of_sense(&self, sense_id: &str) -> Result<Vec<Example>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        examples_where(&conn, "sense_id = ?1", sense_id)
    }

    /// Union of synsets reachable from senses matching the form query,
    /// optionally further restricted by an ILI id.
    pub async fn synsets(
        &self,
        form: &str,
        pos: Option<PartOfSpeech>,
        ili: Option<&str>,
    ) -> Result<Vec<Synset>> {
        let senses = self.senses_by_form(form, pos).await?;
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for sense in senses {
            if seen.insert(sense.synset_id.clone()) {
                if let Some(synset) = load_synset(&conn, &sense.synset_id)? {
                    if ili.is_none_or(|want| synset.ili.as_deref() == Some(want)) {
                        out.push(synset);
                    }
                }
            }
        }
        Ok(out)
    }

    /// A full synset: definitions, relations, members, senses, examples.
    pub async fn synset(&self, id: &str) -> Result<Synset> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        load_synset(&conn, id)?.ok_or_else(|| Error::NotFound(format!("synset {}", id)))
    }

    pub async fn definitions_of_synset(&self, synset_id: &str) -> Result<Vec<Definition>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT id, synset_id, language, text, source FROM definitions WHERE synset_id = ?1",
        )?;
        let rows = stmt.query_map([synset_id], |r| {
            Ok(Definition {
                id: r.get(0)?,
                synset_id: r.get(1)?,
                language: r.get(2)?,
                text: r.get(3)?,
                source: r.get(4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    pub async fn examples_of_synset(&self, synset_id: &str) -> Result<Vec<Example>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        examples_where(&conn, "synset_id = ?1", synset_id)
    }

    /// Outbound relations from a synset.
    pub async fn relations_of_synset(&self, synset_id: &str) -> Result<Vec<Relation>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT id, source_synset_id, target_synset_id, rel_type, source_lexicon
             FROM synset_relations WHERE source_synset_id = ?1",
        )?;
        let rows = stmt.query_map([synset_id], relation_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Outbound relations from a sense.
    pub async fn relations_of_sense(&self, sense_id: &str) -> Result<Vec<Relation>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT id, source_sense_id, target_sense_id, rel_type, source_lexicon
             FROM sense_relations WHERE source_sense_id = ?1",
        )?;
        let rows = stmt.query_map([sense_id], relation_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    pub async fn ili(&self, id: &str) -> Result<Ili> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        conn.query_row(
            "SELECT id, status, definition, superseded_by, note, meta FROM ilis WHERE id = ?1",
            [id],
            ili_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("ili {}", id)))
    }

    pub async fn ilis(&self, status: Option<&str>) -> Result<Vec<Ili>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let sql = match status {
            Some(_) => "SELECT id, status, definition, superseded_by, note, meta FROM ilis WHERE status = ?1",
            None => "SELECT id, status, definition, superseded_by, note, meta FROM ilis",
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = match status {
            Some(s) => stmt.query_map([s], ili_from_row)?.collect::<std::result::Result<Vec<_>, _>>(),
            None => stmt.query_map([], ili_from_row)?.collect::<std::result::Result<Vec<_>, _>>(),
        };
        rows.map_err(Error::from)
    }

    // --- Statistics -----------------------------------------------------

    pub async fn get_statistics(&self) -> Result<Statistics> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        Ok(Statistics {
            lexicon_count: count(&conn, "lexicons")?,
            word_count: count(&conn, "words")?,
            synset_count: count(&conn, "synsets")?,
            sense_count: count(&conn, "senses")?,
            ili_count: count(&conn, "ilis")?,
        })
    }

    pub async fn get_lexicon_statistics(&self, lexicon_id: &str, version: &str) -> Result<LexiconStatistics> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let word_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM words WHERE lexicon_id = ?1 AND lexicon_version = ?2",
            [lexicon_id, version],
            |r| r.get(0),
        )?;
        let synset_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2",
            [lexicon_id, version],
            |r| r.get(0),
        )?;
        let sense_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM senses WHERE lexicon_id = ?1 AND lexicon_version = ?2",
            [lexicon_id, version],
            |r| r.get(0),
        )?;
        Ok(LexiconStatistics { word_count, synset_count, sense_count })
    }

    pub async fn get_part_of_speech_distribution(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT part_of_speech, COUNT(*) FROM words GROUP BY part_of_speech ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Distribution of synset sizes (member count), capped at the 20 most
    /// common sizes.
    pub async fn get_synset_size_analysis(&self) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let mut stmt = conn.prepare(
            "SELECT size, COUNT(*) as freq FROM (
                SELECT synset_id, COUNT(*) as size FROM senses GROUP BY synset_id
             ) GROUP BY size ORDER BY freq DESC LIMIT 20",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Basic data-quality signals: dangling relation targets, synsets with
    /// no definitions, words with no senses.
    pub async fn get_data_quality_metrics(&self) -> Result<DataQualityMetrics> {
        let conn = self.conn.lock().map_err(|_| Error::Internal("mutex poisoned".into()))?;
        let dangling_synset_relations: i64 = conn.query_row(
            "SELECT COUNT(*) FROM synset_relations r
             WHERE NOT EXISTS (SELECT 1 FROM synsets s WHERE s.id = r.target_synset_id)",
            [],
            |r| r.get(0),
        )?;
        let synsets_without_definitions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM synsets s
             WHERE NOT EXISTS (SELECT 1 FROM definitions d WHERE d.synset_id = s.id)",
            [],
            |r| r.get(0),
        )?;
        let words_without_senses: i64 = conn.query_row(
            "SELECT COUNT(*) FROM words w
             WHERE NOT EXISTS (SELECT 1 FROM senses s WHERE s.word_id = w.id)",
            [],
            |r| r.get(0),
        )?;
        Ok(DataQualityMetrics {
            dangling_synset_relations,
            synsets_without_definitions,
            words_without_senses,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    pub lexicon_count: i64,
    pub word_count: i64,
    pub synset_count: i64,
    pub sense_count: i64,
    pub ili_count: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconStatistics {
    pub word_count: i64,
    pub synset_count: i64,
    pub sense_count: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataQualityMetrics {
    pub dangling_synset_relations: i64,
    pub synsets_without_definitions: i64,
    pub words_without_senses: i64,
}

fn count(conn: &Connection, table: &str) -> Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .map_err(Error::from)
}

fn pos_from_str(s: String) -> PartOfSpeech {
    PartOfSpeech::from_str(&s).unwrap_or_default()
}

fn word_from_row(row: &rusqlite::Row) -> rusqlite::Result<Word> {
    Ok(Word {
        id: row.get(0)?,
        lemma: row.get(1)?,
        part_of_speech: pos_from_str(row.get(2)?),
        language: row.get(3)?,
        lexicon_id: row.get(4)?,
        lexicon_version: row.get(5)?,
    })
}

fn sense_from_row(row: &rusqlite::Row) -> rusqlite::Result<Sense> {
    Ok(Sense {
        id: row.get(0)?,
        word_id: row.get(1)?,
        synset_id: row.get(2)?,
        source: row.get(3)?,
        sensekey: row.get(4)?,
        adjposition: row.get(5)?,
        subcategory: row.get(6)?,
        domain: row.get(7)?,
        register: row.get(8)?,
        lexicon_id: row.get(9)?,
        lexicon_version: row.get(10)?,
    })
}

fn relation_from_row(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    Ok(Relation {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        rel_type: row.get(3)?,
        source_lexicon: row.get(4)?,
    })
}

fn ili_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ili> {
    Ok(Ili {
        id: row.get(0)?,
        status: row.get(1)?,
        definition: row.get(2)?,
        superseded_by: row.get(3)?,
        note: row.get(4)?,
        meta: row.get(5)?,
    })
}

fn senses_for_word(conn: &Connection, word_id: &str) -> Result<Vec<Sense>> {
    let mut stmt = conn.prepare(
        "SELECT id, word_id, synset_id, source, sensekey, adjposition, subcategory, domain,
                register, lexicon_id, lexicon_version
         FROM senses WHERE word_id = ?1",
    )?;
    let rows = stmt.query_map([word_id], sense_from_row)?;
    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
}

fn examples_where(conn: &Connection, clause: &str, arg: &str) -> Result<Vec<Example>> {
    let sql = format!(
        "SELECT id, synset_id, sense_id, language, text, source FROM examples WHERE {}",
        clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([arg], |r| {
        Ok(Example {
            id: r.get(0)?,
            synset_id: r.get(1)?,
            sense_id: r.get(2)?,
            language: r.get(3)?,
            text: r.get(4)?,
            source: r.get(5)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
}

fn load_lexicon(conn: &Connection, id: &str, version: &str) -> Result<Option<Lexicon>> {
    conn.query_row(
        "SELECT id, label, language, version, email, license, url, citation, logo
         FROM lexicons WHERE id = ?1 AND version = ?2",
        [id, version],
        |r| {
            Ok(Lexicon {
                id: r.get(0)?,
                label: r.get(1)?,
                language: r.get(2)?,
                version: r.get(3)?,
                email: r.get(4)?,
                license: r.get(5)?,
                url: r.get(6)?,
                citation: r.get(7)?,
                logo: r.get(8)?,
            })
        },
    )
    .optional()
    .map_err(Error::from)
}

fn load_synset(conn: &Connection, id: &str) -> Result<Option<Synset>> {
    let base = conn
        .query_row(
            "SELECT id, lexicon_id, lexicon_version, ili, part_of_speech, language
             FROM synsets WHERE id = ?1",
            [id],
            |r| {
                let pos: String = r.get(4)?;
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    pos,
                    r.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, lexicon_id, lexicon_version, ili, pos, language)) = base else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT id, word_id FROM senses WHERE synset_id = ?1")?;
    let pairs: Vec<(String, String)> = stmt
        .query_map([&id], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let senses: Vec<String> = pairs.iter().map(|(s, _)| s.clone()).collect();
    let mut members: Vec<String> = pairs.into_iter().map(|(_, w)| w).collect();
    members.sort();
    members.dedup();

    Ok(Some(Synset {
        id,
        part_of_speech: pos_from_str(pos),
        ili,
        language,
        lexicon_id,
        lexicon_version,
        members,
        senses,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, IngestOptions};
    use crate::store::open_in_memory;

    async fn seeded_wordnet() -> (Wordnet, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        let xml = dir.path().join("wn.xml");
        std::fs::write(
            &xml,
            r#"<?xml version="1.0"?><LexicalResource lmfVersion="1.3">
  <Lexicon id="test" label="Test" language="en" version="1.0">
    <LexicalEntry id="w1">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="s1" synset="syn1"/>
    </LexicalEntry>
    <Synset id="syn1" partOfSpeech="n">
      <Definition>A small domesticated carnivorous mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>"#,
        )
        .unwrap();
        ingest(&mut conn, &xml, dir.path(), IngestOptions::default(), None)
            .await
            .unwrap();
        let wn = Wordnet::new(
            Arc::new(Mutex::new(conn)),
            LexiconSelector::All,
            WordnetOptions::new(),
        );
        (wn, dir)
    }

    #[tokio::test]
    async fn looks_up_word_by_form() {
        let (wn, _dir) = seeded_wordnet().await;
        let words = wn.words("cat", None).await.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].lemma, "cat");
    }

    #[tokio::test]
    async fn synset_round_trips_definitions_and_members() {
        let (wn, _dir) = seeded_wordnet().await;
        let synset = wn.synset("syn1").await.unwrap();
        assert_eq!(synset.members, vec!["w1".to_string()]);
        let defs = wn.definitions_of_synset("syn1").await.unwrap();
        assert_eq!(defs[0].text, "A small domesticated carnivorous mammal.");
    }

    #[tokio::test]
    async fn missing_word_is_not_found() {
        let (wn, _dir) = seeded_wordnet().await;
        let err = wn.word("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
