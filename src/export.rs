//! Export: projects the store into JSON, LMF-mirroring XML, or a flat CSV.
//!
//! Exports are lossless within the target format's expressiveness but are
//! a projection, not a transaction-backed read — callers wanting a
//! consistent snapshot should wrap the call in [`crate::store::transaction`].

use crate::error::Result;
use crate::models;
use rusqlite::Connection;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Xml,
    Csv,
}

/// Which lexicons to include; `None` means every lexicon in the store.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub lexicons: Option<Vec<(String, String)>>,
}

#[derive(Debug, Serialize)]
struct JsonExport {
    lexicons: Vec<JsonLexicon>,
    export_date: u64,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct JsonLexicon {
    #[serde(flatten)]
    lexicon: crate::entities::Lexicon,
    words: Vec<JsonWord>,
    synsets: Vec<JsonSynset>,
}

#[derive(Debug, Serialize)]
struct JsonWord {
    #[serde(flatten)]
    word: crate::entities::Word,
    forms: Vec<crate::entities::Form>,
    senses: Vec<crate::entities::Sense>,
}

#[derive(Debug, Serialize)]
struct JsonSynset {
    #[serde(flatten)]
    synset: crate::entities::Synset,
    definitions: Vec<crate::entities::Definition>,
    examples: Vec<crate::entities::Example>,
    relations: Vec<crate::entities::Relation>,
}

/// Top-level entry point: renders the selected lexicons in `format`.
pub fn export(conn: &Connection, format: ExportFormat, options: &ExportOptions) -> Result<String> {
    let lexicon_ids = resolve_lexicon_ids(conn, options)?;
    match format {
        ExportFormat::Json => export_json(conn, &lexicon_ids),
        ExportFormat::Xml => export_xml(conn, &lexicon_ids),
        ExportFormat::Csv => export_csv(conn, &lexicon_ids),
    }
}

fn resolve_lexicon_ids(conn: &Connection, options: &ExportOptions) -> Result<Vec<(String, String)>> {
    if let Some(ids) = &options.lexicons {
        return Ok(ids.clone());
    }
    let mut stmt = conn.prepare("SELECT id, version FROM lexicons")?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
}

fn export_json(conn: &Connection, lexicon_ids: &[(String, String)]) -> Result<String> {
    let mut lexicons = Vec::new();
    for (id, version) in lexicon_ids {
        lexicons.push(build_json_lexicon(conn, id, version)?);
    }
    let export_date = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let doc = JsonExport {
        lexicons,
        export_date,
        format: "json",
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn build_json_lexicon(conn: &Connection, id: &str, version: &str) -> Result<JsonLexicon> {
    let lexicon = conn.query_row(
        "SELECT id, label, language, version, email, license, url, citation, logo
         FROM lexicons WHERE id = ?1 AND version = ?2",
        [id, version],
        |r| {
            Ok(crate::entities::Lexicon {
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
    )?;

    let mut words = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, lemma, part_of_speech, language, lexicon_id, lexicon_version
         FROM words WHERE lexicon_id = ?1 AND lexicon_version = ?2",
    )?;
    let word_rows: Vec<crate::entities::Word> = stmt
        .query_map([id, version], |r| {
            Ok(crate::entities::Word {
                id: r.get(0)?,
                lemma: r.get(1)?,
                part_of_speech: r.get::<_, String>(2)?.parse().unwrap_or_default(),
                language: r.get(3)?,
                lexicon_id: r.get(4)?,
                lexicon_version: r.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for word in word_rows {
        let mut form_stmt = conn.prepare(
            "SELECT id, word_id, written_form, script, tag FROM forms WHERE word_id = ?1",
        )?;
        let forms = form_stmt
            .query_map([&word.id], |r| {
                Ok(crate::entities::Form {
                    id: r.get(0)?,
                    word_id: r.get(1)?,
                    written_form: r.get(2)?,
                    script: r.get(3)?,
                    tag: r.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut sense_stmt = conn.prepare(
            "SELECT id, word_id, synset_id, source, sensekey, adjposition, subcategory,
                    domain, register, lexicon_id, lexicon_version
             FROM senses WHERE word_id = ?1",
        )?;
        let senses = sense_stmt
            .query_map([&word.id], |r| {
                Ok(crate::entities::Sense {
                    id: r.get(0)?,
                    word_id: r.get(1)?,
                    synset_id: r.get(2)?,
                    source: r.get(3)?,
                    sensekey: r.get(4)?,
                    adjposition: r.get(5)?,
                    subcategory: r.get(6)?,
                    domain: r.get(7)?,
                    register: r.get(8)?,
                    lexicon_id: r.get(9)?,
                    lexicon_version: r.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        words.push(JsonWord { word, forms, senses });
    }

    let mut synsets = Vec::new();
    let mut synset_stmt = conn.prepare(
        "SELECT id, lexicon_id, lexicon_version, ili, part_of_speech, language
         FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2",
    )?;
    let synset_rows: Vec<(String, String, String, Option<String>, String, String)> = synset_stmt
        .query_map([id, version], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (sid, lexicon_id, lexicon_version, ili, pos, language) in synset_rows {
        let mut member_stmt =
            conn.prepare("SELECT id, word_id FROM senses WHERE synset_id = ?1")?;
        let pairs: Vec<(String, String)> = member_stmt
            .query_map([&sid], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let senses: Vec<String> = pairs.iter().map(|(s, _)| s.clone()).collect();
        let mut members: Vec<String> = pairs.into_iter().map(|(_, w)| w).collect();
        members.sort();
        members.dedup();

        let mut def_stmt = conn.prepare(
            "SELECT id, synset_id, language, text, source FROM definitions WHERE synset_id = ?1",
        )?;
        let definitions = def_stmt
            .query_map([&sid], |r| {
                Ok(crate::entities::Definition {
                    id: r.get(0)?,
                    synset_id: r.get(1)?,
                    language: r.get(2)?,
                    text: r.get(3)?,
                    source: r.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut ex_stmt = conn.prepare(
            "SELECT id, synset_id, sense_id, language, text, source
             FROM examples WHERE synset_id = ?1",
        )?;
        let examples = ex_stmt
            .query_map([&sid], |r| {
                Ok(crate::entities::Example {
                    id: r.get(0)?,
                    synset_id: r.get(1)?,
                    sense_id: r.get(2)?,
                    language: r.get(3)?,
                    text: r.get(4)?,
                    source: r.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rel_stmt = conn.prepare(
            "SELECT id, source_synset_id, target_synset_id, rel_type, source_lexicon
             FROM synset_relations WHERE source_synset_id = ?1",
        )?;
        let relations = rel_stmt
            .query_map([&sid], |r| {
                Ok(crate::entities::Relation {
                    id: r.get(0)?,
                    source_id: r.get(1)?,
                    target_id: r.get(2)?,
                    rel_type: r.get(3)?,
                    source_lexicon: r.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        synsets.push(JsonSynset {
            synset: crate::entities::Synset {
                id: sid,
                part_of_speech: pos.parse().unwrap_or_default(),
                ili,
                language,
                lexicon_id,
                lexicon_version,
                members,
                senses,
            },
            definitions,
            examples,
            relations,
        });
    }

    Ok(JsonLexicon { lexicon, words, synsets })
}

fn export_xml(conn: &Connection, lexicon_ids: &[(String, String)]) -> Result<String> {
    let mut resource = models::LexicalResource {
        lmf_version: Some("1.4".to_string()),
        lexicons: Vec::new(),
    };

    for (id, version) in lexicon_ids {
        let json_lexicon = build_json_lexicon(conn, id, version)?;
        resource.lexicons.push(to_model_lexicon(json_lexicon));
    }

    quick_xml::se::to_string(&resource).map_err(|e| {
        crate::error::Error::ParseError(format!("failed to serialize export XML: {e}"))
    })
}

fn to_model_lexicon(json: JsonLexicon) -> models::Lexicon {
    let lex = json.lexicon;
    let lexical_entries = json
        .words
        .into_iter()
        .map(|jw| models::LexicalEntry {
            id: jw.word.id,
            lemma: models::Lemma {
                written_form: jw.word.lemma,
                part_of_speech: jw.word.part_of_speech,
                script: None,
            },
            forms: jw
                .forms
                .into_iter()
                .map(|f| models::Form {
                    id: Some(f.id),
                    written_form: f.written_form,
                    script: f.script,
                    tag: f.tag,
                })
                .collect(),
            pronunciations: Vec::new(),
            senses: jw
                .senses
                .into_iter()
                .map(|s| models::Sense {
                    id: s.id,
                    synset: s.synset_id,
                    source: s.source,
                    sensekey: s.sensekey,
                    adjposition: s.adjposition,
                    subcategory: s.subcategory,
                    sense_relations: Vec::new(),
                    examples: Vec::new(),
                })
                .collect(),
        })
        .collect();

    let synsets = json
        .synsets
        .into_iter()
        .map(|js| {
            let members_attr = js.synset.members.join(" ");
            models::Synset {
                id: js.synset.id,
                ili: js.synset.ili,
                part_of_speech: js.synset.part_of_speech,
                members_attr,
                members: Vec::new(),
                senses: Vec::new(),
                definitions: js
                    .definitions
                    .into_iter()
                    .map(|d| models::Definition {
                        language: d.language,
                        source: d.source,
                        text: d.text,
                    })
                    .collect(),
                ili_definition: None,
                synset_relations: js
                    .relations
                    .into_iter()
                    .map(|r| models::SynsetRelation {
                        rel_type: models::SynsetRelType::from_str_lossy(&r.rel_type),
                        target: r.target_id,
                    })
                    .collect(),
                examples: js
                    .examples
                    .into_iter()
                    .map(|e| models::Example {
                        language: e.language,
                        source: e.source,
                        text: e.text,
                    })
                    .collect(),
            }
        })
        .collect();

    models::Lexicon {
        id: lex.id,
        label: lex.label,
        language: lex.language,
        email: lex.email.unwrap_or_default(),
        license: lex.license.unwrap_or_default(),
        version: lex.version,
        url: lex.url,
        citation: lex.citation,
        logo: lex.logo,
        requires: Vec::new(),
        lexical_entries,
        synsets,
    }
}

fn export_csv(conn: &Connection, lexicon_ids: &[(String, String)]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(["Type", "ID", "Lemma", "PartOfSpeech", "Language", "Lexicon", "Definition", "Example"])?;

    for (lexicon_id, lexicon_version) in lexicon_ids {
        let mut stmt = conn.prepare(
            "SELECT w.lemma, w.part_of_speech, w.language, s.id, s.synset_id
             FROM words w JOIN senses s ON s.word_id = w.id
             WHERE w.lexicon_id = ?1 AND w.lexicon_version = ?2",
        )?;
        let rows: Vec<(String, String, String, String, String)> = stmt
            .query_map([lexicon_id, lexicon_version], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (lemma, pos, language, sense_id, synset_id) in rows {
            let definition: Option<String> = conn
                .query_row(
                    "SELECT text FROM definitions WHERE synset_id = ?1 LIMIT 1",
                    [&synset_id],
                    |r| r.get(0),
                )
                .ok();
            let example: Option<String> = conn
                .query_row(
                    "SELECT text FROM examples WHERE sense_id = ?1 OR synset_id = ?2 LIMIT 1",
                    [&sense_id, &synset_id],
                    |r| r.get(0),
                )
                .ok();
            writer.write_record([
                "Sense",
                &sense_id,
                &lemma,
                &pos,
                &language,
                lexicon_id.as_str(),
                definition.as_deref().unwrap_or(""),
                example.as_deref().unwrap_or(""),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::Error::ParseError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| crate::error::Error::ParseError(e.to_string()))
}

impl From<serde_json::Error> for crate::error::Error {
    fn from(err: serde_json::Error) -> Self {
        crate::error::Error::ParseError(err.to_string())
    }
}

impl From<csv::Error> for crate::error::Error {
    fn from(_err: csv::Error) -> Self {
        crate::error::Error::ParseError("CSV write error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest, IngestOptions};
    use crate::store::open_in_memory;

    const MINIMAL_LMF: &str = r#"<?xml version="1.0"?><LexicalResource lmfVersion="1.3">
  <Lexicon id="test" label="Test" language="en" version="1.0">
    <LexicalEntry id="w1">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="s1" synset="syn1"/>
    </LexicalEntry>
    <Synset id="syn1" partOfSpeech="n">
      <Definition>A small domesticated carnivorous mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>"#;

    async fn seeded_conn() -> (Connection, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        let xml = dir.path().join("wn.xml");
        std::fs::write(&xml, MINIMAL_LMF).unwrap();
        ingest(&mut conn, &xml, dir.path(), IngestOptions::default(), None)
            .await
            .unwrap();
        (conn, dir)
    }

    #[tokio::test]
    async fn json_export_round_trips_lexicon_ids() {
        let (conn, _dir) = seeded_conn().await;
        let rendered = export(&conn, ExportFormat::Json, &ExportOptions::default()).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let ids: Vec<&str> = decoded["lexicons"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["test"]);
        assert_eq!(decoded["format"], "json");
    }

    #[tokio::test]
    async fn csv_export_has_one_row_per_sense() {
        let (conn, _dir) = seeded_conn().await;
        let rendered = export(&conn, ExportFormat::Csv, &ExportOptions::default()).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("cat"));
    }

    #[tokio::test]
    async fn xml_export_produces_well_formed_document() {
        let (conn, _dir) = seeded_conn().await;
        let rendered = export(&conn, ExportFormat::Xml, &ExportOptions::default()).unwrap();
        assert!(rendered.contains("LexicalResource"));
        assert!(rendered.contains("cat"));
    }
}
