//! Streaming WN-LMF XML parser.
//!
//! WN-LMF documents for a full-size wordnet run tens of megabytes; loading
//! the whole document into a `LexicalResource` tree (as the teacher's
//! `parse_lmf` does via `quick_xml::de::from_str`) is fine for the small
//! fixtures that exercise it, but the ingestor's primary path is the
//! event-driven [`parse_streaming`] below, which never materializes more
//! than one lexicon's accumulated rows at a time and reports progress as
//! it goes.

use crate::entities::{Definition, Example, Form, Sense, Synset, Word};
use crate::error::{Error, Result};
use crate::models::{LexicalResource, PartOfSpeech};
use crate::progress::{ProgressReporter, ProgressUpdate, report_progress_non_blocking};
use log::debug;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;
use std::str::FromStr;
use tokio::task;

/// Parses an entire WN-LMF document into the nested document model in one
/// shot. Suited to small fixtures and tests; large documents should use
/// [`parse_streaming`] instead.
pub async fn parse_lmf(xml_content: String) -> Result<LexicalResource> {
    debug!("parsing WN-LMF document via serde (single allocation)");
    let resource = task::spawn_blocking(move || -> Result<LexicalResource> {
        from_str(&xml_content).map_err(Error::from)
    })
    .await??;
    Ok(resource)
}

/// WN-LMF versions this parser recognizes.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1", "1.2", "1.3", "1.4"];

fn version_from_doctype(doctype: &str) -> Option<String> {
    for version in SUPPORTED_VERSIONS {
        if doctype.contains(&format!("WN-LMF-{}.dtd", version)) {
            return Some(version.to_string());
        }
    }
    None
}

/// A cheap, advisory scan of the first few KB of `content`: determines the
/// LMF version (from `lmfVersion` or the DOCTYPE SYSTEM id) and counts
/// closing tags to roughly estimate total element count for progress
/// reporting. Parsing does not depend on the estimate's accuracy.
pub fn pre_scan(content: &str) -> Result<(String, Option<u64>)> {
    let head: &str = &content[..content.len().min(8192)];
    let mut reader = Reader::from_str(head);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut version = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::DocType(text)) => {
                version = version_from_doctype(&String::from_utf8_lossy(text.as_ref()));
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"LexicalResource") {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref().eq_ignore_ascii_case(b"lmfVersion") {
                            version = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e)),
            _ => {}
        }
        buf.clear();
    }

    let version = version.ok_or_else(|| Error::UnsupportedVersion("undetermined".into()))?;
    if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
        return Err(Error::UnsupportedVersion(version));
    }

    // Rough total-element estimate: count closing-tag bytes ("</") across
    // the whole document, which full-reads once more but cheaply.
    let estimate = (content.matches("</").count() as u64).checked_mul(1).and_then(|n| {
        if n == 0 { None } else { Some(n) }
    });

    Ok((version, estimate))
}

/// Everything a single `<Lexicon>` element streams out, flattened to the
/// store's row shapes.
#[derive(Debug, Default)]
pub struct ParsedLexicon {
    pub lexicon: crate::entities::Lexicon,
    pub words: Vec<Word>,
    pub forms: Vec<Form>,
    pub synsets: Vec<Synset>,
    pub senses: Vec<Sense>,
    pub definitions: Vec<Definition>,
    pub examples: Vec<Example>,
    /// `(id, source_id, target_id, rel_type)`.
    pub sense_relations: Vec<(String, String, String, String)>,
    pub synset_relations: Vec<(String, String, String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Definition(usize),
    Example(usize),
}

/// Streams `xml` event-by-event, emitting one [`ParsedLexicon`] per
/// `<Lexicon>` element. Tag matching is case-insensitive per the
/// specification; attribute names are matched case-insensitively as well
/// to tolerate the version boundary between early and late LMF schemas.
pub fn parse_streaming(
    xml: &str,
    progress: Option<(&ProgressReporter, Option<u64>)>,
) -> Result<Vec<ParsedLexicon>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut lexicons = Vec::new();
    let mut current: Option<ParsedLexicon> = None;
    let mut current_word: Option<String> = None;
    let mut current_sense: Option<String> = None;
    let mut current_synset: Option<String> = None;
    let mut text_target: Option<TextTarget> = None;
    let mut elements_seen: u64 = 0;
    let mut relation_seq: u64 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e)),
            Ok(event) => {
                elements_seen += 1;
                if elements_seen % 1000 == 0 {
                    if let Some((reporter, total)) = progress {
                        report_progress_non_blocking(
                            reporter,
                            ProgressUpdate::new(
                                "Parsing LMF document".to_string(),
                                elements_seen,
                                total,
                                None,
                            ),
                        );
                    }
                }

                match event {
                    Event::Start(e) => {
                        let name = local_name_lower(&e);
                        handle_start(
                            &name,
                            &e,
                            &mut lexicons,
                            &mut current,
                            &mut current_word,
                            &mut current_sense,
                            &mut current_synset,
                            &mut text_target,
                            &mut relation_seq,
                        )?;
                    }
                    // Self-closed elements (`<Sense .../>`) never produce a
                    // matching End event, so any context they open must be
                    // closed immediately rather than left dangling.
                    Event::Empty(e) => {
                        let name = local_name_lower(&e);
                        handle_start(
                            &name,
                            &e,
                            &mut lexicons,
                            &mut current,
                            &mut current_word,
                            &mut current_sense,
                            &mut current_synset,
                            &mut text_target,
                            &mut relation_seq,
                        )?;
                        handle_end(
                            &name,
                            &mut lexicons,
                            &mut current,
                            &mut current_word,
                            &mut current_sense,
                            &mut current_synset,
                            &mut text_target,
                        );
                    }
                    Event::Text(t) => {
                        if let (Some(target), Some(lex)) = (text_target, current.as_mut()) {
                            let text = t.unescape().map_err(Error::XmlParse)?.into_owned();
                            match target {
                                TextTarget::Definition(idx) => {
                                    lex.definitions[idx].text.push_str(&text);
                                }
                                TextTarget::Example(idx) => {
                                    lex.examples[idx].text.push_str(&text);
                                }
                            }
                        }
                    }
                    Event::End(e) => {
                        let name = local_name_lower_bytes(e.local_name().as_ref());
                        handle_end(
                            &name,
                            &mut lexicons,
                            &mut current,
                            &mut current_word,
                            &mut current_sense,
                            &mut current_synset,
                            &mut text_target,
                        );
                    }
                    _ => {}
                }
            }
        }
        buf.clear();
    }

    if let Some(lex) = current {
        lexicons.push(lex);
    }

    Ok(lexicons)
}

fn local_name_lower(e: &quick_xml::events::BytesStart) -> String {
    local_name_lower_bytes(e.local_name().as_ref())
}

fn local_name_lower_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_lowercase()
}

fn attr_lower(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref().eq_ignore_ascii_case(name.as_bytes()) {
            Some(String::from_utf8_lossy(&a.value).to_string())
        } else {
            None
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn handle_start(
    name: &str,
    e: &quick_xml::events::BytesStart,
    lexicons: &mut Vec<ParsedLexicon>,
    current: &mut Option<ParsedLexicon>,
    current_word: &mut Option<String>,
    current_sense: &mut Option<String>,
    current_synset: &mut Option<String>,
    text_target: &mut Option<TextTarget>,
    relation_seq: &mut u64,
) -> Result<()> {
    match name {
        "lexicon" => {
            if let Some(prev) = current.take() {
                lexicons.push(prev);
            }
            let id = attr_lower(e, "id").unwrap_or_default();
            let version = attr_lower(e, "version").unwrap_or_default();
            *current = Some(ParsedLexicon {
                lexicon: crate::entities::Lexicon {
                    id: id.clone(),
                    label: attr_lower(e, "label").unwrap_or_default(),
                    language: attr_lower(e, "language").unwrap_or_default(),
                    version,
                    email: attr_lower(e, "email"),
                    license: attr_lower(e, "license"),
                    url: attr_lower(e, "url"),
                    citation: attr_lower(e, "citation"),
                    logo: attr_lower(e, "logo"),
                },
                ..Default::default()
            });
        }
        "lexicalentry" => {
            let id = attr_lower(e, "id").unwrap_or_default();
            *current_word = Some(id);
        }
        "lemma" => {
            if let (Some(word_id), Some(lex)) = (current_word.as_ref(), current.as_mut()) {
                let written_form = attr_lower(e, "writtenform").unwrap_or_default();
                let pos = attr_lower(e, "partofspeech")
                    .and_then(|s| PartOfSpeech::from_str(&s).ok())
                    .unwrap_or_default();
                lex.words.push(Word {
                    id: word_id.clone(),
                    lemma: written_form.clone(),
                    part_of_speech: pos,
                    language: lex.lexicon.language.clone(),
                    lexicon_id: lex.lexicon.id.clone(),
                    lexicon_version: lex.lexicon.version.clone(),
                });
                let already_present = lex
                    .forms
                    .iter()
                    .any(|f| f.word_id == *word_id && f.written_form == written_form);
                if !already_present {
                    lex.forms.push(Form {
                        id: format!("{}-lemma", word_id),
                        word_id: word_id.clone(),
                        written_form,
                        script: attr_lower(e, "script"),
                        tag: None,
                    });
                }
            }
        }
        "form" => {
            if let (Some(word_id), Some(lex)) = (current_word.as_ref(), current.as_mut()) {
                let written_form = attr_lower(e, "writtenform").unwrap_or_default();
                let already_present = lex
                    .forms
                    .iter()
                    .any(|f| f.word_id == *word_id && f.written_form == written_form);
                if !already_present {
                    lex.forms.push(Form {
                        id: attr_lower(e, "id").unwrap_or_else(|| format!("{}-form-{}", word_id, lex.forms.len())),
                        word_id: word_id.clone(),
                        written_form,
                        script: attr_lower(e, "script"),
                        tag: attr_lower(e, "tag"),
                    });
                }
            }
        }
        "sense" => {
            if let (Some(word_id), Some(lex)) = (current_word.as_ref(), current.as_mut()) {
                let id = attr_lower(e, "id").unwrap_or_default();
                lex.senses.push(Sense {
                    id: id.clone(),
                    word_id: word_id.clone(),
                    synset_id: attr_lower(e, "synset").unwrap_or_default(),
                    source: attr_lower(e, "source"),
                    sensekey: attr_lower(e, "sensekey"),
                    adjposition: attr_lower(e, "adjposition"),
                    subcategory: attr_lower(e, "subcat"),
                    domain: attr_lower(e, "domain"),
                    register: attr_lower(e, "register"),
                    lexicon_id: lex.lexicon.id.clone(),
                    lexicon_version: lex.lexicon.version.clone(),
                });
                *current_sense = Some(id);
            }
        }
        "senserelation" => {
            if let (Some(sense_id), Some(lex)) = (current_sense.as_ref(), current.as_mut()) {
                *relation_seq += 1;
                lex.sense_relations.push((
                    format!("sr-{}", relation_seq),
                    sense_id.clone(),
                    attr_lower(e, "target").unwrap_or_default(),
                    attr_lower(e, "reltype").unwrap_or_default(),
                ));
            }
        }
        "synset" => {
            let id = attr_lower(e, "id").unwrap_or_default();
            if let Some(lex) = current.as_mut() {
                let pos = attr_lower(e, "partofspeech")
                    .and_then(|s| PartOfSpeech::from_str(&s).ok())
                    .unwrap_or_default();
                lex.synsets.push(Synset {
                    id: id.clone(),
                    part_of_speech: pos,
                    ili: attr_lower(e, "ili"),
                    language: lex.lexicon.language.clone(),
                    lexicon_id: lex.lexicon.id.clone(),
                    lexicon_version: lex.lexicon.version.clone(),
                    members: Vec::new(),
                    senses: Vec::new(),
                });
            }
            *current_synset = Some(id);
        }
        "synsetrelation" => {
            if let (Some(synset_id), Some(lex)) = (current_synset.as_ref(), current.as_mut()) {
                *relation_seq += 1;
                lex.synset_relations.push((
                    format!("yr-{}", relation_seq),
                    synset_id.clone(),
                    attr_lower(e, "target").unwrap_or_default(),
                    attr_lower(e, "reltype").unwrap_or_default(),
                ));
            }
        }
        "definition" | "ilidefinition" => {
            if let (Some(synset_id), Some(lex)) = (current_synset.as_ref(), current.as_mut()) {
                let idx = lex.definitions.len();
                lex.definitions.push(Definition {
                    id: format!("{}-def-{}", synset_id, idx),
                    synset_id: synset_id.clone(),
                    language: attr_lower(e, "language"),
                    text: String::new(),
                    source: attr_lower(e, "dc:source").or_else(|| attr_lower(e, "source")),
                });
                *text_target = Some(TextTarget::Definition(idx));
            }
        }
        "example" => {
            if let Some(lex) = current.as_mut() {
                let idx = lex.examples.len();
                let (synset_owner, sense_owner) = (current_synset.clone(), current_sense.clone());
                // A sense context nested inside its lexical entry takes
                // precedence: an Example element directly under Sense
                // belongs to that sense, not the enclosing synset.
                let (synset_id, sense_id) = if current_word.is_some() && sense_owner.is_some() {
                    (None, sense_owner)
                } else {
                    (synset_owner, None)
                };
                lex.examples.push(Example {
                    id: format!("ex-{}", idx),
                    synset_id,
                    sense_id,
                    language: attr_lower(e, "language"),
                    text: String::new(),
                    source: attr_lower(e, "dc:source").or_else(|| attr_lower(e, "source")),
                });
                *text_target = Some(TextTarget::Example(idx));
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_end(
    name: &str,
    lexicons: &mut Vec<ParsedLexicon>,
    current: &mut Option<ParsedLexicon>,
    current_word: &mut Option<String>,
    current_sense: &mut Option<String>,
    current_synset: &mut Option<String>,
    text_target: &mut Option<TextTarget>,
) {
    match name {
        "lexicon" => {
            if let Some(lex) = current.take() {
                lexicons.push(lex);
            }
        }
        "lexicalentry" => *current_word = None,
        "sense" => *current_sense = None,
        "synset" => {
            if let (Some(synset_id), Some(lex)) = (current_synset.take(), current.as_mut()) {
                let members: Vec<String> = lex
                    .senses
                    .iter()
                    .filter(|s| s.synset_id == synset_id)
                    .map(|s| s.word_id.clone())
                    .collect();
                let senses: Vec<String> = lex
                    .senses
                    .iter()
                    .filter(|s| s.synset_id == synset_id)
                    .map(|s| s.id.clone())
                    .collect();
                if let Some(synset) = lex.synsets.iter_mut().find(|s| s.id == synset_id) {
                    synset.members = members;
                    synset.senses = senses;
                }
            }
        }
        "definition" | "ilidefinition" | "example" => *text_target = None,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_LMF_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.3.dtd">
<LexicalResource xmlns:dc="http://purl.org/dc/elements/1.1/">
  <Lexicon id="test-en"
           label="Test Wordnet (English)"
           language="en"
           email="test@example.com"
           license="https://example.com/license"
           version="1.0">
    <LexicalEntry id="w1">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="test-en-1-n-1" synset="test-en-1-n"/>
    </LexicalEntry>
    <Synset id="test-en-1-n" partOfSpeech="n" members="test-en-1-n-1">
      <Definition>A small domesticated carnivorous mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>
"#;

    #[tokio::test]
    async fn dom_parse_minimal_lmf() {
        let resource = parse_lmf(MINIMAL_LMF_XML.to_string()).await.unwrap();
        assert_eq!(resource.lexicons.len(), 1);
        assert_eq!(resource.lexicons[0].lexical_entries[0].lemma.written_form, "cat");
    }

    #[test]
    fn pre_scan_detects_version_from_attribute() {
        let xml = r#"<LexicalResource lmfVersion="1.3"><Lexicon id="x"/></LexicalResource>"#;
        let (version, _) = pre_scan(xml).unwrap();
        assert_eq!(version, "1.3");
    }

    #[test]
    fn pre_scan_detects_version_from_doctype() {
        let (version, _) = pre_scan(MINIMAL_LMF_XML).unwrap();
        assert_eq!(version, "1.3");
    }

    #[test]
    fn pre_scan_rejects_unknown_version() {
        let xml = r#"<LexicalResource lmfVersion="9.9"><Lexicon id="x"/></LexicalResource>"#;
        assert!(matches!(
            pre_scan(xml),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn streaming_parse_produces_words_senses_synsets() {
        let lexicons = parse_streaming(MINIMAL_LMF_XML, None).unwrap();
        assert_eq!(lexicons.len(), 1);
        let lex = &lexicons[0];
        assert_eq!(lex.lexicon.id, "test-en");
        assert_eq!(lex.words.len(), 1);
        assert_eq!(lex.words[0].lemma, "cat");
        assert_eq!(lex.synsets.len(), 1);
        assert_eq!(lex.synsets[0].members, vec!["w1".to_string()]);
        assert_eq!(lex.definitions[0].text, "A small domesticated carnivorous mammal.");
        // Synthesized lemma form is present alongside the canonical Word.
        assert!(lex.forms.iter().any(|f| f.id == "w1-lemma"));
    }

    #[test]
    fn streaming_parse_binds_example_to_sense_not_synset() {
        let xml = r#"<LexicalResource lmfVersion="1.3">
  <Lexicon id="x" label="X" language="en" version="1">
    <LexicalEntry id="w1">
      <Lemma writtenForm="run" partOfSpeech="v"/>
      <Sense id="s1" synset="syn1">
        <Example>She runs fast.</Example>
      </Sense>
    </LexicalEntry>
    <Synset id="syn1" partOfSpeech="v">
      <Definition>To move quickly.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>"#;
        let lexicons = parse_streaming(xml, None).unwrap();
        let lex = &lexicons[0];
        assert_eq!(lex.examples.len(), 1);
        assert_eq!(lex.examples[0].sense_id, Some("s1".to_string()));
        assert_eq!(lex.examples[0].synset_id, None);
    }
}
