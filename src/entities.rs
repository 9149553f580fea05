//! Query-facing value objects.
//!
//! Where `models` mirrors the nested WN-LMF XML document tree as the parser
//! produces it, these types mirror the flattened, id-addressed rows the
//! store persists and the query engine hands back to callers. A `Word` here
//! is a DB row, not an XML element; a `Synset` carries resolved id lists
//! instead of nested child elements.

use crate::models::PartOfSpeech;
use serde::{Deserialize, Serialize};

/// A loaded lexicon: one independently versioned resource (e.g. an OEWN
/// release, or a translated wordnet) within the store. Unique on `(id, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    pub id: String,
    pub label: String,
    pub language: String,
    pub version: String,
    pub email: Option<String>,
    pub license: Option<String>,
    pub url: Option<String>,
    pub citation: Option<String>,
    pub logo: Option<String>,
}

impl Lexicon {
    /// The compound key used to select a specific lexicon version, e.g.
    /// `oewn:2021`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }
}

/// A word (lexical entry): the canonical lemma plus part of speech,
/// restricted to a lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub lemma: String,
    pub part_of_speech: PartOfSpeech,
    /// Denormalized from the owning lexicon at ingest time, so lookups by
    /// language never need a join back to `lexicons`.
    pub language: String,
    pub lexicon_id: String,
    pub lexicon_version: String,
}

/// A written-form variant of a word (inflection, spelling variant, script
/// variant). The canonical lemma is additionally represented as a
/// synthesized form with id `<word-id>-lemma`, so form-based search can
/// ignore the Word/Form distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub word_id: String,
    pub written_form: String,
    pub script: Option<String>,
    pub tag: Option<String>,
}

/// A sense: the link between a word and the synset expressing its meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    pub id: String,
    pub word_id: String,
    pub synset_id: String,
    pub source: Option<String>,
    pub sensekey: Option<String>,
    pub adjposition: Option<String>,
    pub subcategory: Option<String>,
    pub domain: Option<String>,
    pub register: Option<String>,
    pub lexicon_id: String,
    pub lexicon_version: String,
}

/// A synset: a set of senses sharing a meaning, optionally grounded to an
/// interlingual index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synset {
    pub id: String,
    pub part_of_speech: PartOfSpeech,
    pub ili: Option<String>,
    pub language: String,
    pub lexicon_id: String,
    pub lexicon_version: String,
    /// Distinct Word ids of this synset's senses (derived view, not stored).
    pub members: Vec<String>,
    /// Sense ids belonging to this synset (derived view, not stored).
    pub senses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub id: String,
    pub synset_id: String,
    pub language: Option<String>,
    pub text: String,
    pub source: Option<String>,
}

/// An example sentence, owned by exactly one of a synset or a sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub synset_id: Option<String>,
    pub sense_id: Option<String>,
    pub language: Option<String>,
    pub text: String,
    pub source: Option<String>,
}

/// A directed relation between two synsets, or (when `source`/`target` name
/// sense ids instead) two senses — the schema treats relation ids as
/// opaque and does not distinguish the two cases structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub rel_type: String,
    pub source_lexicon: Option<String>,
}

/// An interlingual index entry: a language-neutral concept identifier that
/// synsets across different wordnets can share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ili {
    pub id: String,
    pub status: String,
    pub definition: Option<String>,
    pub superseded_by: Option<String>,
    pub note: Option<String>,
    pub meta: Option<String>,
}
