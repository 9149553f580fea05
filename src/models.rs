//! Typed document model for WordNet-LMF (Lexical Markup Framework) XML.
//!
//! These structs mirror the WN-LMF element tree as emitted by the parser
//! (`parse`): `LexicalResource` > `Lexicon` > {`LexicalEntry`, `Synset`}.
//! They are the parser's *output* shape; the persistent, query-facing shape
//! lives in `entities` and is considerably flatter (ids instead of nesting).

use serde::{Deserialize, Serialize};

/// Root structure of a WN-LMF document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LexicalResource {
    #[serde(rename = "@lmfVersion", default)]
    pub lmf_version: Option<String>,
    #[serde(rename = "Lexicon", default)]
    pub lexicons: Vec<Lexicon>,
}

/// A lexicon containing lexical entries and synsets for a specific language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@label", default)]
    pub label: String,
    #[serde(rename = "@language", default)]
    pub language: String,
    #[serde(rename = "@email", default)]
    pub email: String,
    #[serde(rename = "@license", default)]
    pub license: String,
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(rename = "@url", default)]
    pub url: Option<String>,
    #[serde(rename = "@citation", default)]
    pub citation: Option<String>,
    #[serde(rename = "@logo", default)]
    pub logo: Option<String>,

    #[serde(rename = "Requires", default)]
    pub requires: Vec<Requires>,
    #[serde(rename = "LexicalEntry", default)]
    pub lexical_entries: Vec<LexicalEntry>,
    #[serde(rename = "Synset", default)]
    pub synsets: Vec<Synset>,
}

/// Dependency requirement for a lexicon (another lexicon this one references).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requires {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@version")]
    pub version: String,
}

/// A lexical entry: a word form with its senses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalEntry {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "Lemma")]
    pub lemma: Lemma,
    /// Additional written-form variants beyond the canonical lemma.
    #[serde(rename = "Form", default)]
    pub forms: Vec<Form>,
    #[serde(rename = "Pronunciation", default)]
    pub pronunciations: Vec<Pronunciation>,
    #[serde(rename = "Sense", default)]
    pub senses: Vec<Sense>,
}

/// The canonical form of a lexical entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    #[serde(rename = "@writtenForm")]
    pub written_form: String,
    #[serde(rename = "@partOfSpeech", default)]
    pub part_of_speech: PartOfSpeech,
    #[serde(rename = "@script", default)]
    pub script: Option<String>,
}

/// A non-canonical written-form variant of a lexical entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@writtenForm")]
    pub written_form: String,
    #[serde(rename = "@script", default)]
    pub script: Option<String>,
    #[serde(rename = "@tag", default)]
    pub tag: Option<String>,
}

/// Part-of-speech enumeration following WordNet conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    N, // Noun
    V, // Verb
    A, // Adjective
    R, // Adverb
    S, // Adjective satellite
    C, // Conjunction
    P, // Adposition
    X, // Other
    U, // Unknown
}

impl Default for PartOfSpeech {
    /// An unrecognized/missing `partOfSpeech` attribute defaults to noun,
    /// per the parser's documented-default failure semantics.
    fn default() -> Self {
        PartOfSpeech::N
    }
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PartOfSpeech::N => "noun",
                PartOfSpeech::V => "verb",
                PartOfSpeech::A => "adjective",
                PartOfSpeech::R => "adverb",
                PartOfSpeech::S => "adjective satellite",
                PartOfSpeech::C => "conjunction",
                PartOfSpeech::P => "adposition",
                PartOfSpeech::X => "other",
                PartOfSpeech::U => "unknown",
            }
        )
    }
}

impl std::str::FromStr for PartOfSpeech {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n" | "noun" => Ok(PartOfSpeech::N),
            "v" | "verb" => Ok(PartOfSpeech::V),
            "a" | "adj" | "adjective" => Ok(PartOfSpeech::A),
            "r" | "adv" | "adverb" => Ok(PartOfSpeech::R),
            "s" | "adj_sat" | "adjective_satellite" => Ok(PartOfSpeech::S),
            "c" | "conj" | "conjunction" => Ok(PartOfSpeech::C),
            "p" | "adp" | "adposition" => Ok(PartOfSpeech::P),
            "x" | "other" => Ok(PartOfSpeech::X),
            "u" | "unknown" => Ok(PartOfSpeech::U),
            _ => Err(format!("invalid part of speech: {}", s)),
        }
    }
}

impl PartOfSpeech {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartOfSpeech::N => "n",
            PartOfSpeech::V => "v",
            PartOfSpeech::A => "a",
            PartOfSpeech::R => "r",
            PartOfSpeech::S => "s",
            PartOfSpeech::C => "c",
            PartOfSpeech::P => "p",
            PartOfSpeech::X => "x",
            PartOfSpeech::U => "u",
        }
    }
}

/// Pronunciation information for a lexical entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pronunciation {
    #[serde(rename = "@variety")]
    pub variety: String,
    #[serde(rename = "@notation", default)]
    pub notation: Option<String>,
    #[serde(rename = "@phonemic", default = "default_phonemic")]
    pub phonemic: bool,
    #[serde(rename = "@audio", default)]
    pub audio: Option<String>,
    #[serde(rename = "$text")]
    pub text: String,
}

fn default_phonemic() -> bool {
    true
}

/// A sense connecting a lexical entry to a synset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@synset")]
    pub synset: String,
    #[serde(rename = "@source", default)]
    pub source: Option<String>,
    #[serde(rename = "@sensekey", default)]
    pub sensekey: Option<String>,
    #[serde(rename = "@adjposition", default)]
    pub adjposition: Option<String>,
    #[serde(rename = "@subcat", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "SenseRelation", default)]
    pub sense_relations: Vec<SenseRelation>,
    #[serde(rename = "Example", default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseRelation {
    #[serde(rename = "@relType")]
    pub rel_type: SenseRelType,
    #[serde(rename = "@target")]
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseRelType {
    Antonym,
    Also,
    Participle,
    Pertainym,
    Derivation,
    DomainTopic,
    DomainMemberTopic,
    DomainRegion,
    DomainMemberRegion,
    Exemplifies,
    IsExemplifiedBy,
    #[serde(other)]
    Other,
}

impl SenseRelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenseRelType::Antonym => "antonym",
            SenseRelType::Also => "also",
            SenseRelType::Participle => "participle",
            SenseRelType::Pertainym => "pertainym",
            SenseRelType::Derivation => "derivation",
            SenseRelType::DomainTopic => "domain_topic",
            SenseRelType::DomainMemberTopic => "domain_member_topic",
            SenseRelType::DomainRegion => "domain_region",
            SenseRelType::DomainMemberRegion => "domain_member_region",
            SenseRelType::Exemplifies => "exemplifies",
            SenseRelType::IsExemplifiedBy => "is_exemplified_by",
            SenseRelType::Other => "other",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "antonym" => SenseRelType::Antonym,
            "also" => SenseRelType::Also,
            "participle" => SenseRelType::Participle,
            "pertainym" => SenseRelType::Pertainym,
            "derivation" => SenseRelType::Derivation,
            "domain_topic" => SenseRelType::DomainTopic,
            "domain_member_topic" => SenseRelType::DomainMemberTopic,
            "domain_region" => SenseRelType::DomainRegion,
            "domain_member_region" => SenseRelType::DomainMemberRegion,
            "exemplifies" => SenseRelType::Exemplifies,
            "is_exemplified_by" => SenseRelType::IsExemplifiedBy,
            _ => SenseRelType::Other,
        }
    }
}

/// A synset (synonym set) representing a single concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synset {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@ili", default)]
    pub ili: Option<String>,
    #[serde(rename = "@partOfSpeech", default)]
    pub part_of_speech: PartOfSpeech,
    /// Space-separated sense ids; populated by the parser on synset close
    /// via reverse lookup, not taken verbatim from the (often absent)
    /// `@members` attribute.
    #[serde(rename = "@members", default)]
    pub members_attr: String,
    #[serde(skip)]
    pub members: Vec<String>,
    #[serde(skip)]
    pub senses: Vec<String>,

    #[serde(rename = "Definition", default)]
    pub definitions: Vec<Definition>,
    #[serde(rename = "ILIDefinition", default)]
    pub ili_definition: Option<ILIDefinition>,
    #[serde(rename = "SynsetRelation", default)]
    pub synset_relations: Vec<SynsetRelation>,
    #[serde(rename = "Example", default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Definition {
    #[serde(rename = "@language", default)]
    pub language: Option<String>,
    #[serde(rename = "@dc:source", default)]
    pub source: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ILIDefinition {
    #[serde(rename = "@dc:source", default)]
    pub source: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynsetRelation {
    #[serde(rename = "@relType")]
    pub rel_type: SynsetRelType,
    #[serde(rename = "@target")]
    pub target: String,
}

/// Types of relationships between synsets, covering both Princeton WordNet
/// properties and the extended relation set from the WN-LMF specification
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynsetRelType {
    Hypernym,
    Hyponym,
    InstanceHypernym,
    InstanceHyponym,
    MeroMember,
    MeroPart,
    MeroSubstance,
    HoloMember,
    HoloPart,
    HoloSubstance,
    Entails,
    Causes,
    Similar,
    Attribute,
    DomainRegion,
    DomainTopic,
    HasDomainRegion,
    HasDomainTopic,
    Exemplifies,
    IsExemplifiedBy,
    Also,
    Antonym,
    Derivation,
    Holonym,
    Meronym,
    #[serde(other)]
    Unknown,
}

impl SynsetRelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynsetRelType::Hypernym => "hypernym",
            SynsetRelType::Hyponym => "hyponym",
            SynsetRelType::InstanceHypernym => "instance_hypernym",
            SynsetRelType::InstanceHyponym => "instance_hyponym",
            SynsetRelType::MeroMember => "mero_member",
            SynsetRelType::MeroPart => "mero_part",
            SynsetRelType::MeroSubstance => "mero_substance",
            SynsetRelType::HoloMember => "holo_member",
            SynsetRelType::HoloPart => "holo_part",
            SynsetRelType::HoloSubstance => "holo_substance",
            SynsetRelType::Entails => "entails",
            SynsetRelType::Causes => "causes",
            SynsetRelType::Similar => "similar",
            SynsetRelType::Attribute => "attribute",
            SynsetRelType::DomainRegion => "domain_region",
            SynsetRelType::DomainTopic => "domain_topic",
            SynsetRelType::HasDomainRegion => "has_domain_region",
            SynsetRelType::HasDomainTopic => "has_domain_topic",
            SynsetRelType::Exemplifies => "exemplifies",
            SynsetRelType::IsExemplifiedBy => "is_exemplified_by",
            SynsetRelType::Also => "also",
            SynsetRelType::Antonym => "antonym",
            SynsetRelType::Derivation => "derivation",
            SynsetRelType::Holonym => "holonym",
            SynsetRelType::Meronym => "meronym",
            SynsetRelType::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "hypernym" => SynsetRelType::Hypernym,
            "hyponym" => SynsetRelType::Hyponym,
            "instance_hypernym" => SynsetRelType::InstanceHypernym,
            "instance_hyponym" => SynsetRelType::InstanceHyponym,
            "mero_member" => SynsetRelType::MeroMember,
            "mero_part" => SynsetRelType::MeroPart,
            "mero_substance" => SynsetRelType::MeroSubstance,
            "holo_member" => SynsetRelType::HoloMember,
            "holo_part" => SynsetRelType::HoloPart,
            "holo_substance" => SynsetRelType::HoloSubstance,
            "entails" => SynsetRelType::Entails,
            "causes" => SynsetRelType::Causes,
            "similar" => SynsetRelType::Similar,
            "attribute" => SynsetRelType::Attribute,
            "domain_region" => SynsetRelType::DomainRegion,
            "domain_topic" => SynsetRelType::DomainTopic,
            "has_domain_region" => SynsetRelType::HasDomainRegion,
            "has_domain_topic" => SynsetRelType::HasDomainTopic,
            "exemplifies" => SynsetRelType::Exemplifies,
            "is_exemplified_by" => SynsetRelType::IsExemplifiedBy,
            "also" => SynsetRelType::Also,
            "antonym" => SynsetRelType::Antonym,
            "derivation" => SynsetRelType::Derivation,
            "holonym" => SynsetRelType::Holonym,
            "meronym" => SynsetRelType::Meronym,
            _ => SynsetRelType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Example {
    #[serde(rename = "@language", default)]
    pub language: Option<String>,
    #[serde(rename = "@dc:source", default)]
    pub source: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

/// Parses a space-separated `@members` attribute into individual ids.
pub fn parse_members(members_str: &str) -> Vec<String> {
    members_str.split_whitespace().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_of_speech_round_trips_through_str() {
        for pos in [
            PartOfSpeech::N,
            PartOfSpeech::V,
            PartOfSpeech::A,
            PartOfSpeech::R,
            PartOfSpeech::S,
        ] {
            let s = pos.as_str();
            let parsed: PartOfSpeech = s.parse().unwrap();
            assert_eq!(parsed, pos);
        }
    }

    #[test]
    fn unknown_pos_defaults_to_noun() {
        assert_eq!(PartOfSpeech::default(), PartOfSpeech::N);
    }

    #[test]
    fn unknown_synset_rel_type_falls_back() {
        assert_eq!(
            SynsetRelType::from_str_lossy("totally_made_up"),
            SynsetRelType::Unknown
        );
    }
}
