//! Morphy: rule-and-exception lemmatizer.
//!
//! Suffix rules run first regardless of state; the exception table (built
//! by scanning a backing Wordnet) narrows candidates once initialized.
//! Before initialization every rule-derived candidate is kept on faith;
//! after initialization a candidate survives only if it is a lemma some
//! Word in that Wordnet actually carries.

use crate::models::PartOfSpeech;
use crate::query::Wordnet;
use std::collections::{HashMap, HashSet};

type Rule = (&'static str, &'static str);

const NOUN_RULES: &[Rule] = &[
    ("s", ""),
    ("ces", "x"),
    ("ses", "s"),
    ("ves", "f"),
    ("ives", "ife"),
    ("xes", "x"),
    ("xes", "xis"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

const VERB_RULES: &[Rule] = &[
    ("s", ""),
    ("ies", "y"),
    ("es", "e"),
    ("es", ""),
    ("ed", "e"),
    ("ed", ""),
    ("ing", "e"),
    ("ing", ""),
];

const ADJ_ADV_RULES: &[Rule] = &[("er", ""), ("est", ""), ("er", "e"), ("est", "e")];

fn rules_for(pos: PartOfSpeech) -> &'static [Rule] {
    match pos {
        PartOfSpeech::N => NOUN_RULES,
        PartOfSpeech::V => VERB_RULES,
        PartOfSpeech::A | PartOfSpeech::R | PartOfSpeech::S => ADJ_ADV_RULES,
        _ => &[],
    }
}

const ANALYZED_POS: &[PartOfSpeech] = &[
    PartOfSpeech::N,
    PartOfSpeech::V,
    PartOfSpeech::A,
    PartOfSpeech::R,
];

fn apply_rules(form: &str, pos: PartOfSpeech) -> HashSet<String> {
    let mut out = HashSet::new();
    out.insert(form.to_string());
    for (suffix, replacement) in rules_for(pos) {
        if suffix.len() < form.len() && form.ends_with(suffix) {
            let stem = &form[..form.len() - suffix.len()];
            out.insert(format!("{stem}{replacement}"));
        }
    }
    out
}

/// Per-POS exception tables and lemma vocabularies built by scanning a
/// Wordnet; `None` until [`Morphy::new`]'s async initialization completes.
#[derive(Debug, Default)]
struct WordnetIndex {
    all_lemmas: HashMap<PartOfSpeech, HashSet<String>>,
    exceptions: HashMap<PartOfSpeech, HashMap<String, HashSet<String>>>,
}

/// Rule-and-exception lemmatizer. Construct with [`Morphy::new`] (which
/// scans the backing Wordnet before returning, so there is no separate
/// `ready()` to await) or [`Morphy::uninitialized`] for rule-only
/// candidate generation.
#[derive(Debug, Default)]
pub struct Morphy {
    index: Option<WordnetIndex>,
}

impl Morphy {
    /// Builds the exception tables from every Word in `wordnet`, scanning
    /// to completion before returning.
    pub async fn new(wordnet: &Wordnet) -> crate::error::Result<Self> {
        let mut all_lemmas: HashMap<PartOfSpeech, HashSet<String>> = HashMap::new();
        let mut exceptions: HashMap<PartOfSpeech, HashMap<String, HashSet<String>>> =
            HashMap::new();

        for &pos in ANALYZED_POS {
            let words = wordnet.words_of_pos(pos).await?;
            let lemmas = all_lemmas.entry(pos).or_default();
            let exc = exceptions.entry(pos).or_default();
            for word in words {
                lemmas.insert(word.lemma.clone());
                for form in wordnet.forms_of_word(&word.id).await? {
                    if form.written_form != word.lemma {
                        exc.entry(form.written_form.clone())
                            .or_default()
                            .insert(word.lemma.clone());
                    }
                }
            }
        }

        Ok(Morphy {
            index: Some(WordnetIndex {
                all_lemmas,
                exceptions,
            }),
        })
    }

    /// Rule-only lemmatizer with no exception table or candidate
    /// filtering; every rule-derived form is kept.
    pub fn uninitialized() -> Self {
        Morphy { index: None }
    }

    /// Candidate lemmas per POS (or `"null"` when uninitialized and `pos`
    /// is omitted) for `form`.
    pub fn analyze(&self, form: &str, pos: Option<PartOfSpeech>) -> HashMap<String, HashSet<String>> {
        let pos_list: Vec<PartOfSpeech> = match pos {
            Some(p) => vec![p],
            None => ANALYZED_POS.to_vec(),
        };

        let mut out: HashMap<String, HashSet<String>> = HashMap::new();
        for p in &pos_list {
            out.insert(pos_key(*p).to_string(), self.analyze_pos(form, *p));
        }

        if pos.is_none() && self.index.is_none() {
            let null_set: HashSet<String> = [form.to_string()].into_iter().collect();
            for bucket in out.values_mut() {
                for n in &null_set {
                    bucket.remove(n);
                }
            }
            out.insert("null".to_string(), null_set);
        }

        out
    }

    fn analyze_pos(&self, form: &str, pos: PartOfSpeech) -> HashSet<String> {
        let mut candidates = apply_rules(form, pos);

        if let Some(index) = &self.index {
            if let Some(exc) = index.exceptions.get(&pos).and_then(|m| m.get(form)) {
                candidates.extend(exc.iter().cloned());
            }
            let allowed = index.all_lemmas.get(&pos);
            candidates.retain(|c| allowed.is_some_and(|set| set.contains(c)));
        } else {
            candidates.insert(form.to_string());
        }

        candidates
    }
}

fn pos_key(pos: PartOfSpeech) -> &'static str {
    pos.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_noun_suffix_rules() {
        let morphy = Morphy::uninitialized();
        let result = morphy.analyze("examples", Some(PartOfSpeech::N));
        let bucket = &result["n"];
        assert!(bucket.contains("examples"));
        assert!(bucket.contains("example"));
    }

    #[test]
    fn uninitialized_verb_suffix_rules_include_ing_stem() {
        let morphy = Morphy::uninitialized();
        let result = morphy.analyze("examples", Some(PartOfSpeech::V));
        let bucket = &result["v"];
        assert!(bucket.contains("examples"));
        assert!(bucket.contains("example"));
        assert!(bucket.contains("exampl"));
    }

    #[test]
    fn uninitialized_without_pos_emits_null_bucket() {
        let morphy = Morphy::uninitialized();
        let result = morphy.analyze("running", None);
        assert_eq!(result["null"], ["running".to_string()].into_iter().collect());
        for pos in ["n", "v", "a", "r"] {
            assert!(!result[pos].contains("running"));
        }
    }

    #[test]
    fn empty_form_yields_itself() {
        let morphy = Morphy::uninitialized();
        let result = morphy.analyze("", Some(PartOfSpeech::N));
        assert_eq!(result["n"], ["".to_string()].into_iter().collect());
    }
}
