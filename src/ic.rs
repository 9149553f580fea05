//! Information Content: corpus-frequency propagation over the hypernym
//! taxonomy, feeding the Resnik/Jiang-Conrath/Lin similarity measures.

use crate::error::{Error, Result};
use crate::graph::hypernyms;
use crate::models::PartOfSpeech;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

const TOTAL_KEY: &str = "__total__";

/// A corpus: word form (token) -> raw occurrence count. Callers build this
/// however they like (tagged corpus, frequency list, ...); `compute` is
/// responsible for resolving each token to the synsets it denotes before
/// propagating its count over the taxonomy.
pub type Corpus = HashMap<String, u64>;

/// Per-POS synset frequency table produced by [`compute`].
///
/// Adjective satellites (`s`) are folded into `a` per the WN-LMF convention
/// that satellites are adjectives for similarity purposes.
#[derive(Debug, Clone, Default)]
pub struct Freq {
    by_pos: HashMap<&'static str, HashMap<String, f64>>,
}

impl Freq {
    fn pos_key(pos: PartOfSpeech) -> &'static str {
        match pos {
            PartOfSpeech::S => "a",
            PartOfSpeech::N => "n",
            PartOfSpeech::V => "v",
            PartOfSpeech::A => "a",
            PartOfSpeech::R => "r",
            _ => "n",
        }
    }

    /// Raw propagated frequency mass for `synset_id` under `pos`.
    pub fn freq(&self, pos: PartOfSpeech, synset_id: &str) -> f64 {
        self.by_pos
            .get(Self::pos_key(pos))
            .and_then(|m| m.get(synset_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total propagated mass across all synsets of `pos`.
    pub fn total(&self, pos: PartOfSpeech) -> f64 {
        self.by_pos
            .get(Self::pos_key(pos))
            .and_then(|m| m.get(TOTAL_KEY))
            .copied()
            .unwrap_or(0.0)
    }

    /// `P(synset) = freq(synset) / total(pos)`.
    pub fn probability(&self, pos: PartOfSpeech, synset_id: &str) -> f64 {
        let total = self.total(pos);
        if total <= 0.0 {
            0.0
        } else {
            self.freq(pos, synset_id) / total
        }
    }
}

/// Propagates corpus counts up the hypernym taxonomy, producing the
/// per-synset and per-POS-total frequency mass used for information
/// content.
///
/// Each corpus entry is a token (word form); every synset that token's
/// senses resolve to receives a share of the count. When `distribute_weight`
/// is set, that count is split evenly across however many synsets the token
/// resolves to (`c / |synsets|` per synset) rather than being added in full
/// to each. `smoothing` is the Laplace-style additive term each synset and
/// POS total starts from (WordNet::Similarity's default of `1.0` avoids
/// `ln(0)`).
pub fn compute(
    conn: &Connection,
    corpus: &Corpus,
    distribute_weight: bool,
    smoothing: f64,
) -> Result<Freq> {
    let mut by_pos: HashMap<&'static str, HashMap<String, f64>> = HashMap::new();
    for pos_key in ["n", "v", "a", "r"] {
        let mut stmt = conn.prepare("SELECT id FROM synsets WHERE part_of_speech = ?1")?;
        let ids: Vec<String> = stmt
            .query_map([pos_key], |r| r.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut table: HashMap<String, f64> = ids.into_iter().map(|id| (id, smoothing)).collect();
        if pos_key == "a" {
            let mut stmt_s = conn.prepare("SELECT id FROM synsets WHERE part_of_speech = 's'")?;
            for id in stmt_s.query_map([], |r| r.get::<_, String>(0))? {
                table.insert(id?, smoothing);
            }
        }
        table.insert(TOTAL_KEY.to_string(), smoothing);
        by_pos.insert(pos_key, table);
    }

    for (token, &count) in corpus {
        if count == 0 {
            continue;
        }
        let synsets = synsets_for_token(conn, token)?;
        if synsets.is_empty() {
            continue;
        }

        let synsets_for_weight = if distribute_weight { synsets.len() } else { 1 };
        let w = count as f64 / synsets_for_weight as f64;

        for (synset_id, pos_raw) in &synsets {
            let pos_key = if pos_raw == "s" { "a" } else { pos_raw.as_str() };
            let Some(table) = by_pos.get_mut(pos_key) else { continue };
            if !table.contains_key(synset_id) {
                continue;
            }
            let mut visited = HashSet::new();
            propagate(conn, synset_id, w, table, &mut visited)?;
            *table.get_mut(TOTAL_KEY).unwrap() += w;
        }
    }

    Ok(Freq { by_pos })
}

/// Every `(synset id, part of speech)` that `token` denotes, found by
/// matching it case-insensitively against both a word's lemma and any of
/// its forms, then following senses to their synsets.
fn synsets_for_token(conn: &Connection, token: &str) -> Result<Vec<(String, String)>> {
    let token_lower = token.to_lowercase();
    let mut stmt = conn.prepare(
        "SELECT DISTINCT se.synset_id, sy.part_of_speech
         FROM senses se
         JOIN words w ON w.id = se.word_id
         JOIN synsets sy ON sy.id = se.synset_id
         LEFT JOIN forms f ON f.word_id = w.id
         WHERE w.lemma_lower = ?1 OR f.written_form_lower = ?1",
    )?;
    let rows = stmt.query_map([&token_lower], |r| Ok((r.get(0)?, r.get(1)?)))?;
    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
}

fn propagate(
    conn: &Connection,
    synset_id: &str,
    w: f64,
    table: &mut HashMap<String, f64>,
    visited: &mut HashSet<String>,
) -> Result<()> {
    if !visited.insert(synset_id.to_string()) {
        return Ok(());
    }
    if let Some(entry) = table.get_mut(synset_id) {
        *entry += w;
    }
    for parent in hypernyms(conn, synset_id)? {
        propagate(conn, &parent, w, table, visited)?;
    }
    Ok(())
}

/// `IC(synset) = -ln(P(synset))`, or `0.0` when `P <= 0` (unattested
/// synset, matching WordNet::Similarity's convention rather than
/// returning infinity).
pub fn information_content(freq: &Freq, pos: PartOfSpeech, synset_id: &str) -> f64 {
    let p = freq.probability(pos, synset_id);
    if p <= 0.0 {
        0.0
    } else {
        -p.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    fn seed(conn: &Connection) {
        conn.execute(
            "INSERT INTO lexicons (id, version, label, language) VALUES ('t','1','T','en')",
            [],
        )
        .unwrap();
        for id in ["a", "b", "c", "e"] {
            conn.execute(
                "INSERT INTO synsets (id, lexicon_id, lexicon_version, part_of_speech, language)
                 VALUES (?1, 't', '1', 'n', 'en')",
                [id],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO synset_relations (id, source_synset_id, target_synset_id, rel_type)
             VALUES ('r1','a','b','hypernym')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO synset_relations (id, source_synset_id, target_synset_id, rel_type)
             VALUES ('r2','b','c','hypernym')",
            [],
        )
        .unwrap();
        // "e" is a's sibling under "b", so a taxonomy root can accumulate
        // mass from more than one descendant lineage.
        conn.execute(
            "INSERT INTO synset_relations (id, source_synset_id, target_synset_id, rel_type)
             VALUES ('r3','e','b','hypernym')",
            [],
        )
        .unwrap();
        // Two words, "alpha" (sense in "a") and "epsilon" (sense in "e") --
        // the tokens the corpus-keyed tests below attach counts to.
        conn.execute(
            "INSERT INTO words (id, lexicon_id, lexicon_version, lemma, lemma_lower, part_of_speech, language)
             VALUES ('w-alpha', 't', '1', 'alpha', 'alpha', 'n', 'en')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO senses (id, word_id, synset_id, lexicon_id, lexicon_version)
             VALUES ('s-alpha', 'w-alpha', 'a', 't', '1')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO words (id, lexicon_id, lexicon_version, lemma, lemma_lower, part_of_speech, language)
             VALUES ('w-epsilon', 't', '1', 'epsilon', 'epsilon', 'n', 'en')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO senses (id, word_id, synset_id, lexicon_id, lexicon_version)
             VALUES ('s-epsilon', 'w-epsilon', 'e', 't', '1')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn root_accumulates_mass_from_descendants() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let mut corpus = Corpus::new();
        corpus.insert("alpha".to_string(), 10);
        corpus.insert("epsilon".to_string(), 5);
        let freq = compute(&conn, &corpus, false, 1.0).unwrap();
        assert!(freq.freq(PartOfSpeech::N, "c") > freq.freq(PartOfSpeech::N, "a"));
        assert!(freq.freq(PartOfSpeech::N, "c") >= 16.0);
    }

    #[test]
    fn information_content_decreases_up_the_taxonomy() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let mut corpus = Corpus::new();
        corpus.insert("alpha".to_string(), 10);
        let freq = compute(&conn, &corpus, false, 1.0).unwrap();
        let ic_a = information_content(&freq, PartOfSpeech::N, "a");
        let ic_c = information_content(&freq, PartOfSpeech::N, "c");
        assert!(ic_a >= ic_c);
    }

    #[test]
    fn unattested_synset_has_zero_ic_when_no_total() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let freq = compute(&conn, &Corpus::new(), false, 0.0).unwrap();
        assert_eq!(information_content(&freq, PartOfSpeech::N, "a"), 0.0);
    }

    #[test]
    fn distribute_weight_splits_count_across_a_tokens_synsets() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        // "alpha" also names a sense of "b", so it is polysemous.
        conn.execute(
            "INSERT INTO senses (id, word_id, synset_id, lexicon_id, lexicon_version)
             VALUES ('s-alpha-b', 'w-alpha', 'b', 't', '1')",
            [],
        )
        .unwrap();
        let mut corpus = Corpus::new();
        corpus.insert("alpha".to_string(), 10);
        let freq = compute(&conn, &corpus, true, 1.0).unwrap();
        // Each of the two synsets gets half the count (5) plus smoothing.
        assert!((freq.freq(PartOfSpeech::N, "a") - 6.0).abs() < 1e-9);
        // "b" also inherits "a"'s share by propagation, on top of its own.
        assert!(freq.freq(PartOfSpeech::N, "b") > freq.freq(PartOfSpeech::N, "a"));
    }
}
