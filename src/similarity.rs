//! Synset similarity measures: path-based (`path`, `wup`, `lch`) and
//! information-content-based (`res`, `jcn`, `lin`).
//!
//! All six require `a` and `b` to share a part of speech; the taxonomy
//! these measures walk (hypernymy) only connects synsets of the same POS.

use crate::error::{Error, Result};
use crate::graph::{hypernym_paths, hypernyms, lowest_common_hypernyms, max_depth, shortest_path};
use crate::ic::{information_content, Freq};
use crate::models::PartOfSpeech;
use rusqlite::Connection;

fn require_same_pos(conn: &Connection, a: &str, b: &str) -> Result<PartOfSpeech> {
    let pos_a: String = conn.query_row(
        "SELECT part_of_speech FROM synsets WHERE id = ?1",
        [a],
        |r| r.get(0),
    )?;
    let pos_b: String = conn.query_row(
        "SELECT part_of_speech FROM synsets WHERE id = ?1",
        [b],
        |r| r.get(0),
    )?;
    if pos_a != pos_b {
        return Err(Error::IncompatiblePos);
    }
    pos_a.parse().map_err(|_| Error::IncompatiblePos)
}

/// Length of the shortest hypernym path between `a` and `b`: the number of
/// interior synsets `graph::shortest_path` returns (0 for `a == b`, since
/// the path is then empty). `None` when `a` and `b` share no ancestor.
fn edge_distance(conn: &Connection, a: &str, b: &str) -> Result<Option<u32>> {
    if a == b {
        return Ok(Some(0));
    }
    match shortest_path(conn, a, b, false) {
        Ok(interior) => Ok(Some(interior.len() as u32)),
        Err(Error::NoPath) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `1 / (d + 1)`, where `d` is the length of the shortest hypernym path
/// between `a` and `b`. `1.0` for `a == b`; `0.0` when disconnected.
pub fn path(conn: &Connection, a: &str, b: &str) -> Result<f64> {
    require_same_pos(conn, a, b)?;
    Ok(match edge_distance(conn, a, b)? {
        Some(d) => 1.0 / (d as f64 + 1.0),
        None => 0.0,
    })
}

/// Picks the lowest common hypernym among `lowest_common_hypernyms`'s
/// (possibly tied) candidates deterministically: sorts by id first so a
/// tie always resolves to the same member regardless of the HashMap
/// iteration order that produced the candidate list.
fn pick_lcs(conn: &Connection, a: &str, b: &str) -> Result<Option<String>> {
    let mut candidates = lowest_common_hypernyms(conn, a, b)?;
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Wu-Palmer: `2k / (i + j + 2k)`, where `i`/`j` are the shortest-path
/// lengths from `a`/`b` to their lowest common hypernym and `k` is that
/// hypernym's deepest depth plus one.
pub fn wup(conn: &Connection, a: &str, b: &str) -> Result<f64> {
    require_same_pos(conn, a, b)?;
    if a == b {
        return Ok(1.0);
    }
    let Some(lcs) = pick_lcs(conn, a, b)? else {
        return Ok(0.0);
    };
    let i = shortest_path(conn, a, &lcs, false)?.len() as f64;
    let j = shortest_path(conn, b, &lcs, false)?.len() as f64;
    let k = max_depth(conn, &lcs)? as f64 + 1.0;
    let denom = i + j + 2.0 * k;
    if denom <= 0.0 {
        Ok(0.0)
    } else {
        Ok(2.0 * k / denom)
    }
}

/// Leacock-Chodorow: `-ln((dist(a,b) + 1) / (2 * maxDepth))`, where
/// `maxDepth` is the deepest node in the whole taxonomy for this POS,
/// supplied by the caller since it is corpus/lexicon-wide rather than
/// a property of `a`/`b` alone.
pub fn lch(conn: &Connection, a: &str, b: &str, max_taxonomy_depth: i64) -> Result<f64> {
    if max_taxonomy_depth <= 0 {
        return Err(Error::InvalidMaxDepth(max_taxonomy_depth));
    }
    require_same_pos(conn, a, b)?;
    let dist = match edge_distance(conn, a, b)? {
        Some(d) => d,
        None => return Err(Error::NoPath),
    };
    Ok(-((dist as f64 + 1.0) / (2.0 * max_taxonomy_depth as f64)).ln())
}

/// The common subsumer of `a` and `b` with the highest information content
/// ("most-informative LCS"), considering every candidate
/// `lowest_common_hypernyms` returns rather than an arbitrary tied member.
fn most_informative_lcs(
    conn: &Connection,
    a: &str,
    b: &str,
    pos: PartOfSpeech,
    freq: &Freq,
) -> Result<Option<String>> {
    let mut candidates = lowest_common_hypernyms(conn, a, b)?;
    candidates.sort();
    Ok(candidates
        .into_iter()
        .map(|id| {
            let ic = information_content(freq, pos, &id);
            (id, ic)
        })
        .fold(None, |best: Option<(String, f64)>, (id, ic)| match best {
            Some((_, best_ic)) if best_ic >= ic => best,
            _ => Some((id, ic)),
        })
        .map(|(id, _)| id))
}

/// Resnik: `IC(lcs(a, b))`.
pub fn res(conn: &Connection, a: &str, b: &str, freq: &Freq) -> Result<f64> {
    let pos = require_same_pos(conn, a, b)?;
    let Some(lcs) = most_informative_lcs(conn, a, b, pos, freq)? else {
        return Ok(0.0);
    };
    Ok(information_content(freq, pos, &lcs))
}

/// Jiang-Conrath: `1 / (IC(a) + IC(b) - 2*IC(lcs(a,b)))`, or `0.0` when
/// the denominator collapses to zero or below (identical/maximally
/// specific synsets).
pub fn jcn(conn: &Connection, a: &str, b: &str, freq: &Freq) -> Result<f64> {
    let pos = require_same_pos(conn, a, b)?;
    if a == b {
        return Ok(1.0);
    }
    let Some(lcs) = most_informative_lcs(conn, a, b, pos, freq)? else {
        return Ok(0.0);
    };
    let ic_a = information_content(freq, pos, a);
    let ic_b = information_content(freq, pos, b);
    let ic_lcs = information_content(freq, pos, &lcs);
    let denom = ic_a + ic_b - 2.0 * ic_lcs;
    if denom <= 0.0 {
        Ok(0.0)
    } else {
        Ok(1.0 / denom)
    }
}

/// Lin: `min(1, 2*IC(lcs(a,b)) / (IC(a) + IC(b)))`, or `0.0` when both ICs
/// are zero (unattested synsets).
pub fn lin(conn: &Connection, a: &str, b: &str, freq: &Freq) -> Result<f64> {
    let pos = require_same_pos(conn, a, b)?;
    if a == b {
        return Ok(1.0);
    }
    let Some(lcs) = most_informative_lcs(conn, a, b, pos, freq)? else {
        return Ok(0.0);
    };
    let ic_a = information_content(freq, pos, a);
    let ic_b = information_content(freq, pos, b);
    let ic_lcs = information_content(freq, pos, &lcs);
    let denom = ic_a + ic_b;
    if denom <= 0.0 {
        Ok(0.0)
    } else {
        Ok((2.0 * ic_lcs / denom).min(1.0))
    }
}

/// Deepest hypernym path length found anywhere among `pos`'s synsets;
/// the denominator `lch` needs and which callers typically compute once
/// per lexicon/POS and cache.
pub fn max_taxonomy_depth(conn: &Connection, pos: PartOfSpeech) -> Result<i64> {
    let ids: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT id FROM synsets WHERE part_of_speech = ?1")?;
        stmt.query_map([pos.as_str()], |r| r.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    let mut max_depth = 0i64;
    for id in ids {
        let paths = hypernym_paths(conn, &id, false)?;
        if let Some(longest) = paths.iter().map(|p| p.len()).max() {
            max_depth = max_depth.max(longest as i64);
        } else if hypernyms(conn, &id)?.is_empty() {
            // root, depth 0, no contribution
        }
    }
    Ok(max_depth.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ic::{compute, Corpus};
    use crate::store::open_in_memory;

    /// a -> b -> c (hypernym chain, root c); d -> b as a sibling hyponym.
    fn seed(conn: &Connection) {
        conn.execute(
            "INSERT INTO lexicons (id, version, label, language) VALUES ('t','1','T','en')",
            [],
        )
        .unwrap();
        for id in ["a", "b", "c", "d"] {
            conn.execute(
                "INSERT INTO synsets (id, lexicon_id, lexicon_version, part_of_speech, language)
                 VALUES (?1, 't', '1', 'n', 'en')",
                [id],
            )
            .unwrap();
        }
        for (rid, s, t) in [("r1", "a", "b"), ("r2", "b", "c"), ("r3", "d", "b")] {
            conn.execute(
                "INSERT INTO synset_relations (id, source_synset_id, target_synset_id, rel_type)
                 VALUES (?1, ?2, ?3, 'hypernym')",
                [rid, s, t],
            )
            .unwrap();
        }
        // One word per synset, named after it, so information-content tests
        // can attach corpus counts to a token rather than a synset id.
        for id in ["a", "b", "c", "d"] {
            conn.execute(
                "INSERT INTO words (id, lexicon_id, lexicon_version, lemma, lemma_lower, part_of_speech, language)
                 VALUES (?1, 't', '1', ?1, ?1, 'n', 'en')",
                [id],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO senses (id, word_id, synset_id, lexicon_id, lexicon_version)
                 VALUES (?1, ?2, ?2, 't', '1')",
                [format!("{id}-sense"), id.to_string()],
            )
            .unwrap();
        }
    }

    #[test]
    fn path_similarity_of_siblings() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        // a -> b <- d: shortest path's interior is [b], so d = 1 -> 1/2.
        let sim = path(&conn, "a", "d").unwrap();
        assert!((sim - 0.5).abs() < 1e-9, "expected 1/2, got {sim}");
    }

    #[test]
    fn path_similarity_identity_is_one() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        assert_eq!(path(&conn, "a", "a").unwrap(), 1.0);
    }

    #[test]
    fn incompatible_pos_is_rejected() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        conn.execute(
            "INSERT INTO synsets (id, lexicon_id, lexicon_version, part_of_speech, language)
             VALUES ('v1', 't', '1', 'v', 'en')",
            [],
        )
        .unwrap();
        let err = path(&conn, "a", "v1").unwrap_err();
        assert!(matches!(err, Error::IncompatiblePos));
    }

    #[test]
    fn wup_of_siblings_under_shared_ancestor() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        // a and d are both immediate children of lcs "b": i = j = 0, so
        // wup collapses to 2k/2k = 1.0 regardless of b's depth.
        let sim = wup(&conn, "a", "d").unwrap();
        assert_eq!(sim, 1.0);
    }

    #[test]
    fn wup_of_cousins_at_different_depths() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        // e -> d -> b -> c: e is one hop further from the shared ancestor
        // "b" than "a" is, so i != j and wup must fall strictly below 1.0.
        conn.execute(
            "INSERT INTO synsets (id, lexicon_id, lexicon_version, part_of_speech, language)
             VALUES ('e', 't', '1', 'n', 'en')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO synset_relations (id, source_synset_id, target_synset_id, rel_type)
             VALUES ('r4','e','d','hypernym')",
            [],
        )
        .unwrap();
        let sim = wup(&conn, "a", "e").unwrap();
        // i=0 (a is an immediate child of lcs "b"), j=1 (e -> d -> b),
        // k = maxDepth(b)+1 = 2 -> 2*2/(0+1+4) = 4/5.
        assert!((sim - 0.8).abs() < 1e-9, "expected 0.8, got {sim}");
    }

    #[test]
    fn res_uses_information_content_of_lcs() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let mut corpus = Corpus::new();
        corpus.insert("a".to_string(), 5);
        corpus.insert("d".to_string(), 5);
        let freq = compute(&conn, &corpus, false, 1.0).unwrap();
        let r = res(&conn, "a", "d", &freq).unwrap();
        assert!(r >= 0.0);
    }

    #[test]
    fn identity_similarity_is_maximal() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let freq = compute(&conn, &Corpus::new(), false, 1.0).unwrap();
        assert_eq!(path(&conn, "a", "a").unwrap(), 1.0);
        assert_eq!(wup(&conn, "a", "a").unwrap(), 1.0);
        assert_eq!(jcn(&conn, "a", "a", &freq).unwrap(), 1.0);
        assert_eq!(lin(&conn, "a", "a", &freq).unwrap(), 1.0);
    }

    #[test]
    fn lch_rejects_non_positive_max_depth() {
        let conn = open_in_memory().unwrap();
        seed(&conn);
        let err = lch(&conn, "a", "d", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidMaxDepth(0)));
    }
}
