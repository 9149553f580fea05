//! Hypernym-graph traversal: paths, depths, roots/leaves, common ancestors.
//!
//! Everything here reads through the store directly (a `rusqlite::Connection`
//! reference) rather than the `Wordnet` façade, since these are pure
//! read-only traversals that do not need normalization/lemmatizer options —
//! they operate on already-resolved synset ids.

use crate::error::{Error, Result};
use crate::models::PartOfSpeech;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

const HYPERNYM: &str = "hypernym";

/// Synset ids this synset names as a `hypernym` target.
pub fn hypernyms(conn: &Connection, synset_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target_synset_id FROM synset_relations WHERE source_synset_id = ?1 AND rel_type = ?2",
    )?;
    let rows = stmt.query_map([synset_id, HYPERNYM], |r| r.get(0))?;
    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Error::from)
}

/// Synsets with no outbound hypernym relation, i.e. the roots of the
/// hypernym forest, optionally restricted to one POS.
pub fn roots(conn: &Connection, pos: Option<PartOfSpeech>) -> Result<Vec<String>> {
    let sql = "SELECT s.id FROM synsets s
               WHERE NOT EXISTS (
                   SELECT 1 FROM synset_relations r
                   WHERE r.source_synset_id = s.id AND r.rel_type = ?1
               )";
    let mut stmt = conn.prepare(sql)?;
    let mut ids: Vec<String> = stmt
        .query_map([HYPERNYM], |r| r.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if let Some(pos) = pos {
        let pos_str = pos.as_str();
        let mut stmt2 = conn.prepare("SELECT part_of_speech FROM synsets WHERE id = ?1")?;
        ids.retain(|id| {
            stmt2
                .query_row([id], |r| r.get::<_, String>(0))
                .map(|p| p == pos_str)
                .unwrap_or(false)
        });
    }
    Ok(ids)
}

/// Synsets no other synset points to via `hypernym`, i.e. the most specific
/// concepts, optionally restricted to one POS.
pub fn leaves(conn: &Connection, pos: Option<PartOfSpeech>) -> Result<Vec<String>> {
    let sql = "SELECT s.id FROM synsets s
               WHERE NOT EXISTS (
                   SELECT 1 FROM synset_relations r
                   WHERE r.target_synset_id = s.id AND r.rel_type = ?1
               )";
    let mut stmt = conn.prepare(sql)?;
    let mut ids: Vec<String> = stmt
        .query_map([HYPERNYM], |r| r.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if let Some(pos) = pos {
        let pos_str = pos.as_str();
        let mut stmt2 = conn.prepare("SELECT part_of_speech FROM synsets WHERE id = ?1")?;
        ids.retain(|id| {
            stmt2
                .query_row([id], |r| r.get::<_, String>(0))
                .map(|p| p == pos_str)
                .unwrap_or(false)
        });
    }
    Ok(ids)
}

/// Every DFS chain from `synset_id` that reaches a hypernym-less synset.
/// Each returned path starts with the nearest hypernym and ends at a root;
/// `synset_id` itself is not included. With `simulate_root`, a synthetic
/// `__root__:<pos>` node is appended to otherwise-rootless chains so
/// disconnected components still share an ancestor.
pub fn hypernym_paths(
    conn: &Connection,
    synset_id: &str,
    simulate_root: bool,
) -> Result<Vec<Vec<String>>> {
    fn dfs(
        conn: &Connection,
        node: &str,
        path: &mut Vec<String>,
        out: &mut Vec<Vec<String>>,
        pos: &str,
        simulate_root: bool,
    ) -> Result<()> {
        let parents = hypernyms(conn, node)?;
        if parents.is_empty() {
            let mut complete = path.clone();
            if simulate_root {
                complete.push(format!("__root__:{}", pos));
            }
            out.push(complete);
            return Ok(());
        }
        for parent in parents {
            path.push(parent.clone());
            dfs(conn, &parent, path, out, pos, simulate_root)?;
            path.pop();
        }
        Ok(())
    }

    let pos: String = conn.query_row(
        "SELECT part_of_speech FROM synsets WHERE id = ?1",
        [synset_id],
        |r| r.get(0),
    )?;
    let mut out = Vec::new();
    let mut path = Vec::new();
    dfs(conn, synset_id, &mut path, &mut out, &pos, simulate_root)?;
    Ok(out)
}

/// BFS over `hypernym` edges starting at (and including) `start`: maps each
/// reachable node to `(distance, parent)`.
fn ancestor_distances(conn: &Connection, start: &str) -> Result<HashMap<String, (u32, Option<String>)>> {
    let mut dist = HashMap::new();
    dist.insert(start.to_string(), (0u32, None));
    let mut queue = VecDeque::new();
    queue.push_back(start.to_string());
    while let Some(node) = queue.pop_front() {
        let (d, _) = dist[&node].clone();
        for parent in hypernyms(conn, &node)? {
            if !dist.contains_key(&parent) {
                dist.insert(parent.clone(), (d + 1, Some(node.clone())));
                queue.push_back(parent);
            }
        }
    }
    Ok(dist)
}

/// Longest hypernym chain from `synset_id` to any root.
pub fn max_depth(conn: &Connection, synset_id: &str) -> Result<u32> {
    let paths = hypernym_paths(conn, synset_id, false)?;
    Ok(paths.iter().map(|p| p.len() as u32).max().unwrap_or(0))
}

/// Shortest hypernym chain from `synset_id` to any root.
pub fn min_depth(conn: &Connection, synset_id: &str) -> Result<u32> {
    let paths = hypernym_paths(conn, synset_id, false)?;
    Ok(paths.iter().map(|p| p.len() as u32).min().unwrap_or(0))
}

/// Ancestors of `a` and `b` (inclusive) whose depth is maximal among
/// shared ancestors — ties are all returned.
pub fn lowest_common_hypernyms(conn: &Connection, a: &str, b: &str) -> Result<Vec<String>> {
    let dist_a = ancestor_distances(conn, a)?;
    let dist_b = ancestor_distances(conn, b)?;
    let mut by_depth: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for (node, (da, _)) in &dist_a {
        if let Some((db, _)) = dist_b.get(node) {
            // "depth" here is distance from the nearer of the two starting
            // points' own depth in the overall taxonomy; we approximate
            // with the deeper (more specific) of the two distances from
            // root proxied by min(da, db) being smaller for deeper nodes.
            let rank = u32::MAX - da.max(db);
            by_depth.entry(rank).or_default().push(node.clone());
        }
    }
    Ok(by_depth
        .into_iter()
        .next_back()
        .map(|(_, nodes)| nodes)
        .unwrap_or_default())
}

/// The path of intermediate synsets connecting `a` and `b` through their
/// lowest common hypernym, excluding `a` and `b` themselves.
///
/// Returns `[]` when `a == b`. Raises `NoPath` when the two synsets share
/// no common ancestor, unless `simulate_root` is set, in which case a
/// synthetic root is used as the common ancestor.
pub fn shortest_path(
    conn: &Connection,
    a: &str,
    b: &str,
    simulate_root: bool,
) -> Result<Vec<String>> {
    if a == b {
        return Ok(Vec::new());
    }

    let dist_a = ancestor_distances(conn, a)?;
    let dist_b = ancestor_distances(conn, b)?;

    let common = dist_a
        .iter()
        .filter_map(|(node, (da, _))| dist_b.get(node).map(|(db, _)| (node.clone(), da + db)))
        .min_by_key(|(_, total)| *total);

    let (common_node, chain_a, chain_b) = match common {
        Some((node, _)) => {
            let chain_a = reconstruct_chain(&dist_a, a, &node);
            let chain_b = reconstruct_chain(&dist_b, b, &node);
            (node, chain_a, chain_b)
        }
        None => {
            if !simulate_root {
                return Err(Error::NoPath);
            }
            let pos: String = conn.query_row(
                "SELECT part_of_speech FROM synsets WHERE id = ?1",
                [a],
                |r| r.get(0),
            )?;
            let root = format!("__root__:{}", pos);
            let mut chain_a = root_chain(&dist_a, a);
            chain_a.push(root.clone());
            let mut chain_b = root_chain(&dist_b, b);
            chain_b.push(root.clone());
            (root, chain_a, chain_b)
        }
    };

    // chain_a: [a, ..., common]; chain_b: [b, ..., common].
    let mut full = chain_a[..chain_a.len() - 1].to_vec();
    full.push(common_node);
    full.extend(chain_b[..chain_b.len() - 1].iter().rev().cloned());

    // Drop both endpoints (a and b) to get the interior path.
    if full.len() <= 2 {
        Ok(Vec::new())
    } else {
        Ok(full[1..full.len() - 1].to_vec())
    }
}

fn reconstruct_chain(
    dist: &HashMap<String, (u32, Option<String>)>,
    start: &str,
    target: &str,
) -> Vec<String> {
    let mut chain = vec![target.to_string()];
    let mut node = target.to_string();
    while node != start {
        match dist.get(&node).and_then(|(_, parent)| parent.clone()) {
            Some(parent) => {
                node = parent.clone();
                chain.push(parent);
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

fn root_chain(dist: &HashMap<String, (u32, Option<String>)>, start: &str) -> Vec<String> {
    // Longest chain (by distance) from `start`, used only for the
    // simulate_root fallback where no real common ancestor exists.
    let deepest = dist.iter().max_by_key(|(_, (d, _))| *d);
    match deepest {
        Some((node, _)) => reconstruct_chain(dist, start, node),
        None => vec![start.to_string()],
    }
}

/// Detects a cycle in the hypernym sub-graph restricted to `pos` within one
/// lexicon, via iterative DFS with a recursion-stack set.
pub fn has_hypernym_cycle(conn: &Connection, lexicon_id: &str, lexicon_version: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT id FROM synsets WHERE lexicon_id = ?1 AND lexicon_version = ?2",
    )?;
    let ids: Vec<String> = stmt
        .query_map([lexicon_id, lexicon_version], |r| r.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();

    fn visit(
        conn: &Connection,
        node: &str,
        visited: &mut HashSet<String>,
        on_stack: &mut HashSet<String>,
    ) -> Result<bool> {
        if on_stack.contains(node) {
            return Ok(true);
        }
        if visited.contains(node) {
            return Ok(false);
        }
        visited.insert(node.to_string());
        on_stack.insert(node.to_string());
        for parent in hypernyms(conn, node)? {
            if visit(conn, &parent, visited, on_stack)? {
                return Ok(true);
            }
        }
        on_stack.remove(node);
        Ok(false)
    }

    for id in ids {
        if visit(conn, &id, &mut visited, &mut on_stack)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    fn seed_chain(conn: &Connection) {
        conn.execute(
            "INSERT INTO lexicons (id, version, label, language) VALUES ('t','1','T','en')",
            [],
        )
        .unwrap();
        for id in ["a", "b", "c"] {
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
    }

    #[test]
    fn shortest_path_through_chain() {
        let conn = open_in_memory().unwrap();
        seed_chain(&conn);
        let path = shortest_path(&conn, "a", "c", false).unwrap();
        assert_eq!(path, vec!["b".to_string()]);
    }

    #[test]
    fn shortest_path_identity_is_empty() {
        let conn = open_in_memory().unwrap();
        seed_chain(&conn);
        assert_eq!(shortest_path(&conn, "a", "a", false).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn max_depth_of_chain() {
        let conn = open_in_memory().unwrap();
        seed_chain(&conn);
        assert_eq!(max_depth(&conn, "a").unwrap(), 2);
        assert_eq!(max_depth(&conn, "c").unwrap(), 0);
    }

    #[test]
    fn roots_and_leaves() {
        let conn = open_in_memory().unwrap();
        seed_chain(&conn);
        assert_eq!(roots(&conn, None).unwrap(), vec!["c".to_string()]);
        assert_eq!(leaves(&conn, None).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn disconnected_synsets_have_no_path() {
        let conn = open_in_memory().unwrap();
        seed_chain(&conn);
        conn.execute(
            "INSERT INTO synsets (id, lexicon_id, lexicon_version, part_of_speech, language)
             VALUES ('d', 't', '1', 'n', 'en')",
            [],
        )
        .unwrap();
        let err = shortest_path(&conn, "a", "d", false).unwrap_err();
        assert!(matches!(err, Error::NoPath));
    }
}
