//! Choosing which targets to hoist: a hitting set over closed sequences.

use gts_core::config::{HittingSetStrategy, ResolveConfig};
use std::collections::{BTreeMap, BTreeSet};

/// Pick ids so that every sequence contains at least one of them.
pub fn choose_hoists(sequences: &[Vec<String>], config: &ResolveConfig) -> Vec<String> {
    match config.hitting_set {
        HittingSetStrategy::Greedy => greedy_hitting_set(sequences),
        HittingSetStrategy::Exact => exact_hitting_set(sequences, config.exact_max_candidates)
            .unwrap_or_else(|| {
                tracing::debug!(
                    limit = config.exact_max_candidates,
                    "too many hoist candidates for exact search, using greedy"
                );
                greedy_hitting_set(sequences)
            }),
    }
}

/// Repeatedly take the id occurring most often in the sequences not yet
/// hit. Ties go to the smallest id.
pub fn greedy_hitting_set(sequences: &[Vec<String>]) -> Vec<String> {
    let mut remaining: Vec<&Vec<String>> = sequences.iter().filter(|s| !s.is_empty()).collect();
    let mut chosen = Vec::new();

    while !remaining.is_empty() {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for sequence in &remaining {
            for id in *sequence {
                *counts.entry(id.as_str()).or_default() += 1;
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (id, count) in counts {
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((id, count));
            }
        }
        let Some((pick, _)) = best else { break };

        remaining.retain(|s| !s.iter().any(|id| id == pick));
        chosen.push(pick.to_string());
    }
    chosen
}

/// Smallest hitting set, or `None` if there are more than `max_candidates`
/// distinct ids. Sets are tried by size, then in lexicographic order of their
/// sorted ids, so the result is deterministic.
pub fn exact_hitting_set(sequences: &[Vec<String>], max_candidates: usize) -> Option<Vec<String>> {
    let candidates: Vec<&String> = sequences
        .iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if candidates.len() > max_candidates || candidates.len() > 32 {
        return None;
    }

    let index: BTreeMap<&String, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let masks: Vec<u32> = sequences
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().fold(0u32, |mask, id| mask | (1 << index[id])))
        .collect();

    let n = candidates.len();
    for size in 0..=n {
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            let chosen = combo.iter().fold(0u32, |mask, i| mask | (1 << i));
            if masks.iter().all(|m| m & chosen != 0) {
                return Some(combo.iter().map(|&i| candidates[i].clone()).collect());
            }
            if !next_combination(&mut combo, n) {
                break;
            }
        }
    }
    None
}

/// Advance `combo` to the next `k`-subset of `0..n` in lexicographic order.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let k = combo.len();
    let Some(i) = (0..k).rev().find(|&i| combo[i] < n - k + i) else {
        return false;
    };
    combo[i] += 1;
    for j in i + 1..k {
        combo[j] = combo[j - 1] + 1;
    }
    true
}

/// True if every non-empty sequence contains one of `chosen`.
pub fn hits_all(sequences: &[Vec<String>], chosen: &[String]) -> bool {
    sequences
        .iter()
        .filter(|s| !s.is_empty())
        .all(|s| s.iter().any(|id| chosen.contains(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(input: &[&[&str]]) -> Vec<Vec<String>> {
        input
            .iter()
            .map(|s| s.iter().map(|id| (*id).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_greedy_picks_most_common() {
        let sequences = seqs(&[
            &["a", "b", "c"],
            &["c", "d", "e"],
            &["d", "c", "b"],
            &["a", "k", "z"],
            &["e", "k", "j"],
        ]);
        let chosen = greedy_hitting_set(&sequences);
        assert_eq!(chosen, vec!["c", "k"]);
        assert!(hits_all(&sequences, &chosen));
    }

    #[test]
    fn test_greedy_tie_breaks_by_id() {
        let sequences = seqs(&[&["p1", "p3"], &["p2", "p4"]]);
        assert_eq!(greedy_hitting_set(&sequences), vec!["p1", "p2"]);
    }

    #[test]
    fn test_greedy_empty() {
        assert!(greedy_hitting_set(&[]).is_empty());
        assert!(hits_all(&[], &[]));
    }

    #[test]
    fn test_exact_beats_greedy() {
        // Greedy takes "x" (in four sequences) and still needs "a" and "b";
        // {a, b} alone hits everything.
        let sequences = seqs(&[
            &["a", "x"],
            &["a", "y", "x"],
            &["a", "z"],
            &["b", "x"],
            &["b", "w", "x"],
            &["b", "v"],
        ]);
        let greedy = greedy_hitting_set(&sequences);
        assert_eq!(greedy, vec!["x", "a", "b"]);
        let exact = exact_hitting_set(&sequences, 16).unwrap();
        assert_eq!(exact, vec!["a", "b"]);
        assert!(hits_all(&sequences, &exact));
        assert!(hits_all(&sequences, &greedy));
    }

    #[test]
    fn test_exact_respects_candidate_limit() {
        let sequences = seqs(&[&["a", "b", "c"]]);
        assert_eq!(exact_hitting_set(&sequences, 2), None);
        assert_eq!(exact_hitting_set(&sequences, 3), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_choose_hoists_falls_back_to_greedy() {
        let config = ResolveConfig {
            hitting_set: HittingSetStrategy::Exact,
            exact_max_candidates: 1,
            ..ResolveConfig::default()
        };
        let sequences = seqs(&[&["a", "b"], &["b", "c"]]);
        assert_eq!(choose_hoists(&sequences, &config), vec!["b"]);
    }

    #[test]
    fn test_next_combination_order() {
        let mut combo = vec![0, 1];
        let mut seen = vec![combo.clone()];
        while next_combination(&mut combo, 4) {
            seen.push(combo.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }
}
