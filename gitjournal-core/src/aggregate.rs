//! Aggregator: one time-ordered view over several repositories.

use crate::models::CommitRecord;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

/// Total chronological order: author instant, then repo_id, then hash.
///
/// Instants are compared in UTC, so commits authored in different time
/// zones interleave correctly.
pub fn chronological(a: &CommitRecord, b: &CommitRecord) -> Ordering {
    a.author_date
        .cmp(&b.author_date)
        .then_with(|| a.repo_id.cmp(&b.repo_id))
        .then_with(|| a.hash.cmp(&b.hash))
}

/// Heap slot: the next unmerged commit of one input list.
struct Head<'a> {
    commit: &'a CommitRecord,
    list: usize,
    position: usize,
}

impl PartialEq for Head<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head<'_> {}

impl PartialOrd for Head<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        chronological(self.commit, other.commit)
            .then_with(|| self.list.cmp(&other.list))
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Merge per-repository histories into one sequence, oldest first.
///
/// Each list is put in chronological order first (a stable sort, so lists
/// that already are keep their order), then the lists are k-way merged.
pub fn merge(per_repo: BTreeMap<String, Vec<CommitRecord>>) -> Vec<CommitRecord> {
    let lists: Vec<Vec<CommitRecord>> = per_repo
        .into_values()
        .map(|mut commits| {
            commits.sort_by(chronological);
            commits
        })
        .collect();

    let total = lists.iter().map(Vec::len).sum();
    let mut order: Vec<(usize, usize)> = Vec::with_capacity(total);
    let mut heap = BinaryHeap::with_capacity(lists.len());

    for (list, commits) in lists.iter().enumerate() {
        if let Some(commit) = commits.first() {
            heap.push(Reverse(Head {
                commit,
                list,
                position: 0,
            }));
        }
    }

    while let Some(Reverse(head)) = heap.pop() {
        order.push((head.list, head.position));
        let next = head.position + 1;
        if let Some(commit) = lists[head.list].get(next) {
            heap.push(Reverse(Head {
                commit,
                list: head.list,
                position: next,
            }));
        }
    }

    order
        .into_iter()
        .map(|(list, position)| lists[list][position].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn at(repo: &str, hash: &str, seconds: i64) -> CommitRecord {
        let date: DateTime<FixedOffset> = FixedOffset::east_opt(0)
            .unwrap()
            .timestamp_opt(seconds, 0)
            .unwrap();
        CommitRecord::new(repo, hash, date, &format!("{}@{}", repo, seconds))
    }

    fn keys(commits: &[CommitRecord]) -> Vec<(String, i64)> {
        commits
            .iter()
            .map(|c| (c.repo_id.clone(), c.author_date.timestamp()))
            .collect()
    }

    #[test]
    fn test_interleaves_with_deterministic_ties() {
        let mut per_repo = BTreeMap::new();
        per_repo.insert("b".to_string(), vec![at("b", "b2", 2), at("b", "b3", 3)]);
        per_repo.insert("a".to_string(), vec![at("a", "a1", 1), at("a", "a3", 3)]);

        let merged = merge(per_repo.clone());
        assert_eq!(
            keys(&merged),
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("a".to_string(), 3),
                ("b".to_string(), 3),
            ]
        );

        for _ in 0..5 {
            assert_eq!(merge(per_repo.clone()), merged);
        }
    }

    #[test]
    fn test_tie_within_repo_breaks_on_hash() {
        let mut per_repo = BTreeMap::new();
        per_repo.insert("a".to_string(), vec![at("a", "ffff", 5), at("a", "0000", 5)]);

        let hashes: Vec<_> = merge(per_repo).into_iter().map(|c| c.hash).collect();
        assert_eq!(hashes, vec!["0000", "ffff"]);
    }

    #[test]
    fn test_handles_zero_and_one_repository() {
        assert!(merge(BTreeMap::new()).is_empty());

        let mut per_repo = BTreeMap::new();
        per_repo.insert("only".to_string(), vec![at("only", "x", 2), at("only", "y", 1)]);
        assert_eq!(
            keys(&merge(per_repo)),
            vec![("only".to_string(), 1), ("only".to_string(), 2)]
        );

        let mut with_empty = BTreeMap::new();
        with_empty.insert("empty".to_string(), Vec::new());
        assert!(merge(with_empty).is_empty());
    }

    #[test]
    fn test_time_zones_compare_as_instants() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        // 10:00+02:00 is 08:00Z, earlier than 09:00Z.
        let early = CommitRecord::new(
            "z",
            "e",
            east.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            "early",
        );
        let late = CommitRecord::new(
            "a",
            "l",
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .unwrap(),
            "late",
        );

        let mut per_repo = BTreeMap::new();
        per_repo.insert("a".to_string(), vec![late]);
        per_repo.insert("z".to_string(), vec![early]);

        let subjects: Vec<_> = merge(per_repo).into_iter().map(|c| c.subject).collect();
        assert_eq!(subjects, vec!["early", "late"]);
    }
}
