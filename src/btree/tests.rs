//! Whole-tree behaviour: ordering, reference-map equivalence and structural
//! invariants across long operation sequences

use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::*;

const FIXED_KEYS: [&str; 20] = [
    "17", "1", "15", "2", "12", "16", "19", "18", "5", "6", "13", "14", "8", "7", "11", "3", "9",
    "4", "20", "10",
];

const FIXED_DELETIONS: [&str; 20] = [
    "17", "15", "16", "19", "18", "5", "6", "13", "14", "8", "7", "11", "3", "9", "4", "20", "10",
    "1", "2", "12",
];

fn entries(map: &BTreeMap<String, String>) -> Vec<(String, String)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn keys(tree: &BPlusTree) -> Vec<String> {
    tree.traverse().into_iter().map(|(k, _)| k).collect()
}

fn random_key(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..=8);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[test]
fn test_fixed_sequence_natural_order() {
    let mut tree = BPlusTree::with_ordering(3, KeyOrdering::Natural).unwrap();

    for (i, k) in FIXED_KEYS.iter().enumerate() {
        tree.insert(*k, format!("value-{i}"));
        tree.check_invariants().unwrap();
    }

    let expected: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
    assert_eq!(keys(&tree), expected);
}

#[test]
fn test_fixed_sequence_matches_reference() {
    let mut tree = BPlusTree::new(3).unwrap();
    let mut reference = BTreeMap::new();

    for (i, k) in FIXED_KEYS.iter().enumerate() {
        tree.insert(*k, format!("value-{i}"));
        reference.insert(k.to_string(), format!("value-{i}"));

        assert_eq!(tree.traverse(), entries(&reference));
        tree.check_invariants().unwrap();
    }

    let mut sorted: Vec<String> = FIXED_KEYS.iter().map(|k| k.to_string()).collect();
    sorted.sort();
    assert_eq!(keys(&tree), sorted);
}

#[test]
fn test_fixed_deletion_sequence() {
    for ordering in [KeyOrdering::Lexicographic, KeyOrdering::Natural] {
        let mut tree = BPlusTree::with_ordering(3, ordering).unwrap();
        for k in FIXED_KEYS {
            tree.insert(k, k);
        }

        let mut remaining: Vec<&str> = FIXED_KEYS.to_vec();
        for k in FIXED_DELETIONS {
            assert!(tree.delete(k), "{k} should be present");
            remaining.retain(|r| *r != k);
            remaining.sort_by(|a, b| ordering.compare(a, b));

            assert_eq!(keys(&tree), remaining);
            tree.check_invariants().unwrap();
        }

        assert!(tree.is_empty());
    }
}

#[test]
fn test_update_keeps_count_and_order() {
    let mut tree = BPlusTree::new(3).unwrap();
    for k in FIXED_KEYS {
        tree.insert(k, "first");
    }
    let before = keys(&tree);

    for k in FIXED_KEYS {
        assert_eq!(tree.insert(k, "second"), Some("first".to_string()));
    }

    assert_eq!(tree.len(), FIXED_KEYS.len());
    assert_eq!(keys(&tree), before);
    assert!(tree.iter().all(|(_, v)| v == "second"));
    tree.check_invariants().unwrap();
}

#[test]
fn test_delete_absent_leaves_tree_unchanged() {
    let mut tree = BPlusTree::new(4).unwrap();
    for k in FIXED_KEYS {
        tree.insert(k, k);
    }
    let before = tree.traverse();
    let nodes = tree.node_count();

    for absent in ["0", "21", "", "1x", "zzz"] {
        assert!(!tree.delete(absent));
    }

    assert_eq!(tree.traverse(), before);
    assert_eq!(tree.node_count(), nodes);
}

#[test]
fn test_full_drain_behaves_like_fresh_tree() {
    let mut rng = StdRng::seed_from_u64(7);

    for order in [3, 4, 5, 8] {
        let mut tree = BPlusTree::new(order).unwrap();
        let mut all: Vec<String> = (0..500).map(|i| format!("key-{i}")).collect();
        all.shuffle(&mut rng);
        for k in &all {
            tree.insert(k.as_str(), "v");
        }

        all.shuffle(&mut rng);
        for k in &all {
            assert!(tree.delete(k));
        }

        assert!(tree.traverse().is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        tree.check_invariants().unwrap();

        // Same behaviour as a fresh tree afterwards
        let mut fresh = BPlusTree::new(order).unwrap();
        for k in FIXED_KEYS {
            tree.insert(k, k);
            fresh.insert(k, k);
        }
        assert_eq!(tree.traverse(), fresh.traverse());
        assert_eq!(tree.height(), fresh.height());
        assert_eq!(tree.node_count(), fresh.node_count());
    }
}

#[test]
fn test_randomized_differential() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for order in [3, 4, 5, 7, 16] {
        let mut tree = BPlusTree::new(order).unwrap();
        let mut reference: BTreeMap<String, String> = BTreeMap::new();

        let mut pool: Vec<String> = (0..1200).map(|_| random_key(&mut rng)).collect();
        pool.sort();
        pool.dedup();

        for round in 0..6 {
            // Insert batch, some of them overwrites
            for _ in 0..400 {
                let k = pool[rng.gen_range(0..pool.len())].clone();
                let v = format!("{round}-{}", rng.gen_range(0..1000));
                assert_eq!(tree.insert(k.as_str(), v.as_str()), reference.insert(k, v));
                assert_eq!(tree.traverse(), entries(&reference));
            }
            tree.check_invariants().unwrap();

            // Delete batch, some of them absent
            for _ in 0..300 {
                let k = &pool[rng.gen_range(0..pool.len())];
                assert_eq!(tree.delete(k), reference.remove(k).is_some());
                assert_eq!(tree.traverse(), entries(&reference));
            }
            tree.check_invariants().unwrap();
        }

        assert_eq!(tree.len(), reference.len());
    }
}

#[test]
fn test_randomized_differential_natural_order() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut tree = BPlusTree::with_ordering(4, KeyOrdering::Natural).unwrap();
    let mut reference: BTreeMap<String, String> = BTreeMap::new();

    for _ in 0..3000 {
        let k = format!("item{}", rng.gen_range(0..400));
        if rng.gen_bool(0.6) {
            tree.insert(k.as_str(), "v");
            reference.insert(k, "v".to_string());
        } else {
            assert_eq!(tree.delete(&k), reference.remove(&k).is_some());
        }

        let mut expected = entries(&reference);
        expected.sort_by(|a, b| natural_cmp(&a.0, &b.0));
        assert_eq!(tree.traverse(), expected);
    }

    tree.check_invariants().unwrap();
}

#[test]
fn test_invariants_after_every_mutation() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut tree = BPlusTree::new(3).unwrap();
    let mut keys: Vec<String> = (0..300).map(|i| format!("{i:03}")).collect();

    keys.shuffle(&mut rng);
    for k in &keys {
        tree.insert(k.as_str(), "");
        tree.check_invariants().unwrap();
    }

    keys.shuffle(&mut rng);
    for k in keys.iter().take(250) {
        tree.delete(k);
        tree.check_invariants().unwrap();
    }

    assert_eq!(tree.len(), 50);
}

#[test]
fn test_labels_never_repeat() {
    let mut tree = BPlusTree::new(3).unwrap();
    let mut seen = std::collections::HashSet::new();

    for i in 0..200 {
        tree.insert(format!("{i:03}"), "");
        for level in tree.levels() {
            for id in level {
                seen.insert(tree.node(id).unwrap().label());
            }
        }
    }

    // Every label ever observed came from the allocator, which never goes back
    assert!(seen.iter().all(|&l| l >= 1 && l <= tree.labels_allocated()));
    let live: Vec<u64> = tree
        .levels()
        .into_iter()
        .flatten()
        .map(|id| tree.node(id).unwrap().label())
        .collect();
    let unique: std::collections::HashSet<_> = live.iter().collect();
    assert_eq!(unique.len(), live.len());
}

#[derive(Debug, Clone)]
enum Op {
    Insert(String, String),
    Delete(String),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => ("[a-f]{1,3}", "[a-z]{0,4}").prop_map(|(k, v)| Op::Insert(k, v)),
            2 => "[a-f]{1,3}".prop_map(Op::Delete),
        ],
        0..max_ops,
    )
}

proptest! {
    #[test]
    fn prop_ops_match_btreemap(order in 3usize..9, ops in operations(300)) {
        let mut tree = BPlusTree::new(order).unwrap();
        let mut reference: BTreeMap<String, String> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    prop_assert_eq!(tree.insert(k.as_str(), v.as_str()), reference.insert(k, v));
                }
                Op::Delete(k) => {
                    prop_assert_eq!(tree.delete(&k), reference.remove(&k).is_some());
                }
            }
            prop_assert_eq!(tree.traverse(), entries(&reference));
            prop_assert!(tree.check_invariants().is_ok());
        }

        for (k, v) in &reference {
            prop_assert_eq!(tree.get(k), Some(v.as_str()));
        }
    }
}
