use super::*;
use std::thread;

fn metadata(source_file: &str, chunk_index: usize) -> EntryMetadata {
    EntryMetadata {
        source_file: source_file.to_string(),
        file_type: FileType::Text,
        chunk_index,
        total_chunks: 3,
        inserted_at: Utc::now(),
    }
}

/// A deterministic, non-trivial vector of the given dimension
fn create_test_vector(dimension: usize, seed: f32) -> Vec<f32> {
    (0..dimension)
        .map(|i| (i as f32).mul_add(0.37, seed).sin())
        .collect()
}

fn populated_index() -> VectorIndex {
    let index = VectorIndex::new();
    index
        .insert("east".to_string(), vec![1.0, 0.0], metadata("a.txt", 0))
        .expect("insert should succeed");
    index
        .insert("north".to_string(), vec![0.0, 1.0], metadata("a.txt", 1))
        .expect("insert should succeed");
    index
        .insert("north-east".to_string(), vec![1.0, 1.0], metadata("b.md", 0))
        .expect("insert should succeed");
    index
}

fn similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).expect("dimensions should match")
}

#[test]
fn cosine_similarity_known_values() {
    assert!((similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert!((similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    assert!((similarity(&[1.0, 1.0], &[1.0, 0.0]) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
}

#[test]
fn cosine_similarity_zero_vector_is_zero() {
    assert_eq!(similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    assert_eq!(similarity(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]), 0.0);
    assert_eq!(similarity(&[0.0; 4], &[0.0; 4]), 0.0);
}

#[test]
fn cosine_similarity_rejects_different_lengths() {
    assert!(matches!(
        cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]),
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert!(matches!(
        cosine_similarity(&[], &[1.0]),
        Err(RagError::DimensionMismatch { .. })
    ));
}

#[test]
fn cosine_similarity_is_symmetric_and_bounded() {
    for seed in 0..20 {
        let a = create_test_vector(384, seed as f32);
        let b = create_test_vector(384, (seed * 7 + 3) as f32);
        let ab = similarity(&a, &b);
        let ba = similarity(&b, &a);
        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
    }

    let v = create_test_vector(384, 1.5);
    let scaled: Vec<f32> = v.iter().map(|x| x * 1000.0).collect();
    assert!(similarity(&v, &scaled) <= 1.0);
}

#[test]
fn insert_assigns_sequential_ids() {
    let index = VectorIndex::new();
    for expected in 0..5 {
        let id = index
            .insert(
                format!("chunk {expected}"),
                create_test_vector(8, expected as f32),
                metadata("doc.txt", expected),
            )
            .expect("insert should succeed");
        assert_eq!(id, expected);
    }
    assert_eq!(index.count(), 5);
    assert_eq!(index.dimension(), Some(8));
}

#[test]
fn insert_rejects_mismatched_dimension() {
    let index = VectorIndex::new();
    index
        .insert("a".to_string(), vec![1.0; 4], metadata("a.txt", 0))
        .expect("insert should succeed");

    let result = index.insert("b".to_string(), vec![1.0; 3], metadata("a.txt", 1));
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));
    assert_eq!(index.count(), 1);
}

#[test]
fn insert_batch_is_all_or_nothing() {
    let index = VectorIndex::new();
    let items = vec![
        ("a".to_string(), vec![1.0; 4], metadata("a.txt", 0)),
        ("b".to_string(), vec![1.0; 4], metadata("a.txt", 1)),
        ("c".to_string(), vec![1.0; 5], metadata("a.txt", 2)),
    ];

    assert!(matches!(
        index.insert_batch(items),
        Err(RagError::DimensionMismatch {
            expected: 4,
            actual: 5
        })
    ));
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);

    let ids = index
        .insert_batch(vec![
            ("a".to_string(), vec![1.0; 4], metadata("a.txt", 0)),
            ("b".to_string(), vec![2.0; 4], metadata("a.txt", 1)),
        ])
        .expect("batch insert should succeed");
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn search_orders_by_similarity() {
    let index = populated_index();

    let results = index.search(&[1.0, 0.1], 3).expect("search should succeed");

    let texts: Vec<&str> = results.iter().map(|r| r.entry.text.as_str()).collect();
    assert_eq!(texts, vec!["east", "north-east", "north"]);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[test]
fn search_truncates_to_top_k() {
    let index = populated_index();

    assert_eq!(index.search(&[1.0, 0.0], 2).expect("search").len(), 2);
    assert_eq!(index.search(&[1.0, 0.0], 10).expect("search").len(), 3);
    assert!(index.search(&[1.0, 0.0], 0).expect("search").is_empty());
}

#[test]
fn search_ties_keep_insertion_order() {
    let index = VectorIndex::new();
    for i in 0..5 {
        index
            .insert(format!("same {i}"), vec![0.5, 0.5], metadata("t.txt", i))
            .expect("insert should succeed");
    }

    let first = index.search(&[1.0, 1.0], 5).expect("search should succeed");
    let ids: Vec<usize> = first.iter().map(|r| r.entry.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let second = index.search(&[1.0, 1.0], 5).expect("search should succeed");
    let repeat: Vec<usize> = second.iter().map(|r| r.entry.id).collect();
    assert_eq!(ids, repeat);
}

#[test]
fn search_empty_index_returns_nothing() {
    let index = VectorIndex::new();
    let results = index.search(&[1.0, 2.0, 3.0], 3).expect("search should succeed");
    assert!(results.is_empty());
}

#[test]
fn search_rejects_mismatched_query_dimension() {
    let index = VectorIndex::new();
    index
        .insert(
            "stored".to_string(),
            create_test_vector(384, 0.0),
            metadata("a.txt", 0),
        )
        .expect("insert should succeed");

    let result = index.search(&create_test_vector(300, 0.0), 3);
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 384,
            actual: 300
        })
    ));
}

#[test]
fn clear_resets_ids_and_dimension() {
    let index = populated_index();
    index.clear();

    assert_eq!(index.count(), 0);
    assert_eq!(index.dimension(), None);
    assert!(index.search(&[1.0, 0.0], 3).expect("search").is_empty());

    let id = index
        .insert("fresh".to_string(), vec![1.0, 2.0, 3.0], metadata("c.txt", 0))
        .expect("insert after clear should succeed");
    assert_eq!(id, 0);
    assert_eq!(index.dimension(), Some(3));
}

#[test]
fn clear_is_idempotent() {
    let index = VectorIndex::new();
    index.clear();
    index.clear();
    assert_eq!(index.count(), 0);
    assert!(index.all_entries().is_empty());
}

#[test]
fn all_entries_is_a_snapshot() {
    let index = populated_index();
    let snapshot = index.all_entries();
    index.clear();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[2].text, "north-east");
    assert_eq!(snapshot[2].metadata.source_file, "b.md");
}

#[test]
fn sources_group_by_file() {
    let index = populated_index();
    let sources = index.sources();

    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].source_file, "a.txt");
    assert_eq!(sources[0].chunks, 2);
    assert_eq!(sources[1].source_file, "b.md");
    assert_eq!(sources[1].chunks, 1);
}

#[test]
fn concurrent_inserts_get_unique_ids() {
    let index = Arc::new(VectorIndex::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        index
                            .insert(
                                format!("thread {t} chunk {i}"),
                                create_test_vector(16, (t * 50 + i) as f32),
                                metadata("concurrent.txt", i),
                            )
                            .expect("insert should succeed")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("thread should not panic"))
        .collect();
    ids.sort_unstable();

    assert_eq!(ids, (0..400).collect::<Vec<_>>());
    for (position, entry) in index.all_entries().iter().enumerate() {
        assert_eq!(entry.id, position);
    }
}
