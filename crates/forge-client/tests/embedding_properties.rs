//! Property-based tests for embedding math and version compatibility

use forge_client::{
    batch_calculate_similarities, calculate_similarity, extract_embedding,
    is_compatible_ollama_version, normalize_vector, top_k_similarities, ClientError,
};
use proptest::prelude::*;
use serde_json::json;

fn non_zero_vector() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1000.0f64..1000.0, 1..64)
        .prop_filter("vector must have a non-zero norm", |v| {
            v.iter().map(|x| x * x).sum::<f64>().sqrt() > 1e-3
        })
}

fn vector_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..64).prop_flat_map(|len| {
        (
            prop::collection::vec(-1000.0f64..1000.0, len),
            prop::collection::vec(-1000.0f64..1000.0, len),
        )
    })
}

proptest! {
    #[test]
    fn prop_self_similarity_is_one(v in non_zero_vector()) {
        let sim = calculate_similarity(&v, &v).unwrap();
        prop_assert!((sim - 1.0).abs() < 1e-9, "sim(v, v) = {}", sim);
    }

    #[test]
    fn prop_similarity_is_symmetric((a, b) in vector_pair()) {
        let ab = calculate_similarity(&a, &b).unwrap();
        let ba = calculate_similarity(&b, &a).unwrap();
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn prop_normalized_vector_has_unit_norm(v in non_zero_vector()) {
        let n: f64 = normalize_vector(&v).iter().map(|x| x * x).sum::<f64>().sqrt();
        prop_assert!((n - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_version_compatibility_matches_tuple_order(
        major in 0u64..3,
        minor in 0u64..20,
        patch in 0u64..30,
    ) {
        let version = format!("{}.{}.{}", major, minor, patch);
        let expected = (major, minor, patch) >= (0, 1, 11);
        prop_assert_eq!(is_compatible_ollama_version(&version), expected);
        prop_assert_eq!(is_compatible_ollama_version(&format!("v{}", version)), expected);
    }
}

#[test]
fn test_similarity_rejects_bad_input() {
    assert!(matches!(
        calculate_similarity(&[], &[1.0]),
        Err(ClientError::Validation(_))
    ));
    match calculate_similarity(&[1.0, 2.0], &[1.0]) {
        Err(ClientError::Validation(msg)) => assert!(msg.contains("do not match")),
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[test]
fn test_zero_vector_similarity_is_zero() {
    assert_eq!(calculate_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
}

#[test]
fn test_opposite_vectors() {
    let sim = calculate_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
    assert!((sim + 1.0).abs() < 1e-12);
}

#[test]
fn test_top_k_orders_by_similarity() {
    let query = vec![1.0, 0.0];
    let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![-1.0, 0.0], vec![1.0, 0.0]];

    let all = batch_calculate_similarities(&query, &candidates).unwrap();
    assert_eq!(all.len(), 4);

    let top = top_k_similarities(&query, &candidates, 2).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].0, 3);
    assert_eq!(top[1].0, 1);
}

#[test]
fn test_extract_embedding_variants() {
    assert_eq!(
        extract_embedding(&json!({"embedding": [0.5, 1.5]})).unwrap(),
        vec![0.5, 1.5]
    );
    assert_eq!(
        extract_embedding(&json!({"embeddings": [[1.0, 2.0], [3.0, 4.0]]})).unwrap(),
        vec![1.0, 2.0]
    );
    assert!(matches!(
        extract_embedding(&json!({"other": 1})),
        Err(ClientError::Parse(_))
    ));
}
