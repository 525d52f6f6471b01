//! Phase 2 tests: Similarity index, decay ranker, retrieval service.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use incident_recall::config::RecallConfig;
use incident_recall::engine::decay::{age_hours, decay_score, DecayBand, DecayPolicy, DecayRanker};
use incident_recall::engine::retrieval::{NewIncident, RetrievalService};
use incident_recall::index::SimilarityIndex;
use incident_recall::types::{
    CrisisType, IncidentId, IncidentRecord, IncidentRecordBuilder, Origin, QueryFilter,
    QueryRequest, RecallError, ScoredResult, DEFAULT_DIMENSION,
};
use incident_recall::vector::normalize;

// ==================== Helper ====================

const DIM: usize = 8;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn basis_vec(dim: usize, index: usize, value: f32) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[index] = value;
    v
}

fn record(id: &str, vector: Vec<f32>, created_at: DateTime<Utc>) -> IncidentRecord {
    IncidentRecordBuilder::new(id, CrisisType::Flood, vector)
        .created_at(created_at)
        .build()
}

fn small_service() -> RetrievalService {
    RetrievalService::new(RecallConfig {
        dimension: DIM,
        ..RecallConfig::default()
    })
    .unwrap()
}

fn ids(results: &[ScoredResult]) -> Vec<&str> {
    results.iter().map(|r| r.id().as_str()).collect()
}

// ==================== Similarity Index ====================

#[test]
fn test_empty_index_returns_empty() {
    let index = SimilarityIndex::new(DIM);
    let results = index
        .query(&basis_vec(DIM, 0, 1.0), 5, -1.0, &QueryFilter::default())
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_insert_and_query_top_k() {
    let index = SimilarityIndex::new(DIM);
    let now = fixed_now();
    index
        .insert(record("a", basis_vec(DIM, 0, 1.0), now))
        .unwrap();
    index
        .insert(record("b", vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], now))
        .unwrap();
    index
        .insert(record("c", basis_vec(DIM, 1, 1.0), now))
        .unwrap();

    let results = index
        .query(&basis_vec(DIM, 0, 1.0), 2, 0.0, &QueryFilter::default())
        .unwrap();
    assert_eq!(ids(&results), vec!["a", "b"]);
    assert!((results[0].raw_score - 1.0).abs() < 1e-6);
    assert!((results[1].raw_score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
}

#[test]
fn test_min_score_filters() {
    let index = SimilarityIndex::new(DIM);
    let now = fixed_now();
    index
        .insert(record("a", basis_vec(DIM, 0, 1.0), now))
        .unwrap();
    index
        .insert(record("c", basis_vec(DIM, 1, 1.0), now))
        .unwrap();

    let results = index
        .query(&basis_vec(DIM, 0, 1.0), 10, 0.5, &QueryFilter::default())
        .unwrap();
    assert_eq!(ids(&results), vec!["a"]);
}

#[test]
fn test_k_zero_returns_empty() {
    let index = SimilarityIndex::new(DIM);
    index
        .insert(record("a", basis_vec(DIM, 0, 1.0), fixed_now()))
        .unwrap();
    let results = index
        .query(&basis_vec(DIM, 0, 1.0), 0, -1.0, &QueryFilter::default())
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_tie_break_by_created_at_descending() {
    let index = SimilarityIndex::new(DIM);
    let now = fixed_now();
    // Insert oldest first, then newest, then middle: order must not follow insertion.
    index
        .insert(record("old", basis_vec(DIM, 0, 1.0), now - Duration::hours(50)))
        .unwrap();
    index
        .insert(record("new", basis_vec(DIM, 0, 2.0), now - Duration::hours(1)))
        .unwrap();
    index
        .insert(record("mid", basis_vec(DIM, 0, 3.0), now - Duration::hours(10)))
        .unwrap();

    let query = basis_vec(DIM, 0, 1.0);
    let first = index
        .query(&query, 3, 0.0, &QueryFilter::default())
        .unwrap();
    assert_eq!(ids(&first), vec!["new", "mid", "old"]);

    let second = index
        .query(&query, 3, 0.0, &QueryFilter::default())
        .unwrap();
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn test_duplicate_id_rejected_and_count_unchanged() {
    let index = SimilarityIndex::new(DIM);
    let now = fixed_now();
    index
        .insert(record("flood_001", basis_vec(DIM, 0, 1.0), now))
        .unwrap();
    let err = index
        .insert(record("flood_001", basis_vec(DIM, 1, 1.0), now))
        .unwrap_err();
    assert!(matches!(err, RecallError::DuplicateId(ref id) if id.as_str() == "flood_001"));
    assert_eq!(index.len(), 1);
    // The original record is untouched.
    let stored = index.get(&IncidentId::from("flood_001")).unwrap();
    assert_eq!(stored.vector, basis_vec(DIM, 0, 1.0));
}

#[test]
fn test_insert_wrong_dimension_rejected() {
    let index = SimilarityIndex::new(DIM);
    let err = index
        .insert(record("a", vec![1.0; DIM + 1], fixed_now()))
        .unwrap_err();
    assert!(matches!(err, RecallError::DimensionMismatch { .. }));
    assert!(index.is_empty());
}

#[test]
fn test_query_wrong_dimension_rejected() {
    let index = SimilarityIndex::new(DIM);
    index
        .insert(record("a", basis_vec(DIM, 0, 1.0), fixed_now()))
        .unwrap();
    let err = index
        .query(&[1.0, 0.0], 3, 0.0, &QueryFilter::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RecallError::DimensionMismatch {
            expected: DIM,
            got: 2,
            ..
        }
    ));
}

#[test]
fn test_results_share_stored_record() {
    let index = SimilarityIndex::new(DIM);
    let stored = index
        .insert(record("a", basis_vec(DIM, 0, 1.0), fixed_now()))
        .unwrap();
    let results = index
        .query(&basis_vec(DIM, 0, 1.0), 1, 0.0, &QueryFilter::default())
        .unwrap();
    assert!(Arc::ptr_eq(&stored, &results[0].record));
    assert!(Arc::ptr_eq(
        &stored,
        &index.get(&IncidentId::from("a")).unwrap()
    ));
}

#[test]
fn test_filter_by_crisis_type_and_origin() {
    let index = SimilarityIndex::new(DIM);
    let now = fixed_now();
    index
        .insert(
            IncidentRecordBuilder::new("flood", CrisisType::Flood, basis_vec(DIM, 0, 1.0))
                .created_at(now)
                .build(),
        )
        .unwrap();
    index
        .insert(
            IncidentRecordBuilder::new("fire", CrisisType::Fire, basis_vec(DIM, 0, 1.0))
                .created_at(now)
                .origin(Origin::Submitted)
                .build(),
        )
        .unwrap();

    let query = basis_vec(DIM, 0, 1.0);
    let fire_only = QueryFilter {
        crisis_types: vec![CrisisType::Fire],
        origin: None,
    };
    assert_eq!(
        ids(&index.query(&query, 5, 0.0, &fire_only).unwrap()),
        vec!["fire"]
    );

    let seeds_only = QueryFilter {
        crisis_types: vec![],
        origin: Some(Origin::Seed),
    };
    assert_eq!(
        ids(&index.query(&query, 5, 0.0, &seeds_only).unwrap()),
        vec!["flood"]
    );
}

// ==================== Decay Ranker ====================

#[test]
fn test_age_hours_clamps_future() {
    let now = fixed_now();
    let future = record("f", basis_vec(DIM, 0, 1.0), now + Duration::hours(5));
    assert_eq!(age_hours(&future, now), 0.0);
    let past = record("p", basis_vec(DIM, 0, 1.0), now - Duration::minutes(90));
    assert!((age_hours(&past, now) - 1.5).abs() < 1e-9);
}

#[test]
fn test_default_policy_bands() {
    let policy = DecayPolicy::default();
    assert_eq!(policy.multiplier(0.0), 1.0);
    assert_eq!(policy.multiplier(23.99), 1.0);
    assert_eq!(policy.multiplier(24.0), 0.7);
    assert_eq!(policy.multiplier(71.9), 0.7);
    assert_eq!(policy.multiplier(72.0), 0.3);
    assert_eq!(policy.multiplier(10_000.0), 0.3);
    assert_eq!(policy.multiplier(-3.0), 1.0);
}

#[test]
fn test_policy_is_monotonic() {
    let policy = DecayPolicy::default();
    let mut last = f32::INFINITY;
    for hour in 0..200 {
        let m = policy.multiplier(hour as f64);
        assert!(m <= last);
        assert!(m > 0.0 && m <= 1.0);
        last = m;
    }
}

#[test]
fn test_policy_validation() {
    let band = |h: f64, m: f32| DecayBand {
        min_age_hours: h,
        multiplier: m,
    };
    assert!(DecayPolicy::new(vec![]).is_err());
    assert!(DecayPolicy::new(vec![band(1.0, 1.0)]).is_err());
    assert!(DecayPolicy::new(vec![band(0.0, 0.0)]).is_err());
    assert!(DecayPolicy::new(vec![band(0.0, 1.2)]).is_err());
    assert!(DecayPolicy::new(vec![band(0.0, 0.5), band(10.0, 0.9)]).is_err());
    assert!(DecayPolicy::new(vec![band(0.0, 1.0), band(10.0, 0.9), band(10.0, 0.5)]).is_err());
    let custom = DecayPolicy::new(vec![band(0.0, 1.0), band(6.0, 0.5)]).unwrap();
    assert_eq!(custom.multiplier(7.0), 0.5);
}

#[test]
fn test_rerank_recent_moderate_beats_stale_strong() {
    let now = fixed_now();
    let stale = Arc::new(record("stale", basis_vec(DIM, 0, 1.0), now - Duration::hours(100)));
    let fresh = Arc::new(record("fresh", basis_vec(DIM, 0, 1.0), now - Duration::hours(2)));
    let results = vec![
        ScoredResult::new(stale, 0.95),
        ScoredResult::new(fresh, 0.6),
    ];
    let ranked = DecayRanker::default().rerank(results, now);
    assert_eq!(ids(&ranked), vec!["fresh", "stale"]);
    assert!((ranked[1].decayed_score - 0.95 * 0.3).abs() < 1e-6);
    assert_eq!(ranked[1].decay_multiplier, 0.3);
}

#[test]
fn test_rerank_older_never_above_newer_at_equal_raw() {
    let now = fixed_now();
    for (older_h, newer_h) in [(30, 2), (80, 30), (100, 80), (5, 1)] {
        let older = Arc::new(record("older", basis_vec(DIM, 0, 1.0), now - Duration::hours(older_h)));
        let newer = Arc::new(record("newer", basis_vec(DIM, 0, 1.0), now - Duration::hours(newer_h)));
        let ranked = DecayRanker::default().rerank(
            vec![ScoredResult::new(older, 0.8), ScoredResult::new(newer, 0.8)],
            now,
        );
        assert_eq!(ids(&ranked), vec!["newer", "older"]);
    }
}

#[test]
fn test_rerank_negative_scores_keep_newer_first() {
    let now = fixed_now();
    for (older_h, newer_h) in [(100, 1), (30, 2), (80, 30), (100, 80), (5, 1)] {
        let older = Arc::new(record("older", basis_vec(DIM, 0, 1.0), now - Duration::hours(older_h)));
        let newer = Arc::new(record("newer", basis_vec(DIM, 0, 1.0), now - Duration::hours(newer_h)));
        let ranked = DecayRanker::default().rerank(
            vec![
                ScoredResult::new(Arc::clone(&newer), -0.5),
                ScoredResult::new(Arc::clone(&older), -0.5),
            ],
            now,
        );
        assert_eq!(ids(&ranked), vec!["newer", "older"]);
        assert!(ranked[0].decayed_score >= ranked[1].decayed_score);

        let ranked = DecayRanker::default().rerank(
            vec![ScoredResult::new(older, -0.5), ScoredResult::new(newer, -0.5)],
            now,
        );
        assert_eq!(ids(&ranked), vec!["newer", "older"]);
    }
}

#[test]
fn test_decay_score_sign_handling() {
    assert!((decay_score(0.5, 0.3) - 0.15).abs() < 1e-6);
    assert!((decay_score(-0.5, 0.3) + 0.85).abs() < 1e-6);
    assert_eq!(decay_score(-0.5, 1.0), -0.5);
    assert_eq!(decay_score(0.0, 0.3), 0.0);
    // Decay never raises a score.
    for raw in [-1.0f32, -0.4, 0.0, 0.4, 1.0] {
        assert!(decay_score(raw, 0.7) <= raw);
        assert!(decay_score(raw, 0.3) <= decay_score(raw, 0.7));
    }
}

#[test]
fn test_find_similar_negative_scores_newest_first() {
    let service = small_service();
    let now = fixed_now();
    service
        .index()
        .insert(record("old", basis_vec(DIM, 0, -1.0), now - Duration::hours(100)))
        .unwrap();
    service
        .index()
        .insert(record("new", basis_vec(DIM, 0, -1.0), now - Duration::hours(1)))
        .unwrap();

    let request = QueryRequest::image(basis_vec(DIM, 0, 1.0)).with_min_score(-1.0);
    let results = service.find_similar_at(&request, now).unwrap();
    assert_eq!(ids(&results), vec!["new", "old"]);
    assert!((results[0].raw_score + 1.0).abs() < 1e-6);
    assert!(results[1].decayed_score < results[0].decayed_score);
}

#[test]
fn test_rerank_tie_break_raw_then_stable() {
    let now = fixed_now();
    let ts = now - Duration::hours(1);
    // Equal decayed score, different raw: higher raw first.
    let a = Arc::new(record("a", basis_vec(DIM, 0, 1.0), now - Duration::hours(30)));
    let b = Arc::new(record("b", basis_vec(DIM, 0, 1.0), ts));
    let ranked = DecayRanker::new(
        DecayPolicy::new(vec![
            DecayBand {
                min_age_hours: 0.0,
                multiplier: 1.0,
            },
            DecayBand {
                min_age_hours: 24.0,
                multiplier: 0.5,
            },
        ])
        .unwrap(),
    )
    .rerank(
        vec![ScoredResult::new(b, 0.4), ScoredResult::new(a, 0.8)],
        now,
    );
    assert_eq!(ids(&ranked), vec!["a", "b"]);

    // Full tie: original order preserved.
    let x = Arc::new(record("x", basis_vec(DIM, 0, 1.0), ts));
    let y = Arc::new(record("y", basis_vec(DIM, 0, 1.0), ts));
    let ranked = DecayRanker::default().rerank(
        vec![ScoredResult::new(y, 0.5), ScoredResult::new(x, 0.5)],
        now,
    );
    assert_eq!(ids(&ranked), vec!["y", "x"]);
}

// ==================== Retrieval Service ====================

#[test]
fn test_find_similar_requires_a_modality() {
    let service = small_service();
    let err = service.find_similar(&QueryRequest::default()).unwrap_err();
    assert!(matches!(err, RecallError::InsufficientInput));
}

#[test]
fn test_find_similar_on_empty_index() {
    let service = small_service();
    let results = service
        .find_similar(&QueryRequest::image(basis_vec(DIM, 0, 1.0)))
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_record_then_find_returns_record_first() {
    let service = small_service();
    let now = fixed_now();
    let image = vec![0.3, -0.2, 0.9, 0.0, 0.1, 0.4, -0.5, 0.2];
    let text = vec![0.1, 0.1, 0.1, 0.8, -0.3, 0.0, 0.2, 0.6];

    service
        .record_incident_at(
            Some(basis_vec(DIM, 7, 1.0).as_slice()),
            None,
            NewIncident::new(CrisisType::Fire),
            now,
        )
        .unwrap();
    let id = service
        .record_incident_at(
            Some(image.as_slice()),
            Some(text.as_slice()),
            NewIncident::new(CrisisType::Landslide).attribute("location", "Wayanad"),
            now,
        )
        .unwrap();

    let results = service
        .find_similar_at(&QueryRequest::multimodal(image, text), now)
        .unwrap();
    assert_eq!(results[0].id(), &id);
    assert!((results[0].raw_score - 1.0).abs() < 1e-5);
    assert_eq!(results[0].record.origin, Origin::Submitted);
    assert_eq!(results[0].record.created_at, now);
    assert_eq!(results[0].record.metadata["location"], "Wayanad");
}

#[test]
fn test_recorded_ids_are_fresh() {
    let service = small_service();
    let v = basis_vec(DIM, 0, 1.0);
    let a = service
        .record_incident(Some(v.as_slice()), None, NewIncident::new(CrisisType::Flood))
        .unwrap();
    let b = service
        .record_incident(Some(v.as_slice()), None, NewIncident::new(CrisisType::Flood))
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(service.index().len(), 2);
}

#[test]
fn test_record_incident_requires_a_modality() {
    let service = small_service();
    let err = service
        .record_incident(None, None, NewIncident::new(CrisisType::Flood))
        .unwrap_err();
    assert!(matches!(err, RecallError::InsufficientInput));
    assert!(service.index().is_empty());
}

#[test]
fn test_find_similar_dimension_mismatch() {
    let service = small_service();
    let err = service
        .find_similar(&QueryRequest::text(vec![1.0; DIM * 2]))
        .unwrap_err();
    assert!(matches!(err, RecallError::DimensionMismatch { .. }));
}

#[test]
fn test_request_weights_override_defaults() {
    let service = small_service();
    let now = fixed_now();
    let image = basis_vec(DIM, 0, 1.0);
    let text = basis_vec(DIM, 1, 1.0);
    service
        .record_incident_at(Some(image.as_slice()), None, NewIncident::new(CrisisType::Flood), now)
        .unwrap();
    service
        .record_incident_at(None, Some(text.as_slice()), NewIncident::new(CrisisType::Fire), now)
        .unwrap();

    let text_heavy = QueryRequest::multimodal(image.clone(), text.clone())
        .with_weights(incident_recall::ModalityWeights::new(0.1, 0.9).unwrap());
    let results = service.find_similar_at(&text_heavy, now).unwrap();
    assert_eq!(results[0].record.crisis_type, CrisisType::Fire);

    let image_heavy = QueryRequest::multimodal(image, text)
        .with_weights(incident_recall::ModalityWeights::new(0.9, 0.1).unwrap());
    let results = service.find_similar_at(&image_heavy, now).unwrap();
    assert_eq!(results[0].record.crisis_type, CrisisType::Flood);
}

// ==================== Reference Scenarios ====================

fn scenario_service() -> RetrievalService {
    let service = RetrievalService::new(RecallConfig::default()).unwrap();
    let now = fixed_now();
    let seed = IncidentRecordBuilder::new(
        "flood_001",
        CrisisType::Flood,
        normalize(&basis_vec(DEFAULT_DIMENSION, 0, 1.0)).unwrap(),
    )
    .created_at(now - Duration::hours(10))
    .build();
    service.index().insert(seed).unwrap();
    service
}

#[test]
fn test_scenario_matching_flood() {
    let service = scenario_service();
    let request = QueryRequest::image(basis_vec(DEFAULT_DIMENSION, 0, 1.0))
        .with_k(3)
        .with_min_score(0.0);
    let results = service.find_similar_at(&request, fixed_now()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id().as_str(), "flood_001");
    assert!((results[0].raw_score - 1.0).abs() < 1e-6);
    assert!((results[0].decayed_score - 1.0).abs() < 1e-6);
    assert!((results[0].age_hours - 10.0).abs() < 1e-9);
}

#[test]
fn test_scenario_orthogonal_query() {
    let service = scenario_service();
    let orthogonal = basis_vec(DEFAULT_DIMENSION, 1, 1.0);

    let results = service
        .find_similar_at(
            &QueryRequest::image(orthogonal.clone()).with_min_score(0.0),
            fixed_now(),
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].raw_score.abs() < 1e-6);

    let results = service
        .find_similar_at(
            &QueryRequest::image(orthogonal).with_min_score(0.5),
            fixed_now(),
        )
        .unwrap();
    assert!(results.is_empty());
}
