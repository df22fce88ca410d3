// Integration tests for the aggregation service over the in-process store
//
// Tests cover:
// - The two-session walkthrough from submit to removal
// - Count sums matching recorded submissions
// - Removal semantics (fresh restart, unknown sessions, retries)
// - Concurrent submits from disjoint sessions

use adjective_tally::config::AppConfig;
use adjective_tally::models::WordCount;
use adjective_tally::services::{AggregationService, create_services};
use adjective_tally::storage::{MemoryStore, StoreHandles};
use futures_util::future::join_all;
use std::sync::Arc;

fn service() -> AggregationService {
    AggregationService::from_handles(&StoreHandles::from_store(Arc::new(MemoryStore::new())))
}

async fn total_count(service: &AggregationService) -> u64 {
    service.top(usize::MAX).await.iter().map(|w| w.count).sum()
}

#[tokio::test]
async fn test_two_session_walkthrough() {
    let service = service();

    service.submit("A", "kind").await.unwrap();
    service.submit("A", "funny").await.unwrap();
    assert_eq!(service.session_count("A").await, 2);

    let top = service.top(10).await;
    assert!(top.contains(&WordCount::new("kind", 1)));
    assert!(top.contains(&WordCount::new("funny", 1)));

    service.submit("B", "kind").await.unwrap();
    assert_eq!(
        service.top(10).await,
        vec![WordCount::new("kind", 2), WordCount::new("funny", 1)]
    );

    service.remove_session("A").await.unwrap();
    assert_eq!(service.top(10).await, vec![WordCount::new("kind", 1)]);
    assert_eq!(service.leaderboard().count_of("funny").await.unwrap(), 0);
}

#[tokio::test]
async fn test_counts_sum_to_recorded_submissions() {
    let service = service();
    let submissions = [
        ("a", "kind"),
        ("a", "kind"),
        ("a", "brave"),
        ("b", "funny"),
        ("c", "kind"),
        ("c", "witty"),
        ("d", "calm"),
    ];
    for (session, word) in submissions {
        service.submit(session, word).await.unwrap();
    }

    let recorded: u64 = service
        .submissions()
        .list_all()
        .await
        .unwrap()
        .iter()
        .map(|s| s.count() as u64)
        .sum();
    assert_eq!(recorded, submissions.len() as u64);
    assert_eq!(total_count(&service).await, recorded);
}

#[tokio::test]
async fn test_duplicates_within_a_session_are_withdrawn_together() {
    let service = service();
    service.submit("a", "kind").await.unwrap();
    service.submit("a", "kind").await.unwrap();
    service.submit("b", "kind").await.unwrap();

    let report = service.remove_session("a").await.unwrap();
    assert_eq!(report.words_removed, 2);
    assert!(report.pruned.is_empty());
    assert_eq!(service.top(10).await, vec![WordCount::new("kind", 1)]);
}

#[tokio::test]
async fn test_remove_then_resubmit_is_a_fresh_session() {
    let service = service();
    service.submit("s", "kind").await.unwrap();
    service.submit("s", "funny").await.unwrap();
    service.remove_session("s").await.unwrap();

    assert_eq!(service.submit("s", "kind").await.unwrap(), 1);
    assert_eq!(service.submissions().words_of("s").await.unwrap(), vec!["kind"]);
    assert_eq!(service.top(10).await, vec![WordCount::new("kind", 1)]);
}

#[tokio::test]
async fn test_remove_is_safe_to_retry() {
    let service = service();
    service.submit("a", "kind").await.unwrap();
    service.submit("b", "kind").await.unwrap();

    service.remove_session("a").await.unwrap();
    let retry = service.remove_session("a").await.unwrap();

    assert!(retry.is_noop());
    assert_eq!(service.top(10).await, vec![WordCount::new("kind", 1)]);
}

#[tokio::test]
async fn test_remove_unknown_session_changes_nothing() {
    let service = service();
    service.submit("a", "kind").await.unwrap();
    let before = service.top(10).await;

    let report = service.remove_session("ghost").await.unwrap();
    assert!(report.is_noop());
    assert_eq!(service.top(10).await, before);
}

#[tokio::test]
async fn test_word_named_sorted_does_not_clash_with_index() {
    let service = service();
    service.submit("a", "sorted").await.unwrap();
    service.submit("b", "kind").await.unwrap();

    assert_eq!(
        service.top(10).await,
        vec![WordCount::new("kind", 1), WordCount::new("sorted", 1)]
    );
    service.remove_session("a").await.unwrap();
    assert_eq!(service.top(10).await, vec![WordCount::new("kind", 1)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disjoint_sessions_lose_no_updates() {
    const N: usize = 64;
    let service = service();

    let mut tasks = Vec::with_capacity(N);
    for i in 0..N {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .submit(&format!("session-{i}"), &format!("word{i:02}"))
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    let top = service.top(N).await;
    assert_eq!(top.len(), N);
    assert!(top.iter().all(|w| w.count == 1));
    assert_eq!(top[0].word, "word00");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_to_one_session_all_recorded() {
    const N: usize = 32;
    let service = service();

    let results = join_all((0..N).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.submit("shared", "kind").await })
    }))
    .await;

    let mut lengths: Vec<u64> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    lengths.sort_unstable();
    assert_eq!(lengths, (1..=N as u64).collect::<Vec<_>>());

    assert_eq!(service.session_count("shared").await, N as u64);
    assert_eq!(service.top(1).await, vec![WordCount::new("kind", N as u64)]);
}

#[tokio::test]
async fn test_policy_caps_submissions_per_session() {
    let handles = StoreHandles::from_store(Arc::new(MemoryStore::new()));
    let services = create_services(&handles, &AppConfig::testing(), None);
    let policy = services.policy;

    for word in ["kind", "funny", "brave", "calm", "bold"] {
        policy.submit(&services.aggregation, "a", word).await.unwrap();
    }
    assert!(policy.submit(&services.aggregation, "a", "witty").await.is_err());
    assert!(policy.submit(&services.aggregation, "b", "witty").await.is_ok());
    assert_eq!(total_count(&services.aggregation).await, 6);
}
