//! Async wrapper tests. Only built with `--features async`.

#![cfg(feature = "async")]

mod common;

use budget_analytics::{
    AnalyticsError, AsyncBudgetAnalytics, Dimension, GroupOptions, Normalization,
};
use common::{approx_eq, expense_filter, sum_amounts, EXPENSE_2023_TOTAL};
use std::time::Duration;

fn analytics() -> AsyncBudgetAnalytics {
    AsyncBudgetAnalytics::new(common::setup_analytics())
}

#[tokio::test(flavor = "multi_thread")]
async fn aggregates_on_blocking_pool() {
    let a = analytics();
    let result = a
        .get_aggregated_line_items(expense_filter(2023), None, None)
        .await
        .unwrap();
    assert_eq!(result.total_count, 7);
    assert!(approx_eq(sum_amounts(&result.rows), EXPENSE_2023_TOTAL));

    let grouped = a
        .group_items(result.rows, expense_filter(2023), GroupOptions::new(Dimension::Functional))
        .await
        .unwrap();
    assert_eq!(grouped[0].code, "65");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_calls_share_cache() {
    let a = analytics();
    let mut filter = expense_filter(2024);
    filter.entity_cuis = vec!["E7".into()];
    filter.normalization = Normalization::PerCapita;

    let (x, y) = tokio::join!(
        a.get_aggregated_line_items(filter.clone(), None, None),
        a.resolve_population_denominator(filter.clone()),
    );
    assert_eq!(y.unwrap(), 100_000.0);
    let first = x.unwrap();

    let again = a.get_aggregated_line_items(filter, None, None).await.unwrap();
    assert_eq!(first, again);
}

#[tokio::test(flavor = "multi_thread")]
async fn generous_timeout_does_not_fire() {
    let a = analytics().with_timeout(Some(Duration::from_secs(30)));
    let population = a
        .resolve_population_denominator(expense_filter(2023))
        .await
        .unwrap();
    assert_eq!(population, common::NATIONAL_POPULATION);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_call_fails_with_timeout() {
    let a = analytics().with_timeout(Some(Duration::from_millis(20)));
    let err = a
        .run(|_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::Timeout(d) if d == Duration::from_millis(20)));

    // The engine stays usable once the slow call has finished.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let a = a.with_timeout(None);
    let population = a
        .resolve_population_denominator(expense_filter(2023))
        .await
        .unwrap();
    assert_eq!(population, common::NATIONAL_POPULATION);
}

#[tokio::test(flavor = "multi_thread")]
async fn builder_opens_connection_off_thread() {
    let dir = tempfile::tempdir().unwrap();
    let err = AsyncBudgetAnalytics::builder()
        .data_dir(dir.path())
        .build()
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AnalyticsError::NotFound(_)));
}
