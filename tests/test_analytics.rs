//! End-to-end tests of the `BudgetAnalytics` pipeline: cache, executor,
//! population resolution and normalization together.

mod common;

use budget_analytics::{
    AccountCategory, AnalyticsError, AnalyticsFilter, BudgetAnalytics, CurrencyRates, Dimension,
    GroupOptions, Normalization, Period, PeriodType,
};
use common::{
    approx_eq, expense_filter, sum_amounts, EXPENSE_2023_GROUPS, EXPENSE_2023_TOTAL,
    NATIONAL_POPULATION,
};

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[test]
fn total_sum_is_conserved_across_pages() {
    let analytics = common::setup_analytics();
    let filter = expense_filter(2023);

    let mut sum = 0.0;
    let mut offset = 0;
    loop {
        let page = analytics
            .get_aggregated_line_items(&filter, Some(2), Some(offset))
            .unwrap();
        assert_eq!(page.total_count, EXPENSE_2023_GROUPS);
        if page.rows.is_empty() {
            break;
        }
        sum += sum_amounts(&page.rows);
        offset += 2;
    }

    let direct = analytics
        .sql(
            "SELECT CAST(SUM(ytd_amount) AS DOUBLE) AS s FROM execution_line_items \
             WHERE is_yearly AND year = $1 AND account_category = $2",
            &[2023i32.into(), "ch".into()],
        )
        .unwrap();
    assert_eq!(direct[0]["s"], serde_json::json!(EXPENSE_2023_TOTAL));
    assert!(approx_eq(sum, EXPENSE_2023_TOTAL));
}

#[test]
fn cold_and_warm_calls_return_identical_results() {
    let analytics = common::setup_analytics();
    let mut filter = expense_filter(2023);
    filter.functional_prefixes = vec!["65.".into()];

    let cold = analytics.get_aggregated_line_items(&filter, Some(5), None).unwrap();
    let warm = analytics.get_aggregated_line_items(&filter, Some(5), None).unwrap();
    assert_eq!(cold, warm);

    let stats = analytics.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn reordered_filter_lists_hit_the_cache() {
    let analytics = common::setup_analytics();
    let mut a = expense_filter(2023);
    a.entity_cuis = vec!["E2".into(), "E1".into()];
    let mut b = expense_filter(2023);
    b.entity_cuis = vec!["E1".into(), "E2".into()];

    let first = analytics.get_aggregated_line_items(&a, None, None).unwrap();
    let second = analytics.get_aggregated_line_items(&b, None, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(analytics.cache().stats().hits, 1);
}

#[test]
fn invalid_period_fails_before_store_and_cache() {
    let analytics = common::setup_analytics();
    let filter = AnalyticsFilter::new(
        AccountCategory::Expense,
        Period::interval(PeriodType::Month, "2023-02", "2023-13"),
    );
    let err = analytics.get_aggregated_line_items(&filter, None, None).unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidPeriod(_)));
    assert!(analytics.cache().is_empty());
}

#[test]
fn store_errors_propagate() {
    let conn = budget_analytics::Connection::open_in_memory().unwrap();
    let analytics = BudgetAnalytics::builder().connection(conn).build().unwrap();
    let err = analytics
        .get_aggregated_line_items(&expense_filter(2023), None, None)
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::DuckDb(_)));
}

// ---------------------------------------------------------------------------
// Per capita
// ---------------------------------------------------------------------------

#[test]
fn per_capita_divides_by_scoped_population() {
    let analytics = common::setup_analytics();
    let mut filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2024));
    filter.entity_cuis = vec!["E7".into()];
    filter.functional_prefixes = vec!["65.".into()];
    filter.normalization = Normalization::PerCapita;

    assert_eq!(analytics.resolve_population_denominator(&filter).unwrap(), 100_000.0);

    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    // 50 000 000 over 100 000 inhabitants.
    assert!(approx_eq(sum_amounts(&result.rows), 500.0));
    assert_eq!(result.total_count, 2);
}

#[test]
fn per_capita_scope_follows_name_search() {
    let analytics = common::setup_analytics();
    let mut filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2024));
    filter.entity_types = vec!["admin_municipality".into()];
    filter.search = Some("Sibiu".into());
    filter.functional_prefixes = vec!["65.".into()];
    filter.normalization = Normalization::PerCapita;

    assert_eq!(analytics.resolve_population_denominator(&filter).unwrap(), 100_000.0);
    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    assert!(approx_eq(sum_amounts(&result.rows), 500.0));
}

#[test]
fn per_capita_without_scope_uses_national_population() {
    let analytics = common::setup_analytics();
    let mut filter = expense_filter(2023);
    filter.normalization = Normalization::PerCapita;
    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    assert!(approx_eq(
        sum_amounts(&result.rows),
        EXPENSE_2023_TOTAL / NATIONAL_POPULATION
    ));
}

#[test]
fn per_capita_with_zero_population_leaves_totals() {
    let analytics = common::setup_analytics();
    let mut filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2021));
    filter.entity_cuis = vec!["E8".into()];
    filter.normalization = Normalization::PerCapita;

    assert_eq!(analytics.resolve_population_denominator(&filter).unwrap(), 0.0);
    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    assert_eq!(result.rows[0].amount, 12_345.0);
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

#[test]
fn single_year_at_rate_one_matches_total() {
    let rates: CurrencyRates = [(2023, 1.0)].into_iter().collect();
    let analytics = common::setup_analytics_with_rates(rates);

    let total = analytics
        .get_aggregated_line_items(&expense_filter(2023), Some(4), Some(1))
        .unwrap();
    let mut filter = expense_filter(2023);
    filter.normalization = Normalization::TotalCurrency;
    let converted = analytics.get_aggregated_line_items(&filter, Some(4), Some(1)).unwrap();

    assert_eq!(total, converted);
}

#[test]
fn currency_conversion_spans_years() {
    let rates: CurrencyRates = [(2022, 2.0), (2023, 4.0)].into_iter().collect();
    let analytics = common::setup_analytics_with_rates(rates);

    let mut filter = AnalyticsFilter::new(
        AccountCategory::Expense,
        Period::interval(PeriodType::Year, "2022", "2023"),
    );
    filter.functional_codes = vec!["65.03.01".into()];
    filter.economic_codes = vec!["10.01.01".into()];
    filter.normalization = Normalization::TotalCurrency;

    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    assert_eq!(result.total_count, 1);
    // 900 000 / 2 + 1 000 000 / 4
    assert_eq!(result.rows[0].amount, 700_000.0);
    assert_eq!(result.rows[0].count, 2);
    assert_eq!(result.rows[0].year, None);
}

#[test]
fn currency_thresholds_and_paging_run_after_conversion() {
    let rates: CurrencyRates = [(2023, 4.0)].into_iter().collect();
    let analytics = common::setup_analytics_with_rates(rates);

    let mut filter = expense_filter(2023);
    filter.normalization = Normalization::TotalCurrency;
    filter.aggregate_min_amount = Some(100_000.0);

    let page = analytics.get_aggregated_line_items(&filter, Some(3), None).unwrap();
    // 500k, 250k, 125k and 100k survive the converted threshold.
    assert_eq!(page.total_count, 4);
    let amounts: Vec<f64> = page.rows.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![500_000.0, 250_000.0, 125_000.0]);
}

#[test]
fn per_capita_currency_combines_both() {
    let rates: CurrencyRates = [(2024, 5.0)].into_iter().collect();
    let analytics = common::setup_analytics_with_rates(rates);

    let mut filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2024));
    filter.entity_cuis = vec!["E7".into()];
    filter.functional_prefixes = vec!["65.".into()];
    filter.normalization = Normalization::PerCapitaCurrency;

    let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
    assert!(approx_eq(sum_amounts(&result.rows), 100.0));
}

// ---------------------------------------------------------------------------
// Exclusions
// ---------------------------------------------------------------------------

#[test]
fn excluded_prefix_is_removed_in_every_mode() {
    let rates: CurrencyRates = [(2023, 4.0)].into_iter().collect();
    let analytics = common::setup_analytics_with_rates(rates);

    for mode in [Normalization::Total, Normalization::TotalCurrency] {
        let mut filter = expense_filter(2023);
        filter.exclude.functional_prefixes = vec!["70.".into()];
        filter.normalization = mode;

        let result = analytics.get_aggregated_line_items(&filter, None, None).unwrap();
        assert_eq!(result.total_count, EXPENSE_2023_GROUPS - 1, "{mode:?}");
        assert!(result.rows.iter().all(|r| !r.functional_code.starts_with("70")));

        let grouped = analytics.group_items(
            &result.rows,
            &filter,
            &GroupOptions::new(Dimension::Functional),
        );
        assert!(grouped.iter().all(|g| g.code != "70"));
    }
}

// ---------------------------------------------------------------------------
// Grouping through the facade
// ---------------------------------------------------------------------------

#[test]
fn drilldown_on_education_returns_subchapters() {
    let analytics = common::setup_analytics();
    let filter = expense_filter(2023);
    let rows = analytics.get_aggregated_line_items(&filter, None, None).unwrap().rows;

    let options = GroupOptions::new(Dimension::Functional).path(&["65"]);
    let items = analytics.group_items(&rows, &filter, &options);
    assert_eq!(
        items.iter().map(|i| i.code.as_str()).collect::<Vec<_>>(),
        vec!["6506", "6503", "6504"]
    );
    assert!(items.iter().all(|i| i.code.len() == 4 && i.code != "65"));
    assert_eq!(items[1].value, 1_100_000.0);
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

#[test]
fn cloned_handles_share_cache_and_run_in_parallel() {
    let analytics = common::setup_analytics();
    let filter = expense_filter(2023);
    let expected = analytics.get_aggregated_line_items(&filter, None, None).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handle = analytics.try_clone().unwrap();
            let filter = filter.clone();
            std::thread::spawn(move || handle.get_aggregated_line_items(&filter, None, None).unwrap())
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), expected);
    }
    assert_eq!(analytics.cache().stats().hits, 4);
}

#[test]
fn builder_loads_rates_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rates.json");
    std::fs::write(&path, r#"{"2023": 5.0}"#).unwrap();

    let analytics = BudgetAnalytics::builder()
        .connection(common::setup_sample_db())
        .currency_rates_file(&path)
        .cache_max_items(10)
        .build()
        .unwrap();
    assert_eq!(analytics.rates().rate(2023), 5.0);
    assert_eq!(analytics.cache().config().max_items, 10);
}

#[test]
fn builder_requires_line_item_snapshot_in_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let err = BudgetAnalytics::builder()
        .data_dir(dir.path())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, AnalyticsError::NotFound(_)));
}

#[test]
fn display_summarises_handle() {
    let analytics = common::setup_analytics();
    let text = analytics.to_string();
    assert!(text.starts_with("BudgetAnalytics(views=["));
    assert!(text.contains("execution_line_items"));
}
