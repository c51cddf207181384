//! Offline unit tests for qcprice-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::{TimeZone, Utc};
use qcprice_core::{AppConfig, Environment, PlatformId, PriceHistoryPoint};
use qcprice_db::{DbError, PoolConfig, PriceHistoryRow, ProductRow};
use rust_decimal::Decimal;

fn product_row(platform: &str) -> ProductRow {
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();
    ProductRow {
        id: 3,
        name: "Amul Butter 500g".to_string(),
        source_url: "https://blinkit.com/prn/amul-butter/prid/1".to_string(),
        platform: platform.to_string(),
        current_price: Decimal::new(27_500, 2),
        image_ref: None,
        category: "dairy".to_string(),
        is_available: true,
        last_updated_at: ts,
        created_at: ts,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        fetch_timeout_secs: 12,
        user_agent: "ua".to_string(),
        browser_enabled: true,
        browser_nav_timeout_secs: 30,
        browser_nav_attempts: 3,
        browser_retry_delay_ms: 1000,
        browser_wait_ms: 5000,
        search_max_results: 5,
        update_cron: "0 0 */6 * * *".to_string(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_converts_to_tracked_product() {
    let history = vec![PriceHistoryPoint {
        price: Decimal::new(27_500, 2),
        observed_at: Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap(),
    }];

    let product = product_row("blinkit")
        .into_tracked(history.clone())
        .expect("row should convert");

    assert_eq!(product.id, 3);
    assert_eq!(product.platform, PlatformId::Blinkit);
    assert_eq!(product.current_price, Decimal::new(27_500, 2));
    assert_eq!(product.price_history, history);
}

#[test]
fn product_row_with_unknown_platform_is_rejected() {
    let result = product_row("flipkart").into_tracked(Vec::new());
    assert!(
        matches!(result, Err(DbError::InvalidRow { table: "tracked_products", .. })),
        "expected InvalidRow, got: {result:?}"
    );
}

#[test]
fn history_row_converts_to_point() {
    let observed_at = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
    let row = PriceHistoryRow {
        id: 10,
        product_id: 3,
        price: Decimal::from(52),
        observed_at,
    };
    let point = PriceHistoryPoint::from(row);
    assert_eq!(point.price, Decimal::from(52));
    assert_eq!(point.observed_at, observed_at);
}
