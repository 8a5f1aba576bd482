use std::collections::HashMap;
use std::path::PathBuf;

pub const LINE_ITEMS_TABLE: &str = "execution_line_items";
pub const FUNCTIONAL_TABLE: &str = "functional_classifications";
pub const ECONOMIC_TABLE: &str = "economic_classifications";
pub const ENTITIES_TABLE: &str = "entities";
pub const UATS_TABLE: &str = "uats";

/// Code substituted for line items that carry no economic classification.
pub const UNKNOWN_ECONOMIC_CODE: &str = "00.00.00";
pub const UNKNOWN_ECONOMIC_NAME: &str = "Unknown economic classification";

/// Entity type of county councils; their population is the whole county's.
pub const COUNTY_COUNCIL_ENTITY_TYPE: &str = "admin_county_council";

/// The capital's county code and the SIRUTA code of its aggregate unit. Every
/// other county's aggregate unit carries the county code as its SIRUTA code.
pub const CAPITAL_COUNTY_CODE: &str = "B";
pub const CAPITAL_SIRUTA_CODE: &str = "179132";

pub const DEFAULT_CACHE_MAX_ITEMS: usize = 1_000;
pub const DEFAULT_CACHE_MAX_BYTES: usize = 64 * 1024 * 1024;

pub const RATES_FILE: &str = "exchange_rates.json";

pub fn dataset_files() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        (LINE_ITEMS_TABLE, "execution_line_items.parquet"),
        (FUNCTIONAL_TABLE, "functional_classifications.parquet"),
        (ECONOMIC_TABLE, "economic_classifications.parquet"),
        (ENTITIES_TABLE, "entities.parquet"),
        (UATS_TABLE, "uats.parquet"),
    ])
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("budget-analytics")
    } else {
        PathBuf::from(".budget-analytics-data")
    }
}
