//! Yearly currency conversion rates.
//!
//! Rates are read once and shared read-only between requests. A rates file is
//! a JSON object mapping years to the number of native currency units per unit
//! of the target currency, e.g. `{"2022": 4.9315, "2023": 4.9465}`. Files
//! ending in `.gz` are decompressed transparently.

use crate::error::{AnalyticsError, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Sparse year → rate table. Years without a usable rate convert at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyRates {
    rates: BTreeMap<i32, f64>,
}

impl CurrencyRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, rate: f64) -> &mut Self {
        self.rates.insert(year, rate);
        self
    }

    /// Rate for `year`, or 1 when the year is missing or its rate is not a
    /// positive finite number.
    pub fn rate(&self, year: i32) -> f64 {
        match self.rates.get(&year) {
            Some(&r) if r.is_finite() && r > 0.0 => r,
            Some(&r) => {
                warn!(year, rate = r, "unusable currency rate, converting at 1");
                1.0
            }
            None => 1.0,
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Load a rates file (handles `.gz` transparently).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalyticsError::NotFound(format!(
                "rates file {} not found",
                path.display()
            )));
        }

        let contents = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            let file = fs::File::open(path)?;
            let mut reader = BufReader::new(GzDecoder::new(BufReader::new(file)));
            let mut contents = String::new();
            reader.read_to_string(&mut contents)?;
            contents
        } else {
            fs::read_to_string(path)?
        };

        let rates: CurrencyRates = serde_json::from_str(&contents)?;
        info!(path = %path.display(), years = rates.len(), "loaded currency rates");
        Ok(rates)
    }
}

impl FromIterator<(i32, f64)> for CurrencyRates {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}
