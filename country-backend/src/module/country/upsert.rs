//! Join fetched countries with exchange rates and derive estimated GDP

use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Mutex;

use super::store::CountryDraft;
use crate::config::GdpConfig;
use crate::module::sources::{ExchangeRates, RemoteCountry};

/// Source of the per-country GDP multiplier
pub enum GdpMultiplier {
    /// Uniform draw from `[min, max)`
    Random {
        rng: Mutex<StdRng>,
        min: f64,
        max: f64,
    },
    Fixed(f64),
}

impl GdpMultiplier {
    pub fn from_config(config: &GdpConfig) -> Self {
        if let Some(value) = config.fixed {
            return Self::Fixed(value);
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::Random {
            rng: Mutex::new(rng),
            min: config.min,
            max: config.max,
        }
    }

    pub fn seeded(seed: u64, min: f64, max: f64) -> Self {
        Self::Random {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            min,
            max,
        }
    }

    pub fn sample(&self) -> f64 {
        match self {
            Self::Fixed(value) => *value,
            Self::Random { rng, min, max } => {
                let mut rng = rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.random_range(*min..*max)
            }
        }
    }
}

/// `population * multiplier / rate`, rounded to cents.
///
/// Returns `None` unless the result is strictly positive.
pub fn estimate_gdp(population: u64, multiplier: f64, rate: Decimal) -> Option<Decimal> {
    let multiplier = Decimal::from_f64(multiplier)?;
    let mut gdp = Decimal::from(population)
        .checked_mul(multiplier)?
        .checked_div(rate)?
        .round_dp(2);
    gdp.rescale(2);
    (gdp > Decimal::ZERO).then_some(gdp)
}

/// Build the stored form of one fetched country.
///
/// Returns `None` for entries whose name is blank.
pub fn build_draft(
    remote: &RemoteCountry,
    rates: &ExchangeRates,
    multiplier: &GdpMultiplier,
) -> Option<CountryDraft> {
    let name = remote.name.trim();
    if name.is_empty() {
        return None;
    }

    let currency_code = remote.primary_currency_code();
    let exchange_rate = currency_code
        .as_ref()
        .and_then(|code| rates.get(code))
        .copied();
    let estimated_gdp =
        exchange_rate.and_then(|rate| estimate_gdp(remote.population, multiplier.sample(), rate));

    Some(CountryDraft {
        name: name.to_string(),
        capital: remote.capital.clone(),
        region: remote.region.clone(),
        population: remote.population,
        currency_code,
        exchange_rate: exchange_rate.map(|r| r.round_dp(6)),
        estimated_gdp,
        flag_url: remote.flag_url.clone(),
    })
}

/// Summary of one refresh batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub with_gdp: usize,
    pub duration_seconds: f64,
}

/// Turn a fetched batch into drafts, counting the entries that were skipped
pub fn prepare_batch(
    countries: &[RemoteCountry],
    rates: &ExchangeRates,
    multiplier: &GdpMultiplier,
) -> (Vec<CountryDraft>, UpsertReport) {
    let mut report = UpsertReport {
        fetched: countries.len(),
        ..Default::default()
    };

    let mut drafts = Vec::with_capacity(countries.len());
    for (index, remote) in countries.iter().enumerate() {
        match build_draft(remote, rates, multiplier) {
            Some(draft) => {
                if draft.estimated_gdp.is_some() {
                    report.with_gdp += 1;
                }
                drafts.push(draft);
            }
            None => {
                tracing::debug!("Skipping country entry #{} with blank name", index);
                report.skipped += 1;
            }
        }
    }

    (drafts, report)
}
