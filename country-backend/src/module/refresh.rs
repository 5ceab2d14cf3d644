//! Refresh pipeline
//!
//! Fetches countries and rates, upserts the joined records, then redraws
//! the summary image. Image failures are logged and never fail a refresh.

use chrono::Utc;
use country_common::RefreshResponse;
use std::sync::Arc;

use super::country::upsert::{prepare_batch, UpsertReport};
use super::country::{CountryStore, GdpMultiplier};
use super::renderer::{SummaryData, SummaryRenderer};
use super::sources::DataSource;
use crate::error::ServiceResult;

pub struct CountryRefresher {
    source: Arc<dyn DataSource>,
    store: Arc<CountryStore>,
    renderer: SummaryRenderer,
    multiplier: GdpMultiplier,
}

impl CountryRefresher {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: Arc<CountryStore>,
        renderer: SummaryRenderer,
        multiplier: GdpMultiplier,
    ) -> Self {
        Self {
            source,
            store,
            renderer,
            multiplier,
        }
    }

    pub fn renderer(&self) -> &SummaryRenderer {
        &self.renderer
    }

    /// Fetch → upsert → render one cycle
    pub async fn refresh(&self) -> ServiceResult<RefreshResponse> {
        let report = self.refresh_records().await?;

        tracing::info!(
            "✓ Country refresh completed: {} fetched, {} inserted, {} updated, {} skipped, {} with GDP, {:.2}s",
            report.fetched,
            report.inserted,
            report.updated,
            report.skipped,
            report.with_gdp,
            report.duration_seconds
        );

        let summary = SummaryData::collect(&self.store).await;
        if let Err(e) = self.renderer.render(&summary).await {
            tracing::error!("Error generating summary image: {:#}", e);
        }

        Ok(RefreshResponse {
            message: "Countries refreshed successfully".to_string(),
            total_countries: summary.total_countries,
            last_refreshed_at: summary.last_refreshed_at,
        })
    }

    async fn refresh_records(&self) -> ServiceResult<UpsertReport> {
        let start_time = std::time::Instant::now();
        tracing::info!("Starting country refresh...");

        // both fetches complete before anything is written
        let countries = self.source.fetch_countries().await.inspect_err(|e| {
            tracing::error!("✗ Country fetch failed: {}", e);
        })?;
        let rates = self.source.fetch_rates().await.inspect_err(|e| {
            tracing::error!("✗ Exchange rate fetch failed: {}", e);
        })?;

        let (drafts, mut report) = prepare_batch(&countries, &rates, &self.multiplier);
        if report.skipped > 0 {
            tracing::warn!("Skipped {} country entries with blank names", report.skipped);
        }

        let counts = self.store.apply_refresh(drafts, Utc::now()).await?;
        report.inserted = counts.inserted;
        report.updated = counts.updated;
        report.duration_seconds = start_time.elapsed().as_secs_f64();

        Ok(report)
    }
}
