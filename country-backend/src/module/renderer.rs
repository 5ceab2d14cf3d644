//! Summary image renderer
//!
//! Draws the country totals and the top five countries by estimated GDP
//! into a fixed-size PNG via an SVG template.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use resvg::tiny_skia;
use resvg::usvg::fontdb::{self, Database};
use resvg::usvg::{Options, Tree};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::country::CountryStore;
use crate::config::RenderConfig;

pub const SUMMARY_IMAGE_FILE: &str = "summary.png";

const SUMMARY_SVG_TEMPLATE: &str = include_str!("../../resources/summary_template.svg");

/// Inputs of one summary image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryData {
    pub total_countries: usize,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// (name, estimated GDP), largest first
    pub top: Vec<(String, Decimal)>,
}

impl SummaryData {
    pub async fn collect(store: &CountryStore) -> Self {
        let top = store
            .top_by_gdp(SummaryRenderer::TOP_N)
            .await
            .into_iter()
            .filter_map(|c| c.estimated_gdp.map(|gdp| (c.name, gdp)))
            .collect();

        Self {
            total_countries: store.count().await,
            last_refreshed_at: store.last_refreshed_at().await,
            top,
        }
    }
}

pub struct SummaryRenderer {
    output_dir: PathBuf,
    font_dir: PathBuf,
    font_family: String,
}

impl SummaryRenderer {
    pub const WIDTH: u32 = 800;
    pub const HEIGHT: u32 = 600;
    pub const TOP_N: usize = 5;

    const TITLE_X: f32 = 400.0;
    const TITLE_Y: f32 = 30.0;
    const X_LEFT: f32 = 50.0;
    const Y_TOTAL: f32 = 100.0;
    const Y_REFRESHED: f32 = 140.0;
    const Y_TOP_HEADER: f32 = 200.0;
    const X_ROW: f32 = 70.0;
    const Y_FIRST_ROW: f32 = 240.0;
    const ROW_SPACING: f32 = 50.0;

    pub fn new(output_dir: impl AsRef<Path>, config: &RenderConfig) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            font_dir: config.font_dir.clone(),
            font_family: config.font_family.clone(),
        }
    }

    pub fn image_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_IMAGE_FILE)
    }

    /// Render and atomically replace the summary image. Returns its path.
    pub async fn render(&self, data: &SummaryData) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .context("Failed to create output directory")?;

        let (fontdb, family) = self.load_fonts();
        let svg = Self::build_svg(data, family.as_deref().unwrap_or(&self.font_family));
        let png = rasterize(&svg, fontdb, family)?;

        let output_path = self.image_path();
        let tmp_path = self.output_dir.join(format!("{}.tmp", SUMMARY_IMAGE_FILE));
        tokio::fs::write(&tmp_path, &png)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        tokio::fs::rename(&tmp_path, &output_path)
            .await
            .with_context(|| format!("Failed to move summary image into {:?}", output_path))?;

        tracing::info!("Generated summary image: {:?}", output_path);
        Ok(output_path)
    }

    /// Font database plus the family to draw with.
    ///
    /// Tries the configured font directory, then system fonts. The family
    /// is `None` only when no font at all is available.
    fn load_fonts(&self) -> (Database, Option<String>) {
        let mut db = Database::new();
        if self.font_dir.is_dir() {
            db.load_fonts_dir(&self.font_dir);
        }
        if db.len() == 0 {
            db.load_system_fonts();
        }
        tracing::debug!("Loaded {} font faces", db.len());

        if db.len() == 0 {
            tracing::warn!("No fonts available, summary image will have no text");
            return (db, None);
        }

        let query = fontdb::Query {
            families: &[fontdb::Family::Name(&self.font_family)],
            ..fontdb::Query::default()
        };
        if db.query(&query).is_some() {
            return (db, Some(self.font_family.clone()));
        }

        let fallback = db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
        if let Some(name) = &fallback {
            tracing::warn!(
                "Font family '{}' not found, falling back to '{}'",
                self.font_family,
                name
            );
        }
        (db, fallback)
    }

    fn build_svg(data: &SummaryData, font_family: &str) -> String {
        let mut content = String::new();

        content.push_str(&format!(
            r#"  <text x="{}" y="{}" class="header">Total Countries: {}</text>"#,
            Self::X_LEFT,
            Self::Y_TOTAL,
            data.total_countries
        ));
        content.push('\n');

        if let Some(ts) = data.last_refreshed_at {
            content.push_str(&format!(
                r#"  <text x="{}" y="{}" class="muted">Last Refreshed: {}</text>"#,
                Self::X_LEFT,
                Self::Y_REFRESHED,
                ts.format("%Y-%m-%d %H:%M:%S")
            ));
            content.push('\n');
        }

        content.push_str(&format!(
            r#"  <text x="{}" y="{}" class="section">Top 5 by Estimated GDP:</text>"#,
            Self::X_LEFT,
            Self::Y_TOP_HEADER
        ));
        content.push('\n');

        for (i, (name, gdp)) in data.top.iter().take(Self::TOP_N).enumerate() {
            let line = format!("{}. {} - ${}", i + 1, name, format_money(*gdp));
            content.push_str(&format!(
                r#"  <text x="{}" y="{}" class="row">{}</text>"#,
                Self::X_ROW,
                Self::Y_FIRST_ROW + i as f32 * Self::ROW_SPACING,
                escape_xml(&line)
            ));
            content.push('\n');
        }

        SUMMARY_SVG_TEMPLATE
            .replace("{{WIDTH}}", &Self::WIDTH.to_string())
            .replace("{{HEIGHT}}", &Self::HEIGHT.to_string())
            .replace("{{FONT_FAMILY}}", &escape_xml(font_family))
            .replace("{{TITLE_X}}", &Self::TITLE_X.to_string())
            .replace("{{TITLE_Y}}", &Self::TITLE_Y.to_string())
            .replace("{{CONTENT}}", &content)
    }
}

/// Rasterize an SVG document into PNG bytes
fn rasterize(svg: &str, fontdb: Database, family: Option<String>) -> Result<Vec<u8>> {
    let mut options = Options::default();
    if let Some(family) = family {
        options.font_family = family;
    }
    options.fontdb = Arc::new(fontdb);

    let tree = Tree::from_str(svg, &options).context("Failed to parse SVG")?;

    let size = tree.size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width() as u32, size.height() as u32)
        .context("Failed to create pixmap")?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().context("Failed to encode PNG")
}

/// Two decimals with thousands separators, e.g. 1234567.891 → "1,234,567.89"
pub fn format_money(value: Decimal) -> String {
    let formatted = format!("{:.2}", value.round_dp(2));
    let (sign, digits) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    format!("{}{}.{}", sign, int_grouped, frac_part)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
