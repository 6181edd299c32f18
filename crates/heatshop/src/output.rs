use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scraper::ScrapeReport;
use crate::types::{Product, ScrapeFailure};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    fn from_values(values: impl IntoIterator<Item = T>) -> Option<Self> {
        values.into_iter().fold(None, |range, v| match range {
            None => Some(Range { min: v, max: v }),
            Some(Range { min, max }) => Some(Range {
                min: if v < min { v } else { min },
                max: if v > max { v } else { max },
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueMetadata {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_products: usize,
    pub categories: BTreeMap<String, usize>,
    pub price_range: Option<Range<f64>>,
    pub wattage_range: Option<Range<u32>>,
    pub generated_values: usize,
    pub errors: Vec<ScrapeFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    pub metadata: CatalogueMetadata,
    pub products: Vec<Product>,
}

impl Catalogue {
    pub fn from_report(report: ScrapeReport, source: &str) -> Self {
        let products = report.products;

        let mut categories = BTreeMap::new();
        for product in &products {
            *categories.entry(product.category.clone()).or_insert(0) += 1;
        }

        let metadata = CatalogueMetadata {
            source: source.to_string(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            total_products: products.len(),
            categories,
            price_range: Range::from_values(products.iter().filter_map(|p| p.price)),
            wattage_range: Range::from_values(
                products.iter().filter_map(|p| p.specifications.wattage),
            ),
            generated_values: products.iter().map(|p| p.generated_fields.len()).sum(),
            errors: report.failures,
        };

        Catalogue { metadata, products }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)
            .inspect_err(|e| log::error!("Failed to write {}: {e}", path.as_ref().display()))?;
        log::info!(
            "Wrote {} product(s) to {}",
            self.products.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let json = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl std::fmt::Display for Catalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let meta = &self.metadata;
        writeln!(f, "Source: {}", meta.source)?;
        writeln!(
            f,
            "Run:    {} -> {} ({}s)",
            meta.started_at.format("%Y-%m-%d %H:%M:%S"),
            meta.finished_at.format("%H:%M:%S"),
            (meta.finished_at - meta.started_at).num_seconds()
        )?;
        writeln!(f, "Scraped: {} product(s)", meta.total_products)?;
        for (category, count) in &meta.categories {
            writeln!(f, "  {}: {}", category, count)?;
        }
        if let Some(range) = meta.price_range {
            writeln!(f, "Price:   €{:.2} - €{:.2}", range.min, range.max)?;
        }
        if let Some(range) = meta.wattage_range {
            writeln!(f, "Wattage: {}W - {}W", range.min, range.max)?;
        }
        if meta.generated_values > 0 {
            writeln!(f, "Placeholder values: {}", meta.generated_values)?;
        }
        writeln!(f, "Failed:  {}", meta.errors.len())?;
        for error in &meta.errors {
            writeln!(f, "  {}", error)?;
        }
        Ok(())
    }
}
