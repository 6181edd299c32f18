use std::collections::BTreeMap;

use crate::types::Product;

const MAX_ID_LEN: usize = 50;
const SKU_PREFIX_LEN: usize = 3;
const DEFAULT_SKU_PREFIX: &str = "HTR";

pub fn generate_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c);
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }

    id.truncate(MAX_ID_LEN);
    id.trim_end_matches('-').to_string()
}

pub fn sku_prefix(name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(SKU_PREFIX_LEN)
        .collect::<String>()
        .to_ascii_uppercase();

    if prefix.is_empty() {
        DEFAULT_SKU_PREFIX.to_string()
    } else {
        prefix
    }
}

pub fn generate_sku(name: &str, wattage: u32) -> String {
    format!("{}-{}W", sku_prefix(name), wattage)
}

pub fn sku_for(name: &str, wattage: Option<u32>) -> String {
    match wattage {
        Some(w) => generate_sku(name, w),
        None => format!("{}-{}", sku_prefix(name), generate_id(name)),
    }
}

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_wattage: Option<u32>,
    pub max_wattage: Option<u32>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProductFilter {
    pub fn apply(self, mut products: Vec<Product>) -> Vec<Product> {
        if let Some(category) = &self.category {
            products.retain(|p| p.category.eq_ignore_ascii_case(category));
        }
        if let Some(min) = self.min_price {
            products.retain(|p| p.price.is_some_and(|price| price >= min));
        }
        if let Some(max) = self.max_price {
            products.retain(|p| p.price.is_some_and(|price| price <= max));
        }
        if let Some(min) = self.min_wattage {
            products.retain(|p| p.specifications.wattage.is_some_and(|w| w >= min));
        }
        if let Some(max) = self.max_wattage {
            products.retain(|p| p.specifications.wattage.is_some_and(|w| w <= max));
        }
        if let Some(off) = self.offset {
            products = products.into_iter().skip(off).collect();
        }
        if let Some(lim) = self.limit {
            products.truncate(lim);
        }
        products
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(min) = self.min_price
            && let Some(max) = self.max_price
            && min > max
        {
            return Err(format!(
                "Minimum price ({min}) cannot be above maximum price ({max})"
            ));
        }
        if let Some(min) = self.min_wattage
            && let Some(max) = self.max_wattage
            && min > max
        {
            return Err(format!(
                "Minimum wattage ({min}) cannot be above maximum wattage ({max})"
            ));
        }
        if self.min_price.is_some_and(|p| p < 0.0) || self.max_price.is_some_and(|p| p < 0.0) {
            return Err("Prices must not be negative".to_string());
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct CatalogueStats {
    pub categories: BTreeMap<String, usize>,
    pub with_images: usize,
    pub with_generated_data: usize,
    pub total: usize,
}

impl CatalogueStats {
    pub fn from_products(products: &[Product]) -> CatalogueStats {
        let mut categories = BTreeMap::new();
        for product in products {
            *categories.entry(product.category.clone()).or_insert(0) += 1;
        }

        CatalogueStats {
            categories,
            with_images: products.iter().filter(|p| !p.images.is_empty()).count(),
            with_generated_data: products
                .iter()
                .filter(|p| !p.generated_fields.is_empty())
                .count(),
            total: products.len(),
        }
    }
}

impl std::fmt::Display for CatalogueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        for (category, count) in &self.categories {
            writeln!(f, "  {:<28}{}", format!("{}:", category), count)?;
        }
        writeln!(f, "  With images:                {}", self.with_images)?;
        writeln!(
            f,
            "  With placeholder data (*):  {}",
            self.with_generated_data
        )?;
        writeln!(f, "  Total:                      {}", self.total)
    }
}
