use std::time::Duration;

use reqwest::Url;

use crate::types::Category;

pub const DEFAULT_BASE_URL: &str = "https://www.heatshop.nl";
pub const DEFAULT_PRODUCTS_FILE: &str = "crystallize-products.json";
pub const DEFAULT_IMPORT_FILE: &str = "crystallize-import.json";

pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_PAGES: u32 = 5;

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("Infrared Panels", "/infrarood-panelen"),
        Category::new("Mirror Heaters", "/infrarood-spiegelpanelen"),
        Category::new("Ceiling Heaters", "/infrarood-plafondpanelen"),
        Category::new("Patio Heaters", "/terrasverwarmers"),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid path for category '{0}'")]
    InvalidCategoryPath(String),
    #[error("At least one category is required")]
    NoCategories,
    #[error("Max attempts must be greater than 0")]
    ZeroAttempts,
    #[error("Max pages must be greater than 0")]
    ZeroPages,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub categories: Vec<Category>,
    pub request_delay: Duration,
    pub retry_delay: Duration,
    // first try included
    pub max_attempts: u32,
    pub timeout: Duration,
    pub max_pages_per_category: u32,
    pub max_products_per_category: Option<usize>,
    pub generate_fallback_data: bool,
    pub seed: Option<u64>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            categories: default_categories(),
            request_delay: DEFAULT_REQUEST_DELAY,
            retry_delay: DEFAULT_REQUEST_DELAY * 2,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            max_pages_per_category: DEFAULT_MAX_PAGES,
            max_products_per_category: None,
            generate_fallback_data: true,
            seed: None,
        }
    }
}

impl ScraperConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        for category in &self.categories {
            self.category_url(category)?;
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.max_pages_per_category == 0 {
            return Err(ConfigError::ZeroPages);
        }
        Ok(self)
    }

    pub fn category_url(&self, category: &Category) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        base.join(&category.path)
            .map_err(|_| ConfigError::InvalidCategoryPath(category.name.clone()))
    }
}
