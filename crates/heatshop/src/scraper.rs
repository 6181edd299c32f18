use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use reqwest::{Client, Url};

use crate::config::{ConfigError, ScraperConfig};
use crate::fallback::new_rng;
use crate::parser::{extract_product, parse_next_page, parse_product_links};
use crate::types::{Category, FailureStage, Product, ScrapeFailure};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub products: Vec<Product>,
    pub failures: Vec<ScrapeFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requests: usize,
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    config: ScraperConfig,
}

impl WebScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let config = config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }

    pub fn session(&self) -> ScrapeSession<'_> {
        ScrapeSession::new(self)
    }

    pub async fn scrape(&self) -> ScrapeReport {
        let categories = self.config.categories.clone();
        self.session().run(&categories).await
    }
}

pub struct ScrapeSession<'a> {
    scraper: &'a WebScraper,
    rng: StdRng,
    visited: HashSet<String>,
    ids: HashMap<String, String>,
    requests: usize,
    products: Vec<Product>,
    failures: Vec<ScrapeFailure>,
    started_at: DateTime<Utc>,
}

impl<'a> ScrapeSession<'a> {
    fn new(scraper: &'a WebScraper) -> Self {
        Self {
            scraper,
            rng: new_rng(scraper.config.seed),
            visited: HashSet::new(),
            ids: HashMap::new(),
            requests: 0,
            products: Vec::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    async fn pause(&self, delay: Duration) {
        if self.requests > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn fetch(&mut self, url: &str) -> Result<String, FetchFailure> {
        let config = &self.scraper.config;
        let (max_attempts, request_delay, retry_delay) =
            (config.max_attempts, config.request_delay, config.retry_delay);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let delay = if attempt == 1 {
                request_delay
            } else {
                retry_delay
            };
            self.pause(delay).await;
            self.requests += 1;

            match self.scraper.get_html(url).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt >= max_attempts => {
                    log::warn!("Giving up on {} after {} attempt(s): {}", url, attempt, e);
                    return Err(FetchFailure {
                        url: url.to_string(),
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    log::debug!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        e,
                        retry_delay
                    );
                }
            }
        }
    }

    fn record_failure(&mut self, category: &Category, stage: FailureStage, failure: FetchFailure) {
        self.failures.push(ScrapeFailure {
            url: failure.url,
            category: category.name.clone(),
            stage,
            attempts: failure.attempts,
            message: failure.message,
        });
    }

    async fn collect_product_links(&mut self, category: &Category) -> Vec<String> {
        let config = &self.scraper.config;
        let max_pages = config.max_pages_per_category;
        let mut page_url = match config.category_url(category) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Skipping category {}: {}", category.name, e);
                return Vec::new();
            }
        };

        let mut links = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=max_pages {
            if !self.visited.insert(page_url.to_string()) {
                log::debug!("Listing page {} already visited", page_url);
                break;
            }

            log::info!("Fetching {} listing page {}: {}", category.name, page, page_url);
            let html = match self.fetch(page_url.as_str()).await {
                Ok(html) => html,
                Err(failure) => {
                    self.record_failure(category, FailureStage::Listing, failure);
                    break;
                }
            };

            let page_links = parse_product_links(&html, &page_url);
            log::debug!("Found {} product link(s) on page {}", page_links.len(), page);
            links.extend(page_links.into_iter().filter(|l| seen.insert(l.clone())));

            match parse_next_page(&html, &page_url).and_then(|next| Url::parse(&next).ok()) {
                Some(next) => page_url = next,
                None => break,
            }
        }

        links
    }

    async fn scrape_product(&mut self, category: &Category, url: &str) {
        let html = match self.fetch(url).await {
            Ok(html) => html,
            Err(failure) => {
                self.record_failure(category, FailureStage::Product, failure);
                return;
            }
        };

        let generate_fallback = self.scraper.config.generate_fallback_data;
        match extract_product(&html, url, category, &mut self.rng, generate_fallback) {
            Ok(product) => {
                if let Some(previous) = self.ids.get(&product.id) {
                    log::warn!(
                        "Duplicate product id '{}' ({} and {})",
                        product.id,
                        previous,
                        category.name
                    );
                } else {
                    self.ids.insert(product.id.clone(), category.name.clone());
                }
                log::debug!("Extracted {}", product);
                self.products.push(product);
            }
            Err(e) => {
                log::warn!("Dropping {}: {}", url, e);
                self.record_failure(
                    category,
                    FailureStage::Extract,
                    FetchFailure {
                        url: url.to_string(),
                        attempts: 1,
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    pub async fn run(mut self, categories: &[Category]) -> ScrapeReport {
        for category in categories {
            log::info!("Scraping category {}", category);
            let before = self.products.len();

            let mut links = self.collect_product_links(category).await;
            links.retain(|link| !self.visited.contains(link));
            if let Some(max) = self.scraper.config.max_products_per_category {
                links.truncate(max);
            }

            let total = links.len();
            for (i, url) in links.iter().enumerate() {
                if !self.visited.insert(url.clone()) {
                    log::debug!("Skipping already visited {}", url);
                    continue;
                }
                log::info!("[{}/{}] {}", i + 1, total, url);
                self.scrape_product(category, url).await;
            }

            log::info!(
                "{}: {} product(s) scraped",
                category.name,
                self.products.len() - before
            );
        }

        ScrapeReport {
            products: self.products,
            failures: self.failures,
            started_at: self.started_at,
            finished_at: Utc::now(),
            requests: self.requests,
        }
    }
}
