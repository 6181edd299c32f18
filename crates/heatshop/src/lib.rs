pub mod config;
pub mod fallback;
pub mod import;
pub mod output;
mod parser;
pub mod rules;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::ScraperConfig;
pub use output::Catalogue;
pub use parser::{
    ExtractError, extract_price, extract_product, find_price, parse_next_page, parse_price,
    parse_product_links,
};
pub use scraper::{ScrapeReport, ScraperError, WebScraper};
