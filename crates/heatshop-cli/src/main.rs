use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use heatshop::config::{
    DEFAULT_BASE_URL, DEFAULT_IMPORT_FILE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PAGES,
    DEFAULT_PRODUCTS_FILE, default_categories,
};
use heatshop::import::{build_import, write_import};
use heatshop::types::Category;
use heatshop::utils::{CatalogueStats, ProductFilter};
use heatshop::{Catalogue, ScraperConfig, WebScraper};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "heatshop")]
#[command(about = "An infrared heater catalogue scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every category and write the products and import files
    Scrape {
        #[arg(long, default_value = DEFAULT_BASE_URL, help = "Shop root URL")]
        base_url: String,

        #[arg(
            long = "category",
            value_name = "NAME=/PATH",
            value_parser = parse_category,
            help = "Category to scrape (repeatable); defaults to the built-in list"
        )]
        categories: Vec<Category>,

        #[arg(long, default_value = DEFAULT_PRODUCTS_FILE, help = "Products file to write")]
        output: PathBuf,

        #[arg(long, default_value = DEFAULT_IMPORT_FILE, help = "CMS import file to write")]
        import_output: PathBuf,

        #[arg(long, default_value_t = 1000, help = "Delay between requests in milliseconds")]
        delay_ms: u64,

        #[arg(long, help = "Delay before a retry in milliseconds [default: 2 x delay]")]
        retry_delay_ms: Option<u64>,

        #[arg(
            long,
            default_value_t = DEFAULT_MAX_ATTEMPTS,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Requests per URL before giving up"
        )]
        max_attempts: u32,

        #[arg(long, default_value_t = 30, help = "Per-request timeout in seconds")]
        timeout_secs: u64,

        #[arg(
            long,
            default_value_t = DEFAULT_MAX_PAGES,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Listing pages to follow per category"
        )]
        max_pages: u32,

        #[arg(long, help = "Maximum products to scrape per category")]
        max_products: Option<usize>,

        #[arg(long, help = "Seed for placeholder data")]
        seed: Option<u64>,

        #[arg(long, help = "Leave missing fields empty instead of generating placeholders")]
        no_fallback: bool,
    },
    /// List products from a products file with optional filtering
    List {
        #[arg(default_value = DEFAULT_PRODUCTS_FILE, help = "Products file to read")]
        file: PathBuf,

        #[arg(long, help = "Only products in this category")]
        category: Option<String>,

        #[arg(long, help = "Minimum price")]
        min_price: Option<f64>,

        #[arg(long, help = "Maximum price")]
        max_price: Option<f64>,

        #[arg(long, help = "Minimum wattage")]
        min_wattage: Option<u32>,

        #[arg(long, help = "Maximum wattage")]
        max_wattage: Option<u32>,

        #[arg(long, help = "Maximum number of results to return")]
        limit: Option<usize>,

        #[arg(long, help = "Number of results to skip from the beginning")]
        offset: Option<usize>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Rebuild the CMS import file from a products file
    Export {
        #[arg(default_value = DEFAULT_PRODUCTS_FILE, help = "Products file to read")]
        file: PathBuf,

        #[arg(long, default_value = DEFAULT_IMPORT_FILE, help = "CMS import file to write")]
        output: PathBuf,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn load_catalogue(file: &Path) -> Catalogue {
    Catalogue::load(file).unwrap_or_else(|e| {
        log::error!("Error reading {}: {}", file.display(), e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Scrape {
            base_url,
            categories,
            output,
            import_output,
            delay_ms,
            retry_delay_ms,
            max_attempts,
            timeout_secs,
            max_pages,
            max_products,
            seed,
            no_fallback,
        } => {
            let config = ScraperConfig {
                base_url,
                categories: if categories.is_empty() {
                    default_categories()
                } else {
                    categories
                },
                request_delay: Duration::from_millis(delay_ms),
                retry_delay: Duration::from_millis(
                    retry_delay_ms.unwrap_or(delay_ms.saturating_mul(2)),
                ),
                max_attempts,
                timeout: Duration::from_secs(timeout_secs),
                max_pages_per_category: max_pages,
                max_products_per_category: max_products,
                generate_fallback_data: !no_fallback,
                seed,
            };

            let scraper = WebScraper::new(config).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            log::info!(
                "Scraping {} categories from {}...",
                scraper.config().categories.len(),
                scraper.config().base_url
            );

            let report = scraper.scrape().await;
            log::info!("Run finished after {} request(s)", report.requests);

            let catalogue = Catalogue::from_report(report, &scraper.config().base_url);
            catalogue.write(&output).unwrap_or_else(|e| {
                log::error!("Error writing {}: {}", output.display(), e);
                process::exit(1);
            });

            let entries = build_import(&catalogue.products);
            write_import(&import_output, &entries).unwrap_or_else(|e| {
                log::error!("Error writing {}: {}", import_output.display(), e);
                process::exit(1);
            });

            print!("{}", catalogue);
        }

        Commands::List {
            file,
            category,
            min_price,
            max_price,
            min_wattage,
            max_wattage,
            limit,
            offset,
            format,
        } => {
            let filter = ProductFilter {
                category,
                min_price,
                max_price,
                min_wattage,
                max_wattage,
                limit,
                offset,
            };

            let filter = filter.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let products = filter.apply(load_catalogue(&file).products);

            match format {
                OutputFormat::Json => serialize_json(&products),
                OutputFormat::Text => {
                    if products.is_empty() {
                        println!("No products to display.");
                    } else {
                        for (i, product) in products.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, product);
                        }
                        print!("{}", CatalogueStats::from_products(&products));
                    }
                }
            }
        }

        Commands::Export { file, output } => {
            let catalogue = load_catalogue(&file);
            let entries = build_import(&catalogue.products);
            write_import(&output, &entries).unwrap_or_else(|e| {
                log::error!("Error writing {}: {}", output.display(), e);
                process::exit(1);
            });
            println!("Wrote {} import item(s) to {}", entries.len(), output.display());
        }
    }
}
