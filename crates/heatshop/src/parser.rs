use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::fallback::{
    dummy_description, dummy_dimensions, dummy_price, dummy_stock, dummy_wattage, dummy_weight,
};
use crate::rules::{
    DESCRIPTION_RULES, IMAGE_ATTRS, IMAGE_SELECTORS, NAME_RULES, NEXT_PAGE_SELECTORS, PRICE_RULES,
    PRODUCT_LINK_SELECTORS, VARIANT_OPTION_SELECTORS, document_text, find_specifications,
    first_match, normalize_whitespace,
};
use crate::types::{
    Category, GeneratedField, Product, ProductImage, ProductVariant, Sourced, Specifications,
};
use crate::utils::{generate_id, generate_sku, sku_for};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("No product name found on {0}")]
    MissingName(String),
}

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("invalid regex: number"));

static RE_OPTION_WATTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{2,4})\s*(?:w|watt|watts)\b").expect("invalid regex: option wattage")
});

static RE_OUT_OF_STOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"uitverkocht|niet op voorraad|out of stock|sold out")
        .expect("invalid regex: out of stock")
});

static RE_STOCK_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,4})\s*(?:op voorraad|in stock|stuks beschikbaar|available)")
        .expect("invalid regex: stock count")
});

pub fn parse_price(raw: &str) -> Option<f64> {
    let token = RE_NUMBER
        .find(raw)?
        .as_str()
        .trim_end_matches(['.', ',']);

    let normalized = match (token.rfind('.'), token.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(comma)) => {
            if token.len() - comma - 1 == 3 || token.matches(',').count() > 1 {
                token.replace(',', "")
            } else {
                token.replace(',', ".")
            }
        }
        (Some(dot), None) => {
            if token.len() - dot - 1 == 3 || token.matches('.').count() > 1 {
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (None, None) => token.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|price| *price > 0.0)
}

pub fn find_price(document: &Html, lower_text: &str) -> Option<f64> {
    PRICE_RULES.iter().find_map(|rule| {
        rule.apply(document, lower_text)
            .and_then(|raw| parse_price(&raw))
    })
}

pub fn extract_price<R: Rng + ?Sized>(document: &Html, rng: &mut R) -> Sourced<f64> {
    match find_price(document, &document_text(document)) {
        Some(price) => Sourced::scraped(price),
        None => Sourced::generated(dummy_price(rng)),
    }
}

fn find_stock(lower_text: &str) -> Option<u32> {
    if RE_OUT_OF_STOCK.is_match(lower_text) {
        return Some(0);
    }
    RE_STOCK_COUNT
        .captures(lower_text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

fn clean_name(raw: &str) -> String {
    let name = raw.split(" | ").next().unwrap_or(raw);
    normalize_whitespace(name)
}

fn name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let segment = segment
        .trim_end_matches(".html")
        .trim_end_matches(".htm");

    let name = segment
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

fn resolve_same_host(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str() != base.host_str() {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

pub fn parse_product_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    for css in PRODUCT_LINK_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        let mut seen = HashSet::new();
        let links: Vec<String> = document
            .select(&selector)
            .filter_map(|e| {
                e.value()
                    .attr("href")
                    .or_else(|| e.value().attr("data-product-url"))
            })
            .filter_map(|href| resolve_same_host(page_url, href))
            .filter(|url| url != page_url)
            .map(String::from)
            .filter(|url| seen.insert(url.clone()))
            .collect();

        if !links.is_empty() {
            log::debug!("{} product link(s) via '{}'", links.len(), css);
            return links;
        }
    }

    Vec::new()
}

pub fn parse_next_page(html: &str, page_url: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    NEXT_PAGE_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .filter_map(|e| e.value().attr("href"))
            .filter_map(|href| resolve_same_host(page_url, href))
            .find(|url| url != page_url)
            .map(String::from)
    })
}

fn parse_images(document: &Html, page_url: &Url, name: &str) -> Vec<ProductImage> {
    let mut seen = HashSet::new();

    for css in IMAGE_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        let images: Vec<ProductImage> = document
            .select(&selector)
            .filter_map(|img| {
                let src = IMAGE_ATTRS
                    .iter()
                    .filter_map(|attr| img.value().attr(attr))
                    .find(|s| !s.trim().is_empty() && !s.starts_with("data:"))?;
                let url = page_url.join(src.trim()).ok()?;
                let alt_text = img
                    .value()
                    .attr("alt")
                    .map(normalize_whitespace)
                    .filter(|alt| !alt.is_empty())
                    .unwrap_or_else(|| name.to_string());
                Some(ProductImage {
                    url: url.to_string(),
                    alt_text,
                })
            })
            .filter(|image| seen.insert(image.url.clone()))
            .collect();

        if !images.is_empty() {
            return images;
        }
    }

    let og_image = Selector::parse("meta[property='og:image']").unwrap();
    document
        .select(&og_image)
        .filter_map(|e| e.value().attr("content"))
        .filter_map(|src| page_url.join(src.trim()).ok())
        .map(|url| ProductImage {
            url: url.to_string(),
            alt_text: name.to_string(),
        })
        .filter(|image| seen.insert(image.url.clone()))
        .collect()
}

fn default_variant(
    name: &str,
    price: Option<f64>,
    stock: Option<u32>,
    wattage: Option<u32>,
) -> ProductVariant {
    let mut attributes = BTreeMap::new();
    if let Some(w) = wattage {
        attributes.insert("wattage".to_string(), format!("{}W", w));
    }

    ProductVariant {
        name: name.to_string(),
        sku: sku_for(name, wattage),
        price,
        stock,
        wattage,
        is_default: true,
        attributes,
    }
}

fn parse_variants(
    document: &Html,
    name: &str,
    price: Option<f64>,
    stock: Option<u32>,
    wattage: Option<u32>,
) -> Vec<ProductVariant> {
    let mut variants = vec![default_variant(name, price, stock, wattage)];
    let mut seen_wattages: HashSet<u32> = wattage.into_iter().collect();

    let options = VARIANT_OPTION_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let options: Vec<_> = document
            .select(&selector)
            .filter(|o| o.value().attr("value").is_some_and(|v| !v.trim().is_empty()))
            .collect();
        (!options.is_empty()).then_some(options)
    });

    for option in options.unwrap_or_default() {
        let label = normalize_whitespace(&option.text().collect::<String>());
        let Some(option_wattage) = RE_OPTION_WATTAGE
            .captures(&label)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        else {
            continue;
        };
        if !seen_wattages.insert(option_wattage) {
            continue;
        }

        let option_price = option
            .value()
            .attr("data-price")
            .and_then(parse_price)
            .or(price);

        let mut attributes = BTreeMap::new();
        attributes.insert("wattage".to_string(), format!("{}W", option_wattage));

        variants.push(ProductVariant {
            name: format!("{} {}W", name, option_wattage),
            sku: generate_sku(name, option_wattage),
            price: option_price,
            stock,
            wattage: Some(option_wattage),
            is_default: false,
            attributes,
        });
    }

    variants
}

pub fn extract_product<R: Rng + ?Sized>(
    html: &str,
    url: &str,
    category: &Category,
    rng: &mut R,
    generate_fallback: bool,
) -> Result<Product, ExtractError> {
    let page_url = Url::parse(url).map_err(|_| ExtractError::UrlParse(url.to_string()))?;
    let document = Html::parse_document(html);
    let text = document_text(&document);
    let mut generated = Vec::new();

    let name = first_match(&document, &text, NAME_RULES)
        .map(|raw| clean_name(&raw))
        .filter(|n| !n.is_empty())
        .or_else(|| name_from_url(&page_url))
        .ok_or_else(|| ExtractError::MissingName(url.to_string()))?;

    let price = if generate_fallback {
        let price = extract_price(&document, rng);
        if price.is_generated() {
            generated.push(GeneratedField::Price);
        }
        Some(price.value)
    } else {
        find_price(&document, &text)
    };

    let description = match first_match(&document, &text, DESCRIPTION_RULES) {
        Some(description) => description,
        None if generate_fallback => {
            generated.push(GeneratedField::Description);
            dummy_description(&name)
        }
        None => String::new(),
    };

    let mut specifications: Specifications = find_specifications(&text);
    if generate_fallback {
        let wattage = match specifications.wattage {
            Some(w) => w,
            None => {
                generated.push(GeneratedField::Wattage);
                let w = dummy_wattage(rng);
                specifications.wattage = Some(w);
                w
            }
        };
        if specifications.dimensions.is_none() {
            generated.push(GeneratedField::Dimensions);
            specifications.dimensions = Some(dummy_dimensions(wattage));
        }
        if specifications.weight.is_none() {
            generated.push(GeneratedField::Weight);
            specifications.weight = Some(dummy_weight(wattage));
        }
    }

    let stock = match find_stock(&text) {
        Some(stock) => Some(stock),
        None if generate_fallback => {
            generated.push(GeneratedField::Stock);
            Some(dummy_stock(rng))
        }
        None => None,
    };

    let images = parse_images(&document, &page_url, &name);
    let variants = parse_variants(&document, &name, price, stock, specifications.wattage);

    generated.sort();
    for field in &generated {
        log::debug!("Generated placeholder {:?} for {}", field, url);
    }
    Ok(Product {
        id: generate_id(&name),
        sku: sku_for(&name, specifications.wattage),
        name,
        category: category.name.clone(),
        url: page_url.to_string(),
        price,
        stock,
        description,
        specifications,
        images,
        variants,
        generated_fields: generated,
        scraped_at: Utc::now(),
    })
}
