use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::types::Specifications;

#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    Text(&'static str),
    Attr(&'static str, &'static str),
    Pattern(&'static LazyLock<Regex>),
}

impl FieldRule {
    pub fn apply(&self, document: &Html, lower_text: &str) -> Option<String> {
        let value = match self {
            FieldRule::Text(selector) => {
                let selector = Selector::parse(selector).ok()?;
                document
                    .select(&selector)
                    .map(|e| normalize_whitespace(&e.text().collect::<String>()))
                    .find(|s| !s.is_empty())?
            }
            FieldRule::Attr(selector, attr) => {
                let selector = Selector::parse(selector).ok()?;
                document
                    .select(&selector)
                    .filter_map(|e| e.value().attr(attr))
                    .map(normalize_whitespace)
                    .find(|s| !s.is_empty())?
            }
            FieldRule::Pattern(regex) => regex
                .captures(lower_text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())?,
        };

        (!value.is_empty()).then_some(value)
    }
}

pub fn first_match(document: &Html, lower_text: &str, rules: &[FieldRule]) -> Option<String> {
    rules.iter().find_map(|rule| {
        let value = rule.apply(document, lower_text);
        if value.is_some() {
            log::trace!("rule hit: {:?}", rule);
        }
        value
    })
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn document_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let inside_code = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"));
        if !inside_code {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    normalize_whitespace(&text).to_lowercase()
}

pub static NAME_RULES: &[FieldRule] = &[
    FieldRule::Text("h1.product_title"),
    FieldRule::Text("h1.product-title"),
    FieldRule::Text("h1.page-title span"),
    FieldRule::Text("h1[itemprop=name]"),
    FieldRule::Text(".product-name h1"),
    FieldRule::Attr("meta[property='og:title']", "content"),
    FieldRule::Text("h1"),
    FieldRule::Text("title"),
];

static RE_PRICE_EURO_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:€|\beur\b|\$|£)\s*(\d[\d.,]*(?:,-)?)").expect("invalid regex: price before")
});

static RE_PRICE_EURO_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d.,]*)\s*(?:€|eur\b|euro\b)").expect("invalid regex: price after")
});

pub static PRICE_RULES: &[FieldRule] = &[
    FieldRule::Attr("meta[property='product:price:amount']", "content"),
    FieldRule::Attr("[itemprop=price]", "content"),
    FieldRule::Text("[itemprop=price]"),
    FieldRule::Text(".summary .price ins .amount"),
    FieldRule::Text(".summary .price .amount"),
    FieldRule::Text(".price-box .price"),
    FieldRule::Text(".product-price"),
    FieldRule::Text(".price"),
    FieldRule::Pattern(&RE_PRICE_EURO_BEFORE),
    FieldRule::Pattern(&RE_PRICE_EURO_AFTER),
];

pub static DESCRIPTION_RULES: &[FieldRule] = &[
    FieldRule::Text("[itemprop=description]"),
    FieldRule::Text(".woocommerce-product-details__short-description"),
    FieldRule::Text("#tab-description"),
    FieldRule::Text(".product-description"),
    FieldRule::Text(".product.attribute.description .value"),
    FieldRule::Text(".description"),
    FieldRule::Attr("meta[property='og:description']", "content"),
    FieldRule::Attr("meta[name=description]", "content"),
];

pub static IMAGE_SELECTORS: &[&str] = &[
    ".woocommerce-product-gallery__image img",
    ".product-gallery img",
    ".gallery-placeholder img",
    ".product-image img",
    ".product-images img",
    "img[itemprop=image]",
];

pub static IMAGE_ATTRS: &[&str] = &["data-large_image", "data-zoom-image", "data-src", "src"];

pub static PRODUCT_LINK_SELECTORS: &[&str] = &[
    "a.woocommerce-LoopProduct-link",
    "a.product-item-link",
    ".product-item a.product-item-photo",
    "ul.products li.product a[href]",
    ".product-grid .product a[href]",
    ".products .product a[href]",
    "[data-product-url]",
];

pub static NEXT_PAGE_SELECTORS: &[&str] = &[
    "link[rel=next]",
    "a[rel=next]",
    "a.next.page-numbers",
    "li.pages-item-next a",
    ".pagination a.next",
];

pub static VARIANT_OPTION_SELECTORS: &[&str] = &[
    "table.variations select option",
    "select.product-variant option",
    "select[name*=vermogen] option",
    "select[name*=wattage] option",
    ".product-options select option",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecField {
    Wattage,
    Dimensions,
    Weight,
    Coverage,
    Voltage,
    IpRating,
}

pub struct SpecRule {
    pub field: SpecField,
    pub pattern: Regex,
}

fn spec_rule(field: SpecField, pattern: &str) -> SpecRule {
    SpecRule {
        field,
        pattern: Regex::new(pattern).expect("invalid regex: spec rule"),
    }
}

pub static SPEC_RULES: LazyLock<Vec<SpecRule>> = LazyLock::new(|| {
    use SpecField::*;
    vec![
        spec_rule(
            Wattage,
            r"(?:vermogen|power|wattage|output)\s*:?\s*(\d{2,4})\s*(?:w|watts?)\b",
        ),
        spec_rule(Wattage, r"\b(\d{2,4})\s*(?:w|watt|watts)\b"),
        spec_rule(
            Dimensions,
            r"(?:afmetingen|dimensions|afmeting|size)\s*:?\s*(\d{2,4}(?:[.,]\d)?\s*[x×]\s*\d{2,4}(?:[.,]\d)?(?:\s*[x×]\s*\d{1,4}(?:[.,]\d)?)?\s*(?:mm|cm))",
        ),
        spec_rule(
            Dimensions,
            r"\b(\d{2,4}(?:[.,]\d)?\s*[x×]\s*\d{2,4}(?:[.,]\d)?(?:\s*[x×]\s*\d{1,4}(?:[.,]\d)?)?\s*(?:mm|cm))",
        ),
        spec_rule(
            Weight,
            r"(?:gewicht|weight)\s*:?\s*(\d{1,3}(?:[.,]\d{1,2})?\s*kg)\b",
        ),
        spec_rule(Weight, r"\b(\d{1,3}(?:[.,]\d{1,2})?\s*kg)\b"),
        spec_rule(
            Coverage,
            r"(?:coverage|ruimte|geschikt voor|room size|verwarmt)[^\d]{0,20}(\d{1,3}(?:[.,]\d)?(?:\s*(?:-|tot|to)\s*\d{1,3}(?:[.,]\d)?)?\s*(?:m²|m2|m³|m3))",
        ),
        spec_rule(
            Coverage,
            r"\b(\d{1,3}(?:[.,]\d)?(?:\s*(?:-|tot|to)\s*\d{1,3}(?:[.,]\d)?)?\s*(?:m²|m2|m³|m3))",
        ),
        spec_rule(Voltage, r"\b(\d{3})\s*(?:v|volt|vac)\b"),
        spec_rule(IpRating, r"\bip\s?-?(\d{2})\b"),
    ]
});

fn normalize_dimensions(raw: &str) -> String {
    raw.replace('×', "x")
        .split('x')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" x ")
}

pub fn find_specifications(lower_text: &str) -> Specifications {
    let mut specs = Specifications::default();

    for rule in SPEC_RULES.iter() {
        let already_set = match rule.field {
            SpecField::Wattage => specs.wattage.is_some(),
            SpecField::Dimensions => specs.dimensions.is_some(),
            SpecField::Weight => specs.weight.is_some(),
            SpecField::Coverage => specs.coverage.is_some(),
            SpecField::Voltage => specs.voltage.is_some(),
            SpecField::IpRating => specs.ip_rating.is_some(),
        };
        if already_set {
            continue;
        }

        let Some(raw) = rule
            .pattern
            .captures(lower_text)
            .and_then(|caps| caps.get(1))
            .map(|m| normalize_whitespace(m.as_str()))
        else {
            continue;
        };

        match rule.field {
            SpecField::Wattage => specs.wattage = raw.parse::<u32>().ok(),
            SpecField::Dimensions => specs.dimensions = Some(normalize_dimensions(&raw)),
            SpecField::Weight => specs.weight = Some(raw.replace(',', ".")),
            SpecField::Coverage => specs.coverage = Some(raw.replace("m2", "m²").replace("m3", "m³")),
            SpecField::Voltage => specs.voltage = Some(format!("{}V", raw)),
            SpecField::IpRating => specs.ip_rating = Some(format!("IP{}", raw)),
        }
    }

    specs
}
