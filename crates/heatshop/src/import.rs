use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::output::OutputError;
use crate::types::{Product, ProductVariant, Specifications};
use crate::utils::generate_id;

pub const SHAPE: &str = "infrared-heater";
pub const LANGUAGE: &str = "en";
pub const TREE_ROOT: &str = "/heaters";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    pub catalogue_item: CatalogueItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueItem {
    pub name: String,
    pub shape: String,
    pub language: String,
    pub external_reference: String,
    pub tree: TreePosition,
    pub components: BTreeMap<String, ComponentContent>,
    pub variants: Vec<ImportVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePosition {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentContent {
    SingleLine {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    RichText {
        plain_text: Vec<String>,
    },
    Numeric {
        number: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    PropertiesTable {
        sections: Vec<PropertiesSection>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesSection {
    pub title: String,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportVariant {
    pub name: String,
    pub sku: String,
    pub is_default: bool,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub images: Vec<ImportImage>,
    pub attributes: Vec<VariantAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportImage {
    pub src: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttribute {
    pub attribute: String,
    pub value: String,
}

fn specification_properties(specs: &Specifications) -> Vec<Property> {
    let wattage = specs.wattage.map(|w| format!("{}W", w));
    [
        ("Wattage", wattage.as_ref()),
        ("Dimensions", specs.dimensions.as_ref()),
        ("Weight", specs.weight.as_ref()),
        ("Coverage", specs.coverage.as_ref()),
        ("Voltage", specs.voltage.as_ref()),
        ("IP rating", specs.ip_rating.as_ref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        value.map(|v| Property {
            key: key.to_string(),
            value: v.clone(),
        })
    })
    .collect()
}

fn import_variant(variant: &ProductVariant, images: &[ImportImage]) -> ImportVariant {
    ImportVariant {
        name: variant.name.clone(),
        sku: variant.sku.clone(),
        is_default: variant.is_default,
        price: variant.price,
        stock: variant.stock,
        images: images.to_vec(),
        attributes: variant
            .attributes
            .iter()
            .map(|(attribute, value)| VariantAttribute {
                attribute: attribute.clone(),
                value: value.clone(),
            })
            .collect(),
    }
}

pub fn catalogue_item(product: &Product) -> CatalogueItem {
    let mut components = BTreeMap::new();

    if !product.description.is_empty() {
        let paragraphs = vec![product.description.clone()];
        components.insert(
            "description".to_string(),
            ComponentContent::RichText {
                plain_text: paragraphs,
            },
        );
    }

    components.insert(
        "category".to_string(),
        ComponentContent::SingleLine {
            text: product.category.clone(),
        },
    );

    if let Some(wattage) = product.specifications.wattage {
        components.insert(
            "wattage".to_string(),
            ComponentContent::Numeric {
                number: f64::from(wattage),
                unit: Some("W".to_string()),
            },
        );
    }

    let properties = specification_properties(&product.specifications);
    if !properties.is_empty() {
        components.insert(
            "specifications".to_string(),
            ComponentContent::PropertiesTable {
                sections: vec![PropertiesSection {
                    title: "Specifications".to_string(),
                    properties,
                }],
            },
        );
    }

    let images: Vec<ImportImage> = product
        .images
        .iter()
        .map(|image| ImportImage {
            src: image.url.clone(),
            alt_text: image.alt_text.clone(),
        })
        .collect();

    CatalogueItem {
        name: product.name.clone(),
        shape: SHAPE.to_string(),
        language: LANGUAGE.to_string(),
        external_reference: product.id.clone(),
        tree: TreePosition {
            path: format!(
                "{}/{}/{}",
                TREE_ROOT,
                generate_id(&product.category),
                product.id
            ),
        },
        components,
        variants: product
            .variants
            .iter()
            .map(|variant| import_variant(variant, &images))
            .collect(),
    }
}

pub fn build_import(products: &[Product]) -> Vec<ImportEntry> {
    products
        .iter()
        .map(|product| ImportEntry {
            catalogue_item: catalogue_item(product),
        })
        .collect()
}

pub fn write_import(path: impl AsRef<Path>, entries: &[ImportEntry]) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path.as_ref(), json)
        .inspect_err(|e| log::error!("Failed to write {}: {e}", path.as_ref().display()))?;
    log::info!(
        "Wrote {} import item(s) to {}",
        entries.len(),
        path.as_ref().display()
    );
    Ok(())
}
