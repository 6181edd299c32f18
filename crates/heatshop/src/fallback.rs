use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const PRICE_RANGE: (u32, u32) = (200, 700);
pub const STOCK_RANGE: (u32, u32) = (0, 50);

// (wattage, width mm, height mm, weight kg)
const PANEL_SIZES: &[(u32, u32, u32, f32)] = &[
    (300, 600, 500, 6.5),
    (450, 900, 600, 8.0),
    (600, 1200, 600, 11.0),
    (800, 1200, 800, 14.5),
    (1000, 1500, 800, 17.0),
    (1200, 1800, 800, 20.5),
];

const PANEL_DEPTH_MM: u32 = 25;

pub fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn dummy_price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let euros = rng.gen_range(PRICE_RANGE.0..=PRICE_RANGE.1);
    f64::from(euros)
}

pub fn dummy_stock<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(STOCK_RANGE.0..=STOCK_RANGE.1)
}

pub fn dummy_wattage<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    PANEL_SIZES
        .choose(rng)
        .map(|(wattage, ..)| *wattage)
        .unwrap_or(600)
}

fn closest_panel(wattage: u32) -> (u32, u32, u32, f32) {
    PANEL_SIZES
        .iter()
        .copied()
        .min_by_key(|(w, ..)| w.abs_diff(wattage))
        .unwrap_or((600, 1200, 600, 11.0))
}

pub fn dummy_dimensions(wattage: u32) -> String {
    let (_, width, height, _) = closest_panel(wattage);
    format!("{} x {} x {} mm", width, height, PANEL_DEPTH_MM)
}

pub fn dummy_weight(wattage: u32) -> String {
    let (.., weight) = closest_panel(wattage);
    format!("{:.1} kg", weight)
}

pub fn dummy_description(name: &str) -> String {
    format!("{} infrared heater", name)
}
