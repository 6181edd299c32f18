use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use predicates::prelude::*;

const PRODUCTS_JSON: &str = r#"{
  "metadata": {
    "source": "https://www.heatshop.nl",
    "startedAt": "2026-10-19T10:00:00Z",
    "finishedAt": "2026-10-19T10:05:00Z",
    "totalProducts": 2,
    "categories": { "Infrared Panels": 1, "Mirror Heaters": 1 },
    "priceRange": { "min": 249.0, "max": 349.95 },
    "wattageRange": { "min": 450, "max": 600 },
    "generatedValues": 1,
    "errors": []
  },
  "products": [
    {
      "id": "panel-heater-600w",
      "name": "Panel Heater 600W",
      "sku": "PAN-600W",
      "category": "Infrared Panels",
      "url": "https://www.heatshop.nl/infrarood-panelen/panel-heater-600w",
      "price": 349.95,
      "stock": 12,
      "description": "Slim infrared panel.",
      "specifications": { "wattage": 600, "ipRating": "IP44" },
      "images": [],
      "variants": [
        { "name": "Panel Heater 600W", "sku": "PAN-600W", "price": 349.95, "stock": 12, "wattage": 600, "isDefault": true }
      ],
      "scrapedAt": "2026-10-19T10:01:00Z"
    },
    {
      "id": "mirror-heater-450w",
      "name": "Mirror Heater 450W",
      "sku": "MIR-450W",
      "category": "Mirror Heaters",
      "url": "https://www.heatshop.nl/infrarood-spiegelpanelen/mirror-heater-450w",
      "price": 249.0,
      "stock": 3,
      "description": "Mirror with a heating element.",
      "specifications": { "wattage": 450 },
      "images": [],
      "variants": [
        { "name": "Mirror Heater 450W", "sku": "MIR-450W", "price": 249.0, "stock": 3, "wattage": 450, "isDefault": true }
      ],
      "generatedFields": ["stock"],
      "scrapedAt": "2026-10-19T10:02:00Z"
    }
  ]
}"#;

fn write_products(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("crystallize-products.json");
    fs::write(&path, PRODUCTS_JSON).expect("write products file");
    path
}

#[test]
fn list_prints_products_and_stats() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let products = write_products(temp.path());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["--log-level", "off", "list"])
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("Panel Heater 600W [PAN-600W]"))
        .stdout(predicate::str::contains("Mirror Heater 450W [MIR-450W]"))
        .stdout(predicate::str::contains("Total:"));
}

#[test]
fn list_filters_by_price_as_json() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let products = write_products(temp.path());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    let output = cmd
        .args(["--log-level", "off", "list"])
        .arg(&products)
        .args(["--min-price", "300", "-o", "json"])
        .output()
        .expect("run heatshop");

    assert!(output.status.success());
    let listed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is json");
    let listed = listed.as_array().expect("json array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], "panel-heater-600w");
}

#[test]
fn list_rejects_inverted_price_range() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let products = write_products(temp.path());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["list"])
        .arg(&products)
        .args(["--min-price", "500", "--max-price", "100"])
        .assert()
        .failure();
}

#[test]
fn export_writes_import_file() {
    let temp = tempfile::TempDir::new().expect("tempdir");
    let products = write_products(temp.path());
    let import = temp.path().join("crystallize-import.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["--log-level", "off", "export"])
        .arg(&products)
        .arg("--output")
        .arg(&import)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 import item(s)"));

    let json = fs::read_to_string(&import).expect("read import file");
    let entries: serde_json::Value = serde_json::from_str(&json).expect("import is json");
    assert_eq!(entries.as_array().map(Vec::len), Some(2));
    assert_eq!(
        entries[0]["catalogueItem"]["tree"]["path"],
        "/heaters/infrared-panels/panel-heater-600w"
    );
    assert_eq!(entries[1]["catalogueItem"]["shape"], "infrared-heater");
}

#[test]
fn missing_products_file_fails() {
    let temp = tempfile::TempDir::new().expect("tempdir");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["list"])
        .arg(temp.path().join("nope.json"))
        .assert()
        .failure();
}

#[test]
fn scrape_rejects_malformed_category() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["scrape", "--category", "no-path-here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name=/path"));
}

struct Shop {
    base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Shop {
    fn spawn(pages: Vec<(&str, String)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start shop server");
        let base_url = format!("http://{}", server.server_addr());
        let pages: HashMap<String, String> = pages
            .into_iter()
            .map(|(path, body)| (path.to_string(), body))
            .collect();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                let request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                let response = match pages.get(request.url()) {
                    Some(body) => tiny_http::Response::from_string(body.clone()),
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for Shop {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn scrape_writes_both_files_despite_failed_product() {
    let listing = r#"<html><body><ul class="products">
<li class="product"><a class="woocommerce-LoopProduct-link" href="/panels/slim-600">Slim</a></li>
<li class="product"><a class="woocommerce-LoopProduct-link" href="/panels/gone">Gone</a></li>
</ul></body></html>"#;
    let product = r#"<html><head><title>Slim Panel 600W | Shop</title></head><body>
<h1 class="product_title">Slim Panel 600W</h1>
<p class="price"><span class="amount">€ 349,95</span></p>
<table><tr><th>Vermogen</th><td>600 Watt</td></tr></table>
</body></html>"#;
    let shop = Shop::spawn(vec![
        ("/panels", listing.to_string()),
        ("/panels/slim-600", product.to_string()),
    ]);

    let temp = tempfile::TempDir::new().expect("tempdir");
    let products = temp.path().join("crystallize-products.json");
    let import = temp.path().join("crystallize-import.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["--log-level", "off", "scrape", "--base-url", &shop.base_url])
        .args(["--category", "Infrared Panels=/panels"])
        .args(["--delay-ms", "0", "--retry-delay-ms", "0", "--max-attempts", "2"])
        .args(["--seed", "7", "--output"])
        .arg(&products)
        .arg("--import-output")
        .arg(&import)
        .assert()
        .success()
        .stdout(predicate::str::contains("Scraped: 1 product(s)"))
        .stdout(predicate::str::contains("Failed:  1"));

    let catalogue: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&products).expect("read products file"))
            .expect("products file is json");
    assert_eq!(catalogue["metadata"]["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(catalogue["metadata"]["errors"][0]["stage"], "product");
    assert_eq!(catalogue["metadata"]["errors"][0]["attempts"], 2);
    assert_eq!(catalogue["products"][0]["name"], "Slim Panel 600W");
    assert_eq!(catalogue["products"][0]["price"], 349.95);

    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&import).expect("read import file"))
            .expect("import file is json");
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["catalogueItem"]["externalReference"], "slim-panel-600w");
}

#[test]
fn scrape_with_huge_delay_fails_cleanly_on_bad_config() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("heatshop");
    cmd.args(["--log-level", "off", "scrape", "--base-url", "not a url"])
        .args(["--delay-ms", "18446744073709551615"])
        .assert()
        .code(1);
}
