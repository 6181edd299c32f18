use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub fail_first: usize,
}

impl Route {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            fail_first: 0,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "error".to_string(),
            fail_first: 0,
        }
    }

    pub fn flaky(fail_first: usize, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            fail_first,
        }
    }
}

pub struct ShopStub {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ShopStub {
    pub fn spawn(routes: Vec<(&str, Route)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start shop stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: HashMap<String, Route> = routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect();
        let hits = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
        let server_hits = Arc::clone(&hits);

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

                let path = request.url().to_string();
                let count = {
                    let mut hits = server_hits.lock().expect("hits lock");
                    let count = hits.entry(path.clone()).or_insert(0);
                    *count += 1;
                    *count
                };

                let response = match routes.get(&path) {
                    Some(route) if count <= route.fail_first => {
                        tiny_http::Response::from_string("temporarily unavailable")
                            .with_status_code(500)
                    }
                    Some(route) => {
                        let header = tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/html; charset=utf-8"[..],
                        )
                        .expect("build header");
                        tiny_http::Response::from_string(route.body.clone())
                            .with_status_code(route.status)
                            .with_header(header)
                    }
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };

                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for ShopStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn listing_page(links: &[&str], next: Option<&str>) -> String {
    let items: String = links
        .iter()
        .map(|href| {
            format!(
                r#"<li class="product"><a class="woocommerce-LoopProduct-link" href="{href}">item</a></li>"#
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next page-numbers" href="{href}">next</a>"#))
        .unwrap_or_default();
    format!(
        "<!doctype html><html><head><title>Listing</title></head><body><ul class=\"products\">{items}</ul>{next}</body></html>"
    )
}

pub fn product_page(name: &str, price: &str, wattage: u32) -> String {
    format!(
        r#"<!doctype html><html><head><title>{name} | Shop</title></head><body>
<h1 class="product_title">{name}</h1>
<p class="price"><span class="amount">{price}</span></p>
<div itemprop="description">{name} for living rooms.</div>
<table><tr><th>Vermogen</th><td>{wattage} Watt</td></tr></table>
</body></html>"#
    )
}
