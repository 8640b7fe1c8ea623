use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub rules: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_rules(standard_rules())
    }

    pub fn with_rules(rules: Value) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");

        let rules_path = tmp.path().join("rules.json");
        fs::write(
            &rules_path,
            serde_json::to_string_pretty(&rules).expect("serialize rules"),
        )
        .expect("write rules file");

        Self {
            _tmp: tmp,
            home,
            rules: rules_path,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("blvgate");
        cmd.env("HOME", &self.home)
            .env_remove("HTTP_PROXY")
            .env_remove("http_proxy")
            .env_remove("CI_RESULT_API")
            .env_remove("BLVGATE_EMAIL")
            .env_remove("BLVGATE_PASSWORD")
            .env_remove("GITHUB_RUN_ID")
            .env_remove("GITHUB_SHA")
            .env_remove("GITHUB_REF_NAME");
        cmd
    }

    pub fn run_json(&self, target: &str, expect_code: i32) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .arg("--rules")
            .arg(self.rules.to_str().expect("rules path utf8"))
            .arg(target)
            .assert()
            .code(expect_code)
            .get_output()
            .stdout
            .clone();
        let envelope: Value = serde_json::from_slice(&out).expect("valid json output");
        assert_eq!(envelope["ok"], true);
        envelope["data"].clone()
    }
}

pub fn standard_rules() -> Value {
    json!({
        "rules": [
            {"rule_id": "BLV-QTY-001", "name": "Quantity lower bound", "severity": "HIGH",
             "endpoint": "/add-to-cart", "expected_behavior": {"quantity_minimum": 1}},
            {"rule_id": "BLV-PRICE-001", "name": "Price positivity", "severity": "HIGH",
             "endpoint": "/add-to-cart"},
            {"rule_id": "BLV-QTY-002", "name": "Quantity upper bound", "severity": "MEDIUM",
             "endpoint": "/add-to-cart", "expected_behavior": {"quantity_maximum": 10}},
            {"rule_id": "BLV-CPN-001", "name": "Coupon single-use", "severity": "HIGH",
             "endpoint": "/apply-coupon", "test": {"coupon_code": "SAVE10"}},
            {"rule_id": "BLV-CPN-002", "name": "Coupon stacking cap", "severity": "MEDIUM",
             "endpoint": "/apply-coupon", "expected_behavior": {"max_discount_rate": 0.30}},
            {"rule_id": "BLV-WF-001", "name": "Checkout requires items", "severity": "CRITICAL",
             "endpoint": "/checkout"},
            {"rule_id": "BLV-AUTH-001", "name": "Admin report authorization",
             "severity": "CRITICAL", "endpoint": "/admin/report"}
        ]
    })
}

/// Enforcement toggles for the mock target. `secure()` models the fixed demo
/// app, `vulnerable()` the one that accepts everything.
#[derive(Clone, Copy)]
pub struct TargetOptions {
    pub reject_nonpositive_quantity: bool,
    pub reject_nonpositive_price: bool,
    pub quantity_maximum: Option<i64>,
    pub single_use_coupons: bool,
    pub discount_cap: Option<f64>,
    pub checkout_requires_items: bool,
    pub checkout_always_rejects: bool,
    pub guard_admin: bool,
}

impl TargetOptions {
    pub fn secure() -> Self {
        TargetOptions {
            reject_nonpositive_quantity: true,
            reject_nonpositive_price: true,
            quantity_maximum: Some(10),
            single_use_coupons: true,
            discount_cap: Some(0.30),
            checkout_requires_items: true,
            checkout_always_rejects: false,
            guard_admin: true,
        }
    }

    pub fn vulnerable() -> Self {
        TargetOptions {
            reject_nonpositive_quantity: false,
            reject_nonpositive_price: false,
            quantity_maximum: None,
            single_use_coupons: false,
            discount_cap: None,
            checkout_requires_items: false,
            checkout_always_rejects: false,
            guard_admin: false,
        }
    }
}

#[derive(Default)]
struct CartState {
    items: Vec<(f64, i64)>,
    applied_coupons: Vec<String>,
}

/// In-process HTTP target implementing the demo app's capability contract:
/// add-to-cart, apply-coupon, checkout, admin report, reset. One request per
/// connection, handled sequentially, which matches the runner's sequential
/// scheduling model.
pub struct MockTarget {
    addr: SocketAddr,
}

impl MockTarget {
    pub fn start(opts: TargetOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock target");
        let addr = listener.local_addr().expect("mock target addr");
        let state = Arc::new(Mutex::new(CartState::default()));

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let _ = handle(stream, &opts, &state);
            }
        });

        MockTarget { addr }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn handle(
    stream: TcpStream,
    opts: &TargetOptions,
    state: &Mutex<CartState>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut role = None;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(v) = lower.strip_prefix("content-length:") {
            content_length = v.trim().parse().unwrap_or(0);
        }
        if let Some(v) = lower.strip_prefix("x-role:") {
            role = Some(v.trim().to_string());
        }
        if let Some(v) = lower.strip_prefix("authorization:") {
            authorization = Some(v.trim().to_string());
        }
    }
    let mut raw_body = vec![0u8; content_length];
    reader.read_exact(&mut raw_body)?;
    let body: Value = serde_json::from_slice(&raw_body).unwrap_or(Value::Null);

    let request = Request {
        role: role.as_deref(),
        authorization: authorization.as_deref(),
        body,
    };
    let (status, payload) = route(opts, state, &method, &path, &request);
    let text = payload.to_string();
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{text}",
        text.len()
    )
}

pub const SHOP_EMAIL: &str = "ci@example.com";
pub const SHOP_PASSWORD: &str = "gate";
const SHOP_TOKEN: &str = "mock-token-1";

struct Request<'a> {
    role: Option<&'a str>,
    authorization: Option<&'a str>,
    body: Value,
}

fn coupon_rate(code: &str) -> Option<f64> {
    match code {
        "SAVE10" => Some(0.10),
        "SAVE20" => Some(0.20),
        _ => None,
    }
}

fn route(
    opts: &TargetOptions,
    state: &Mutex<CartState>,
    method: &str,
    path: &str,
    request: &Request<'_>,
) -> (u16, Value) {
    let body = &request.body;
    let mut cart = state.lock().expect("cart state lock");
    match (method, path) {
        ("POST", "/reset") | ("POST", "/rest/basket/reset") => {
            *cart = CartState::default();
            (200, json!({"status": "reset"}))
        }
        ("POST", "/rest/user/login") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            if email != SHOP_EMAIL || password != SHOP_PASSWORD {
                return (401, json!({"error": "invalid credentials"}));
            }
            (200, json!({"authentication": {"token": SHOP_TOKEN}}))
        }
        ("POST", "/api/BasketItems") => {
            let expected = format!("bearer {SHOP_TOKEN}");
            if request.authorization != Some(expected.as_str()) {
                return (401, json!({"error": "no valid token"}));
            }
            let quantity = body["quantity"].as_i64().unwrap_or(0);
            cart.items.push((100.0, quantity));
            (200, json!({"status": "success"}))
        }
        ("POST", "/add-to-cart") => {
            let price = body["price"].as_f64().unwrap_or(0.0);
            let quantity = body["quantity"].as_i64().unwrap_or(0);
            if opts.reject_nonpositive_quantity && quantity < 1 {
                return (400, json!({"error": "invalid quantity"}));
            }
            if opts.reject_nonpositive_price && price <= 0.0 {
                return (400, json!({"error": "invalid price"}));
            }
            if let Some(max) = opts.quantity_maximum {
                if quantity > max {
                    return (400, json!({"error": "quantity above maximum"}));
                }
            }
            cart.items.push((price, quantity));
            (200, json!({"total": price * quantity as f64}))
        }
        ("POST", "/apply-coupon") => {
            let code = body["coupon_code"].as_str().unwrap_or_default().to_string();
            let Some(_) = coupon_rate(&code) else {
                return (400, json!({"error": "unknown coupon"}));
            };
            if cart.items.is_empty() {
                return (400, json!({"error": "cart is empty"}));
            }
            if opts.single_use_coupons && cart.applied_coupons.contains(&code) {
                return (400, json!({"error": "coupon already used"}));
            }
            cart.applied_coupons.push(code);

            let subtotal: f64 = cart.items.iter().map(|(p, q)| p * *q as f64).sum();
            let mut rate: f64 = cart
                .applied_coupons
                .iter()
                .filter_map(|c| coupon_rate(c))
                .sum();
            if let Some(cap) = opts.discount_cap {
                rate = rate.min(cap);
            }
            (
                200,
                json!({"cart": {"subtotal": subtotal, "discount": subtotal * rate}}),
            )
        }
        ("POST", "/checkout") => {
            if opts.checkout_always_rejects {
                return (400, json!({"error": "checkout disabled"}));
            }
            if opts.checkout_requires_items && cart.items.is_empty() {
                return (400, json!({"error": "cart is empty"}));
            }
            (200, json!({"order_id": 1}))
        }
        ("GET", "/admin/report") => {
            if opts.guard_admin && request.role != Some("admin") {
                return (403, json!({"error": "forbidden"}));
            }
            (200, json!({"report": {"orders": cart.items.len()}}))
        }
        _ => (404, json!({"error": "not found"})),
    }
}
