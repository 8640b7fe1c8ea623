use crate::cli::Profile;
use crate::services::session::TargetSession;
use crate::services::state::StateError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};

/// Capability contract for one target profile.
///
/// Everything profile-specific — precondition endpoints, the login flow,
/// the add-item payload shape, how a privileged request is decorated —
/// lives behind this trait so the validators stay target-agnostic.
pub trait TargetAdapter {
    fn name(&self) -> &'static str;
    fn reset_path(&self) -> &'static str;
    fn add_item_path(&self) -> &'static str;
    fn requires_login(&self) -> bool;
    fn login(&self, session: &mut TargetSession) -> Result<(), StateError>;
    fn add_item_payload(&self, product_id: u64, price: f64, quantity: i64) -> Value;
    fn privileged_headers(&self) -> HeaderMap;
}

pub fn for_profile(profile: &Profile) -> Box<dyn TargetAdapter> {
    match profile {
        Profile::Demo => Box::new(DemoAdapter),
        Profile::Shop => Box::new(ShopAdapter),
    }
}

/// The generic demo application: flat JSON cart endpoints, no login,
/// admin access granted by a role header.
pub struct DemoAdapter;

impl TargetAdapter for DemoAdapter {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn reset_path(&self) -> &'static str {
        "/reset"
    }

    fn add_item_path(&self) -> &'static str {
        "/add-to-cart"
    }

    fn requires_login(&self) -> bool {
        false
    }

    fn login(&self, _session: &mut TargetSession) -> Result<(), StateError> {
        Ok(())
    }

    fn add_item_payload(&self, product_id: u64, price: f64, quantity: i64) -> Value {
        json!({"product_id": product_id, "price": price, "quantity": quantity})
    }

    fn privileged_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            HeaderName::from_static("x-role"),
            HeaderValue::from_static("admin"),
        );
        h
    }
}

/// The e-commerce reference application: credential login yielding a bearer
/// token, basket-item REST resources, token-gated admin surface.
pub struct ShopAdapter;

impl TargetAdapter for ShopAdapter {
    fn name(&self) -> &'static str {
        "shop"
    }

    fn reset_path(&self) -> &'static str {
        "/rest/basket/reset"
    }

    fn add_item_path(&self) -> &'static str {
        "/api/BasketItems"
    }

    fn requires_login(&self) -> bool {
        true
    }

    fn login(&self, session: &mut TargetSession) -> Result<(), StateError> {
        let email = std::env::var("BLVGATE_EMAIL")
            .map_err(|_| StateError::Setup("BLVGATE_EMAIL not set for shop profile".into()))?;
        let password = std::env::var("BLVGATE_PASSWORD")
            .map_err(|_| StateError::Setup("BLVGATE_PASSWORD not set for shop profile".into()))?;

        let resp = session
            .post("/rest/user/login", &json!({"email": email, "password": password}))
            .map_err(|e| StateError::Setup(format!("login call failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(StateError::Setup(format!(
                "login rejected (status {})",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .map_err(|e| StateError::Setup(format!("login response unparsable: {e}")))?;
        let token = body
            .pointer("/authentication/token")
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::Setup("login response missing token".into()))?;
        session.set_bearer(token.to_string());
        Ok(())
    }

    fn add_item_payload(&self, product_id: u64, _price: f64, quantity: i64) -> Value {
        json!({"ProductId": product_id, "BasketId": 1, "quantity": quantity})
    }

    fn privileged_headers(&self) -> HeaderMap {
        // Privilege rides on the session bearer token installed by login.
        HeaderMap::new()
    }
}
