use crate::services::adapter::TargetAdapter;
use crate::services::session::TargetSession;
use reqwest::header::HeaderMap;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("state reset failed: {0}")]
    Reset(String),
    #[error("precondition setup failed: {0}")]
    Setup(String),
}

/// A named target-side baseline a validator needs before it can run.
pub enum Precondition {
    Authenticated,
    CartWithItem {
        product_id: u64,
        price: f64,
        quantity: i64,
    },
}

/// Receipt for an established baseline.
#[derive(Debug)]
pub struct Baseline {
    pub cart_items: usize,
}

/// Owns all mutable target-side state bookkeeping for a run.
///
/// Every rule runs against the baseline this manager establishes; `reset` is
/// idempotent and called before each rule so one rule's mutations never leak
/// into the next. A failed establishment step must leave the manager
/// resettable, never wedged.
pub struct StateManager {
    adapter: Box<dyn TargetAdapter>,
    logged_in: bool,
    cart_items: usize,
}

impl StateManager {
    pub fn new(adapter: Box<dyn TargetAdapter>) -> Self {
        StateManager {
            adapter,
            logged_in: false,
            cart_items: 0,
        }
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Returns the target to its observable baseline: empty cart, no applied
    /// coupons, no carried privilege. Calling it twice in a row is equivalent
    /// to calling it once.
    pub fn reset(&mut self, session: &mut TargetSession) -> Result<(), StateError> {
        // Local bookkeeping is cleared first so a failed remote reset still
        // leaves the manager in a retryable position.
        self.logged_in = false;
        self.cart_items = 0;
        session.clear_bearer();

        let resp = session
            .post(self.adapter.reset_path(), &json!({}))
            .map_err(|e| StateError::Reset(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StateError::Reset(format!(
                "reset endpoint returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub fn establish(
        &mut self,
        session: &mut TargetSession,
        precondition: Precondition,
    ) -> Result<Baseline, StateError> {
        match precondition {
            Precondition::Authenticated => {
                self.ensure_login(session)?;
            }
            Precondition::CartWithItem {
                product_id,
                price,
                quantity,
            } => {
                if self.adapter.requires_login() {
                    self.ensure_login(session)?;
                }
                let payload = self.adapter.add_item_payload(product_id, price, quantity);
                let resp = session
                    .post(self.adapter.add_item_path(), &payload)
                    .map_err(|e| StateError::Setup(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(StateError::Setup(format!(
                        "could not add item to cart (status {})",
                        resp.status()
                    )));
                }
                self.cart_items += 1;
            }
        }
        Ok(Baseline {
            cart_items: self.cart_items,
        })
    }

    /// Headers that carry privilege for the active profile, logging in first
    /// when the profile requires it.
    pub fn privileged(&mut self, session: &mut TargetSession) -> Result<HeaderMap, StateError> {
        if self.adapter.requires_login() {
            self.ensure_login(session)?;
        }
        Ok(self.adapter.privileged_headers())
    }

    fn ensure_login(&mut self, session: &mut TargetSession) -> Result<(), StateError> {
        if self.logged_in {
            return Ok(());
        }
        self.adapter.login(session)?;
        self.logged_in = true;
        Ok(())
    }
}
