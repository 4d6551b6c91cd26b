//! Checkout dialogue: the strictly-ordered data-collection conversation.
//!
//! The dialogue collects customer name, phone, and pickup-store code, one
//! field per step, validating each before advancing. Per-user transient
//! state lives in an explicit keyed record here, never in ambient
//! conversation context, and entering the dialogue always resets it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::instrument;

use dragonfruit_core::{CustomerName, PhoneNumber, Price, StoreCode, UserId};

use crate::config::ShopConfig;
use crate::notify::Notifier;
use crate::reply::ReplySink;
use crate::services::cart::CartService;
use crate::services::orders::{CheckoutFields, CommitError, CommitReceipt, OrderService};
use crate::services::validator::{CartIssue, CartValidator};
use crate::store::{ShopStore, StoreError};

/// The input a user types to abandon checkout at any step.
const CANCEL_KEYWORD: &str = "/cancel";

/// Which field the dialogue is waiting for.
///
/// Entry and commit are instantaneous transitions, not waiting states; a
/// user with no session is either before entry or past termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    CollectName,
    CollectPhone,
    CollectStore,
}

/// Current dialogue state plus the last validation error, for rendering
/// the next prompt.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueView {
    pub state: CheckoutState,
    pub last_error: Option<String>,
}

/// What one dialogue step produced.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Checkout entered; the name prompt was sent.
    Started { total: Price },
    /// A field was accepted and the next prompt sent.
    Advanced { state: CheckoutState },
    /// The input failed validation; same state, re-prompted.
    Invalid { state: CheckoutState, error: String },
    /// The order was committed.
    Completed { receipt: Box<CommitReceipt> },
    /// The validator found issues; checkout aborted, cart adjusted.
    Aborted { issues: Vec<CartIssue> },
    /// Stock ran out at the final check; checkout aborted.
    OutOfStock { product: String },
    /// An integrity failure; the user was asked to retry later.
    Failed,
    /// The user cancelled; collected fields discarded, cart untouched.
    Cancelled,
    /// The idle window elapsed; same discard semantics as cancel, but
    /// reported to the user as an expiry.
    Expired,
    /// The cart was empty at entry.
    EmptyCart,
    /// No dialogue in progress for this user.
    NoSession,
}

struct Session {
    state: CheckoutState,
    name: Option<CustomerName>,
    phone: Option<PhoneNumber>,
    last_error: Option<String>,
    last_activity: Instant,
}

impl Session {
    fn fresh() -> Self {
        Self {
            state: CheckoutState::CollectName,
            name: None,
            phone: None,
            last_error: None,
            last_activity: Instant::now(),
        }
    }
}

/// What to do after inspecting a session under the lock.
enum Step {
    Expired,
    Cancelled,
    Invalid { state: CheckoutState, error: String },
    Advanced { state: CheckoutState, prompt: String },
    Commit(CheckoutFields),
}

/// The multi-step checkout conversation, keyed by user.
pub struct CheckoutDialogue {
    cart: CartService,
    validator: CartValidator,
    orders: OrderService,
    notifier: Arc<dyn Notifier>,
    sessions: Mutex<HashMap<UserId, Session>>,
    idle_timeout: Duration,
}

impl CheckoutDialogue {
    /// Create a dialogue over `store`, committing through an internal
    /// [`OrderService`] configured from `config`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ShopStore>,
        notifier: Arc<dyn Notifier>,
        config: &ShopConfig,
    ) -> Self {
        Self {
            cart: CartService::new(store.clone(), config),
            validator: CartValidator::new(store.clone()),
            orders: OrderService::new(store, notifier.clone(), config),
            notifier,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: config.checkout_idle_timeout,
        }
    }

    /// Enter checkout: validate the cart and, if clean and non-empty,
    /// start collecting fields.
    ///
    /// Any previous session for this user is discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    #[instrument(skip(self, sink))]
    pub async fn begin(
        &self,
        user: UserId,
        sink: &dyn ReplySink,
    ) -> Result<CheckoutOutcome, StoreError> {
        self.drop_session(user);

        let issues = self.validator.validate(user).await?;
        if !issues.is_empty() {
            self.send_edit(sink, &issues_text(&issues)).await;
            return Ok(CheckoutOutcome::Aborted { issues });
        }

        let totals = self
            .cart
            .totals(user)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        if totals.is_empty() {
            self.send_edit(sink, "Your cart is empty, nothing to check out")
                .await;
            return Ok(CheckoutOutcome::EmptyCart);
        }

        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(user, Session::fresh());
        }

        let prompt = format!(
            "Checkout started\n\n\
             Order total: {}\n\n\
             Step 1/3\n\
             Please enter your name (2-20 letters):\n\n\
             Send {CANCEL_KEYWORD} at any time to stop",
            totals.total
        );
        self.send_edit(sink, &prompt).await;

        Ok(CheckoutOutcome::Started {
            total: totals.total,
        })
    }

    /// Feed one user input into the dialogue.
    ///
    /// Malformed input re-prompts the same state and mutates nothing.
    /// The cancel keyword, or an input arriving after the idle window,
    /// terminates the dialogue with the cart untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage failure.
    #[instrument(skip(self, input, sink))]
    pub async fn handle_input(
        &self,
        user: UserId,
        input: &str,
        sink: &dyn ReplySink,
    ) -> Result<CheckoutOutcome, StoreError> {
        let Some(step) = self.advance_session(user, input) else {
            return Ok(CheckoutOutcome::NoSession);
        };

        match step {
            Step::Expired => {
                self.send(sink, expiry_text()).await;
                Ok(CheckoutOutcome::Expired)
            }
            Step::Cancelled => {
                self.send(sink, "Checkout cancelled").await;
                Ok(CheckoutOutcome::Cancelled)
            }
            Step::Invalid { state, error } => {
                self.send(sink, &error).await;
                Ok(CheckoutOutcome::Invalid { state, error })
            }
            Step::Advanced { state, prompt } => {
                self.send(sink, &prompt).await;
                Ok(CheckoutOutcome::Advanced { state })
            }
            Step::Commit(fields) => self.commit(user, fields, sink).await,
        }
    }

    /// Explicitly cancel the user's dialogue, if one is in progress.
    pub async fn cancel(&self, user: UserId, sink: &dyn ReplySink) -> CheckoutOutcome {
        if !self.drop_session(user) {
            return CheckoutOutcome::NoSession;
        }
        self.send(sink, "Checkout cancelled").await;
        CheckoutOutcome::Cancelled
    }

    /// Current state and last error for this user, if a dialogue is in
    /// progress.
    #[must_use]
    pub fn view(&self, user: UserId) -> Option<DialogueView> {
        self.sessions.lock().ok().and_then(|sessions| {
            sessions.get(&user).map(|s| DialogueView {
                state: s.state,
                last_error: s.last_error.clone(),
            })
        })
    }

    /// Expire idle sessions and tell their owners.
    ///
    /// Intended to be called periodically by the host; returns how many
    /// sessions were reaped.
    pub async fn reap_expired(&self) -> usize {
        let expired: Vec<UserId> = match self.sessions.lock() {
            Ok(mut sessions) => {
                let stale: Vec<UserId> = sessions
                    .iter()
                    .filter(|(_, s)| s.last_activity.elapsed() > self.idle_timeout)
                    .map(|(user, _)| *user)
                    .collect();
                for user in &stale {
                    sessions.remove(user);
                }
                stale
            }
            Err(_) => Vec::new(),
        };

        for user in &expired {
            if let Err(e) = self.notifier.notify(*user, expiry_text()).await {
                tracing::warn!(user = %user, error = %e, "expiry notice delivery failed");
            }
        }

        expired.len()
    }

    /// Inspect and advance the session under the lock; no awaiting here.
    ///
    /// The session is taken out of the map and re-inserted only when the
    /// dialogue keeps waiting for input.
    fn advance_session(&self, user: UserId, input: &str) -> Option<Step> {
        let mut sessions = self.sessions.lock().ok()?;
        let mut session = sessions.remove(&user)?;

        if session.last_activity.elapsed() > self.idle_timeout {
            return Some(Step::Expired);
        }

        let input = input.trim();
        if input == CANCEL_KEYWORD {
            return Some(Step::Cancelled);
        }

        session.last_activity = Instant::now();

        let step = match session.state {
            CheckoutState::CollectName => match CustomerName::parse(input) {
                Ok(name) => {
                    let prompt = format!(
                        "Name: {name}\n\n\
                         Step 2/3\n\
                         Please enter your mobile number (e.g. 0912345678):"
                    );
                    session.name = Some(name);
                    session.state = CheckoutState::CollectPhone;
                    session.last_error = None;
                    Step::Advanced {
                        state: CheckoutState::CollectPhone,
                        prompt,
                    }
                }
                Err(e) => invalid(
                    &mut session,
                    format!("Invalid name: {e}\nPlease enter your name again:"),
                ),
            },
            CheckoutState::CollectPhone => match PhoneNumber::parse(input) {
                Ok(phone) => {
                    let prompt = format!(
                        "Phone: {phone}\n\n\
                         Step 3/3\n\
                         Please enter the 6-digit pickup store code:"
                    );
                    session.phone = Some(phone);
                    session.state = CheckoutState::CollectStore;
                    session.last_error = None;
                    Step::Advanced {
                        state: CheckoutState::CollectStore,
                        prompt,
                    }
                }
                Err(e) => invalid(
                    &mut session,
                    format!(
                        "Invalid phone number: {e}\nPlease enter a 10-digit mobile number (09xxxxxxxx):"
                    ),
                ),
            },
            CheckoutState::CollectStore => match StoreCode::parse(input) {
                Ok(store_code) => match (session.name.take(), session.phone.take()) {
                    (Some(customer_name), Some(customer_phone)) => Step::Commit(CheckoutFields {
                        customer_name,
                        customer_phone,
                        store_code,
                    }),
                    // Collected fields went missing; terminate rather
                    // than commit garbage.
                    _ => Step::Cancelled,
                },
                Err(e) => invalid(
                    &mut session,
                    format!("Invalid store code: {e}\nPlease enter the 6-digit store code:"),
                ),
            },
        };

        // Waiting states keep their session; terminal steps drop it.
        if matches!(step, Step::Advanced { .. } | Step::Invalid { .. }) {
            sessions.insert(user, session);
        }

        Some(step)
    }

    async fn commit(
        &self,
        user: UserId,
        fields: CheckoutFields,
        sink: &dyn ReplySink,
    ) -> Result<CheckoutOutcome, StoreError> {
        match self.orders.commit(user, fields).await {
            Ok(receipt) => {
                self.send(sink, &receipt.event.customer_message()).await;
                Ok(CheckoutOutcome::Completed {
                    receipt: Box::new(receipt),
                })
            }
            Err(e) => {
                self.send(sink, &e.user_message()).await;
                if matches!(
                    e,
                    CommitError::OrderNumberExhausted
                        | CommitError::Arithmetic
                        | CommitError::Store(_)
                ) {
                    tracing::error!(user = %user, error = %e, "checkout commit failed");
                }
                match e {
                    CommitError::CartChanged(issues) => Ok(CheckoutOutcome::Aborted { issues }),
                    CommitError::StockConflict { product } => {
                        Ok(CheckoutOutcome::OutOfStock { product })
                    }
                    CommitError::EmptyCart => Ok(CheckoutOutcome::EmptyCart),
                    CommitError::OrderNumberExhausted
                    | CommitError::Arithmetic
                    | CommitError::Store(_) => Ok(CheckoutOutcome::Failed),
                }
            }
        }
    }

    fn drop_session(&self, user: UserId) -> bool {
        self.sessions
            .lock()
            .map(|mut sessions| sessions.remove(&user).is_some())
            .unwrap_or(false)
    }

    /// Reply failures never abort the dialogue; the outcome carries the
    /// same information for the caller.
    async fn send(&self, sink: &dyn ReplySink, text: &str) {
        if let Err(e) = sink.reply(text).await {
            tracing::warn!(error = %e, "checkout reply delivery failed");
        }
    }

    async fn send_edit(&self, sink: &dyn ReplySink, text: &str) {
        if let Err(e) = sink.edit_or_reply(text).await {
            tracing::warn!(error = %e, "checkout reply delivery failed");
        }
    }
}

fn invalid(session: &mut Session, error: String) -> Step {
    session.last_error = Some(error.clone());
    Step::Invalid {
        state: session.state,
        error,
    }
}

fn issues_text(issues: &[CartIssue]) -> String {
    let mut text = "Your cart has changed:\n".to_owned();
    for issue in issues {
        text.push_str(&format!("\n- {issue}"));
    }
    text.push_str("\n\nPlease review your cart and try again");
    text
}

const fn expiry_text() -> &'static str {
    "Checkout expired due to inactivity. Your cart is untouched; start again when you're ready"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dragonfruit_core::ProductId;

    use super::*;
    use crate::models::NewProduct;
    use crate::notify::RecordingNotifier;
    use crate::reply::NotifierReply;
    use crate::store::MemoryStore;

    const USER: UserId = UserId::new(1);

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        dialogue: CheckoutDialogue,
        sink: NotifierReply,
        product_id: ProductId,
    }

    async fn fixture(idle_timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let config = ShopConfig {
            order_prefix: "DF".to_owned(),
            checkout_idle_timeout: idle_timeout,
            selection_ttl: Duration::from_secs(300),
            operator_ids: Vec::new(),
        };

        let product = store
            .insert_product(NewProduct {
                name: "Tea".to_owned(),
                price: Price::from_major(100),
                stock: 5,
                is_active: true,
                category_id: None,
                description: None,
            })
            .await
            .unwrap();

        let cart = CartService::new(store.clone(), &config);
        cart.add_item(USER, product.id, 2, &[]).await.unwrap();

        let dialogue = CheckoutDialogue::new(store.clone(), notifier.clone(), &config);
        let sink = NotifierReply::new(notifier.clone(), USER);

        Fixture {
            store,
            notifier,
            dialogue,
            sink,
            product_id: product.id,
        }
    }

    #[tokio::test]
    async fn test_begin_with_empty_cart_aborts() {
        let f = fixture(Duration::from_secs(600)).await;
        f.store.clear_cart(USER).await.unwrap();

        let outcome = f.dialogue.begin(USER, &f.sink).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::EmptyCart));
        assert!(f.dialogue.view(USER).is_none());
    }

    #[tokio::test]
    async fn test_malformed_input_keeps_state_and_cart() {
        let f = fixture(Duration::from_secs(600)).await;
        f.dialogue.begin(USER, &f.sink).await.unwrap();

        let outcome = f.dialogue.handle_input(USER, "x9!", &f.sink).await.unwrap();
        assert!(matches!(
            outcome,
            CheckoutOutcome::Invalid {
                state: CheckoutState::CollectName,
                ..
            }
        ));

        let view = f.dialogue.view(USER).unwrap();
        assert_eq!(view.state, CheckoutState::CollectName);
        assert!(view.last_error.is_some());

        // The cart is untouched by dialogue validation failures.
        assert_eq!(f.store.cart_lines(USER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fields_gate_advancement_in_order() {
        let f = fixture(Duration::from_secs(600)).await;
        f.dialogue.begin(USER, &f.sink).await.unwrap();

        let outcome = f.dialogue.handle_input(USER, "王小明", &f.sink).await.unwrap();
        assert!(matches!(
            outcome,
            CheckoutOutcome::Advanced {
                state: CheckoutState::CollectPhone
            }
        ));

        // A store code is not a phone number; the dialogue stays put.
        let outcome = f.dialogue.handle_input(USER, "123456", &f.sink).await.unwrap();
        assert!(matches!(
            outcome,
            CheckoutOutcome::Invalid {
                state: CheckoutState::CollectPhone,
                ..
            }
        ));

        let outcome = f
            .dialogue
            .handle_input(USER, "0912-345-678", &f.sink)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CheckoutOutcome::Advanced {
                state: CheckoutState::CollectStore
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_at_any_state_keeps_cart() {
        let f = fixture(Duration::from_secs(600)).await;

        for inputs in [vec![], vec!["王小明"], vec!["王小明", "0912345678"]] {
            f.dialogue.begin(USER, &f.sink).await.unwrap();
            for input in inputs {
                f.dialogue.handle_input(USER, input, &f.sink).await.unwrap();
            }

            let outcome = f.dialogue.handle_input(USER, "/cancel", &f.sink).await.unwrap();
            assert!(matches!(outcome, CheckoutOutcome::Cancelled));
            assert!(f.dialogue.view(USER).is_none());
            assert_eq!(f.store.cart_lines(USER).await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_reentry_resets_collected_fields() {
        let f = fixture(Duration::from_secs(600)).await;

        f.dialogue.begin(USER, &f.sink).await.unwrap();
        f.dialogue.handle_input(USER, "王小明", &f.sink).await.unwrap();

        // Starting over puts the dialogue back at the name step.
        f.dialogue.begin(USER, &f.sink).await.unwrap();
        let view = f.dialogue.view(USER).unwrap();
        assert_eq!(view.state, CheckoutState::CollectName);
    }

    #[tokio::test]
    async fn test_input_without_session_is_ignored() {
        let f = fixture(Duration::from_secs(600)).await;
        let outcome = f.dialogue.handle_input(USER, "hello", &f.sink).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::NoSession));
    }

    #[tokio::test]
    async fn test_idle_input_expires_distinct_from_cancel() {
        let f = fixture(Duration::from_millis(20)).await;
        f.dialogue.begin(USER, &f.sink).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let outcome = f.dialogue.handle_input(USER, "王小明", &f.sink).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Expired));
        assert!(f.dialogue.view(USER).is_none());
        assert_eq!(f.store.cart_lines(USER).await.unwrap().len(), 1);

        let last = f.notifier.sent_to(USER).pop().unwrap();
        assert!(last.contains("expired"));
    }

    #[tokio::test]
    async fn test_reap_expired_notifies_owner() {
        let f = fixture(Duration::from_millis(20)).await;
        f.dialogue.begin(USER, &f.sink).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(f.dialogue.reap_expired().await, 1);
        assert!(f.dialogue.view(USER).is_none());
        let last = f.notifier.sent_to(USER).pop().unwrap();
        assert!(last.contains("expired"));
    }

    #[tokio::test]
    async fn test_sold_out_at_entry_aborts_with_issue() {
        let f = fixture(Duration::from_secs(600)).await;

        let mut product = f.store.product(f.product_id).await.unwrap().unwrap();
        product.stock = 0;
        f.store.save_product(&product).await.unwrap();

        let outcome = f.dialogue.begin(USER, &f.sink).await.unwrap();
        let CheckoutOutcome::Aborted { issues } = outcome else {
            panic!("expected abort");
        };
        assert_eq!(issues.first().unwrap().to_string(), "Tea — sold out");

        // The line was removed and no dialogue started.
        assert!(f.store.cart_lines(USER).await.unwrap().is_empty());
        assert!(f.dialogue.view(USER).is_none());
    }
}
