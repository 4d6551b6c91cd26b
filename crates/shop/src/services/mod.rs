//! Services implementing the fulfillment core's operations.

pub mod cart;
pub mod checkout;
pub mod lifecycle;
pub mod orders;
pub mod selection;
pub mod validator;

pub use cart::{CartError, CartLineView, CartService, CartTotals, SelectionView};
pub use checkout::{CheckoutDialogue, CheckoutOutcome, CheckoutState, DialogueView};
pub use lifecycle::{LifecycleError, OrderLifecycle, TransitionReceipt};
pub use orders::{CheckoutFields, CommitError, CommitReceipt, OrderService};
pub use selection::SelectionRegistry;
pub use validator::{CartIssue, CartIssueKind, CartValidator};
