//! Order status state machine.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Statuses advance along `pending → confirmed → shipped → arrived →
/// completed`. Forward jumps are allowed (an operator may ship a pending
/// order directly); moving backwards is not. `cancelled` is reachable from
/// `pending` and `confirmed` only. `completed` and `cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Arrived,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Position along the fulfillment chain; `None` for `cancelled`.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Shipped => Some(2),
            Self::Arrived => Some(3),
            Self::Completed => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Whether no further transitions are allowed out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a transition from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Cancelled => matches!(self, Self::Pending | Self::Confirmed),
            _ => match (self.rank(), next.rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Shipped => write!(f, "shipped"),
            Self::Arrived => write!(f, "arrived"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "arrived" => Ok(Self::Arrived),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Arrived));
        assert!(OrderStatus::Arrived.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Arrived.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_cancellation_reachability() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_from_str_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Arrived,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
