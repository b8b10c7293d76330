//! Wallet documents: balance aggregates, lots and history records.

use purse_shared::types::{HistoryId, ItemId, LotId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::Kind;

/// Balance aggregate for one (user, kind) pair.
///
/// `amount` always equals the sum of the remaining amounts of the user's
/// lots of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Deterministic id, see [`ItemId::for_owner`].
    pub id: ItemId,
    /// Owner.
    pub user_id: String,
    /// Currency kind.
    pub kind: Kind,
    /// Current balance.
    pub amount: Decimal,
    /// Lifetime credits.
    pub total_give: Decimal,
    /// Lifetime debits.
    pub total_use: Decimal,
    /// Creation time (epoch millis).
    pub created_at: i64,
    /// Last update time (epoch millis).
    pub updated_at: i64,
}

impl Item {
    /// A zero balance for a pair that has never been touched.
    #[must_use]
    pub fn zero(user_id: &str, kind: Kind, now: i64) -> Self {
        Self {
            id: ItemId::for_owner(user_id, kind.as_str()),
            user_id: user_id.to_string(),
            kind,
            amount: Decimal::ZERO,
            total_give: Decimal::ZERO,
            total_use: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a signed net movement to the aggregate.
    ///
    /// Credits raise `total_give`, debits raise `total_use` by their
    /// absolute value.
    pub fn apply_delta(&mut self, delta: Decimal, now: i64) {
        self.amount += delta;
        if delta.is_sign_positive() {
            self.total_give += delta;
        } else {
            self.total_use -= delta;
        }
        self.updated_at = now;
    }
}

/// A credited lot, consumed oldest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    /// Lot id (time-ordered).
    pub id: LotId,
    /// Owner.
    pub user_id: String,
    /// Currency kind.
    pub kind: Kind,
    /// Remaining amount, never above `initial_amount`.
    pub amount: Decimal,
    /// Amount originally credited.
    pub initial_amount: Decimal,
    /// Creation time; defines FIFO order.
    pub created_at: i64,
    /// Last time the lot was drawn from.
    pub updated_at: i64,
    /// Expiry flag, kept for audit.
    pub expired: bool,
}

impl ItemDetail {
    /// A fresh lot holding `amount`.
    #[must_use]
    pub fn credit(user_id: &str, kind: Kind, amount: Decimal, now: i64) -> Self {
        Self {
            id: LotId::new(),
            user_id: user_id.to_string(),
            kind,
            amount,
            initial_amount: amount,
            created_at: now,
            updated_at: now,
            expired: false,
        }
    }

    /// FIFO sort key.
    #[must_use]
    pub fn fifo_key(&self) -> (i64, LotId) {
        (self.created_at, self.id)
    }
}

/// Free-form metadata attached to every history row of one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryMeta {
    /// Arbitrary caller data; empty when not provided.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Human-readable reason.
    #[serde(default)]
    pub comment: String,
}

impl HistoryMeta {
    /// Metadata with a comment and no data.
    #[must_use]
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            data: Map::new(),
            comment: comment.into(),
        }
    }

    /// Adds caller data; `None` keeps the empty map.
    #[must_use]
    pub fn with_data(mut self, data: Option<Map<String, Value>>) -> Self {
        self.data = data.unwrap_or_default();
        self
    }
}

/// Immutable signed audit record of one movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemHistory {
    /// Record id (time-ordered).
    pub id: HistoryId,
    /// Owner.
    pub user_id: String,
    /// Currency kind.
    pub kind: Kind,
    /// Positive for credits, negative for debits.
    pub amount: Decimal,
    /// Caller metadata.
    pub data: Map<String, Value>,
    /// Caller comment.
    pub comment: String,
    /// Creation time (epoch millis).
    pub created_at: i64,
}

impl ItemHistory {
    /// Records a signed movement.
    #[must_use]
    pub fn record(
        user_id: &str,
        kind: Kind,
        amount: Decimal,
        meta: &HistoryMeta,
        now: i64,
    ) -> Self {
        Self {
            id: HistoryId::new(),
            user_id: user_id.to_string(),
            kind,
            amount,
            data: meta.data.clone(),
            comment: meta.comment.clone(),
            created_at: now,
        }
    }
}

/// Result of checking an aggregate against its lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Currency kind checked.
    pub kind: Kind,
    /// Balance on the aggregate (zero when it does not exist).
    pub item_amount: Decimal,
    /// Sum of remaining lot amounts.
    pub lot_total: Decimal,
    /// Number of lots, zeroed ones included.
    pub lot_count: usize,
    /// Whether both sides agree.
    pub consistent: bool,
}

impl Reconciliation {
    /// Compares an aggregate with the lots of the same pair.
    #[must_use]
    pub fn check(kind: Kind, item: Option<&Item>, lots: &[ItemDetail]) -> Self {
        let item_amount = item.map_or(Decimal::ZERO, |item| item.amount);
        let lot_total: Decimal = lots.iter().map(|lot| lot.amount).sum();
        Self {
            kind,
            item_amount,
            lot_total,
            lot_count: lots.len(),
            consistent: item_amount == lot_total,
        }
    }
}
