//! Wallet service: computes the writes of Give / Use / Exchange.
//!
//! The service is pure. Callers read the current aggregates and lots inside
//! their transaction, ask the service for a [`WalletPlan`], then stage every
//! write of the plan on that same transaction. Nothing here commits, so a
//! failed plan leaves no trace once the transaction is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::clock::{Clock, SystemClock};
use super::consumption::consume_fifo;
use super::error::WalletError;
use super::item::{HistoryMeta, Item, ItemDetail, ItemHistory};
use super::kind::Kind;

/// Writes computed for one wallet call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletPlan {
    /// Balances of every kind named by the call, after the call.
    pub items: BTreeMap<Kind, Item>,
    /// Net movement per kind. Only these aggregates need to be written.
    pub deltas: BTreeMap<Kind, Decimal>,
    /// Lots to create.
    pub new_lots: Vec<ItemDetail>,
    /// Existing lots whose remaining amount changed.
    pub updated_lots: Vec<ItemDetail>,
    /// Audit rows, in the order they should be written.
    pub histories: Vec<ItemHistory>,
}

impl WalletPlan {
    /// True when the call moves nothing and nothing must be written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Aggregates that changed and must be persisted.
    pub fn changed_items(&self) -> impl Iterator<Item = &Item> {
        self.deltas.keys().filter_map(|kind| self.items.get(kind))
    }

    fn credit(
        &mut self,
        user_id: &str,
        kind: Kind,
        amount: Decimal,
        meta: &HistoryMeta,
        now: i64,
    ) {
        self.new_lots
            .push(ItemDetail::credit(user_id, kind, amount, now));
        *self.deltas.entry(kind).or_default() += amount;
        self.histories
            .push(ItemHistory::record(user_id, kind, amount, meta, now));
    }

    fn debit(
        &mut self,
        user_id: &str,
        kind: Kind,
        amount: Decimal,
        mut lots: Vec<ItemDetail>,
        meta: &HistoryMeta,
        now: i64,
    ) -> Result<(), WalletError> {
        let touched = consume_fifo(kind, &mut lots, amount, now)?;
        self.updated_lots
            .extend(touched.into_iter().map(|index| lots[index].clone()));
        // The net movement is the requested amount; the walk only decides
        // which lots absorb it.
        *self.deltas.entry(kind).or_default() -= amount;
        self.histories
            .push(ItemHistory::record(user_id, kind, -amount, meta, now));
        Ok(())
    }

    fn apply_deltas(&mut self, now: i64) -> Result<(), WalletError> {
        for (kind, delta) in &self.deltas {
            let item = self.items.get_mut(kind).ok_or_else(|| {
                WalletError::CorruptState(format!("no aggregate staged for {kind}"))
            })?;
            item.apply_delta(*delta, now);
            if item.amount < Decimal::ZERO {
                return Err(WalletError::CorruptState(format!(
                    "{kind} balance of {} would become {}",
                    item.user_id, item.amount
                )));
            }
        }
        Ok(())
    }
}

/// Wallet service for planning balance mutations.
#[derive(Clone)]
pub struct WalletService {
    clock: Arc<dyn Clock>,
}

impl Default for WalletService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService").finish_non_exhaustive()
    }
}

impl WalletService {
    /// Creates a service stamping documents with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current time in epoch milliseconds.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Keeps only the strictly positive entries.
    #[must_use]
    pub fn positive_amounts(amounts: &BTreeMap<Kind, Decimal>) -> BTreeMap<Kind, Decimal> {
        amounts
            .iter()
            .filter(|(_, amount)| **amount > Decimal::ZERO)
            .map(|(kind, amount)| (*kind, *amount))
            .collect()
    }

    /// Returns one aggregate per requested kind, synthesizing zero balances
    /// for kinds the user never touched. Synthesized aggregates are not
    /// persisted by this call.
    #[must_use]
    pub fn fill_items(
        user_id: &str,
        kinds: impl IntoIterator<Item = Kind>,
        existing: Vec<Item>,
        now: i64,
    ) -> BTreeMap<Kind, Item> {
        let mut by_kind: BTreeMap<Kind, Item> =
            existing.into_iter().map(|item| (item.kind, item)).collect();
        let mut items = BTreeMap::new();
        for kind in kinds {
            if items.contains_key(&kind) {
                continue;
            }
            let item = by_kind
                .remove(&kind)
                .unwrap_or_else(|| Item::zero(user_id, kind, now));
            items.insert(kind, item);
        }
        items
    }

    /// Plans a credit: one new lot and one `+amount` history row per kind
    /// with a positive amount. Other entries are ignored.
    ///
    /// # Errors
    ///
    /// `CorruptState` if a stored aggregate would turn negative.
    pub fn plan_give(
        &self,
        user_id: &str,
        amounts: &BTreeMap<Kind, Decimal>,
        existing: Vec<Item>,
        meta: &HistoryMeta,
    ) -> Result<WalletPlan, WalletError> {
        let now = self.now();
        let mut plan = WalletPlan {
            items: Self::fill_items(user_id, amounts.keys().copied(), existing, now),
            ..WalletPlan::default()
        };

        for (kind, amount) in Self::positive_amounts(amounts) {
            plan.credit(user_id, kind, amount, meta, now);
        }

        plan.apply_deltas(now)?;
        Ok(plan)
    }

    /// Plans a FIFO debit of every positive entry of `amounts`.
    ///
    /// `lots` holds the user's lots per kind; a kind with no entry has no
    /// lots. Kinds are debited in order and the first one that cannot be
    /// covered fails the whole plan.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when the lots of a kind cannot cover its amount.
    pub fn plan_use(
        &self,
        user_id: &str,
        amounts: &BTreeMap<Kind, Decimal>,
        existing: Vec<Item>,
        mut lots: BTreeMap<Kind, Vec<ItemDetail>>,
        meta: &HistoryMeta,
    ) -> Result<WalletPlan, WalletError> {
        let now = self.now();
        let mut plan = WalletPlan {
            items: Self::fill_items(user_id, amounts.keys().copied(), existing, now),
            ..WalletPlan::default()
        };

        for (kind, amount) in Self::positive_amounts(amounts) {
            let kind_lots = lots.remove(&kind).unwrap_or_default();
            plan.debit(user_id, kind, amount, kind_lots, meta, now)?;
        }

        plan.apply_deltas(now)?;
        Ok(plan)
    }

    /// Plans an exchange of `amount` from `from` lots into a new `to` lot.
    ///
    /// A non-positive amount or `from == to` yields a no-op plan that still
    /// carries both balances.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when `from` cannot cover `amount`; no credit is
    /// planned in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn plan_exchange(
        &self,
        user_id: &str,
        from: Kind,
        to: Kind,
        amount: Decimal,
        existing: Vec<Item>,
        from_lots: Vec<ItemDetail>,
        meta: &HistoryMeta,
    ) -> Result<WalletPlan, WalletError> {
        let now = self.now();
        let mut plan = WalletPlan {
            items: Self::fill_items(user_id, [from, to], existing, now),
            ..WalletPlan::default()
        };

        if !Self::is_exchange(from, to, amount) {
            return Ok(plan);
        }

        plan.debit(user_id, from, amount, from_lots, meta, now)?;
        plan.credit(user_id, to, amount, meta, now);

        plan.apply_deltas(now)?;
        Ok(plan)
    }

    /// Whether an exchange request moves anything.
    #[must_use]
    pub fn is_exchange(from: Kind, to: Kind, amount: Decimal) -> bool {
        amount > Decimal::ZERO && from != to
    }
}
