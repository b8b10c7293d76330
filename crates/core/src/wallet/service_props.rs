//! Property-based tests for WalletService.
//!
//! Replays random Give / Use / Exchange sequences against an in-memory copy
//! of the documents and checks the ledger invariants after every call.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::clock::ManualClock;
use super::error::WalletError;
use super::item::{HistoryMeta, Item, ItemDetail, ItemHistory};
use super::kind::Kind;
use super::service::{WalletPlan, WalletService};

const USER: &str = "u1";

/// Strategy to generate amounts (-5.00 to 500.00), including non-positive ones.
fn amount() -> impl Strategy<Value = Decimal> {
    (-500i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a small set of kinds.
fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Gold), Just(Kind::Silver), Just(Kind::Gem)]
}

#[derive(Debug, Clone)]
enum Op {
    Give(Kind, Decimal),
    Use(Kind, Decimal),
    Exchange(Kind, Kind, Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (kind(), amount()).prop_map(|(k, a)| Op::Give(k, a)),
        (kind(), amount()).prop_map(|(k, a)| Op::Use(k, a)),
        (kind(), kind(), amount()).prop_map(|(f, t, a)| Op::Exchange(f, t, a)),
    ]
}

/// In-memory stand-in for the committed documents.
#[derive(Debug, Default, Clone, PartialEq)]
struct Books {
    items: BTreeMap<Kind, Item>,
    lots: Vec<ItemDetail>,
    histories: Vec<ItemHistory>,
}

impl Books {
    fn existing(&self, kinds: &[Kind]) -> Vec<Item> {
        kinds
            .iter()
            .filter_map(|kind| self.items.get(kind).cloned())
            .collect()
    }

    fn lots_of(&self, kind: Kind) -> Vec<ItemDetail> {
        self.lots
            .iter()
            .filter(|lot| lot.kind == kind)
            .cloned()
            .collect()
    }

    fn commit(&mut self, plan: WalletPlan) {
        for item in plan.changed_items() {
            self.items.insert(item.kind, item.clone());
        }
        for updated in plan.updated_lots {
            if let Some(lot) = self.lots.iter_mut().find(|lot| lot.id == updated.id) {
                *lot = updated;
            }
        }
        self.lots.extend(plan.new_lots);
        self.histories.extend(plan.histories);
    }

    fn run(&mut self, service: &WalletService, op: &Op) -> Result<(), WalletError> {
        let meta = HistoryMeta::default();
        let plan = match *op {
            Op::Give(kind, amount) => service.plan_give(
                USER,
                &BTreeMap::from([(kind, amount)]),
                self.existing(&[kind]),
                &meta,
            )?,
            Op::Use(kind, amount) => service.plan_use(
                USER,
                &BTreeMap::from([(kind, amount)]),
                self.existing(&[kind]),
                BTreeMap::from([(kind, self.lots_of(kind))]),
                &meta,
            )?,
            Op::Exchange(from, to, amount) => service.plan_exchange(
                USER,
                from,
                to,
                amount,
                self.existing(&[from, to]),
                self.lots_of(from),
                &meta,
            )?,
        };
        self.commit(plan);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Aggregates always equal the sum of their lots and never go negative.
    #[test]
    fn prop_aggregate_matches_lots(ops in prop::collection::vec(op(), 1..40)) {
        let service = WalletService::new(Arc::new(ManualClock::new(1_000, 1)));
        let mut books = Books::default();

        for op in &ops {
            let before = books.clone();
            match books.run(&service, op) {
                Ok(()) => {}
                Err(WalletError::InsufficientFunds { .. }) => {
                    prop_assert_eq!(&books, &before, "failed call must not change state");
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }

            for kind in Kind::ALL {
                let lot_total: Decimal = books.lots_of(kind).iter().map(|lot| lot.amount).sum();
                let item_amount = books.items.get(&kind).map_or(Decimal::ZERO, |item| item.amount);
                prop_assert_eq!(item_amount, lot_total);
                prop_assert!(item_amount >= Decimal::ZERO);
            }
        }
    }

    /// Lots never grow and never drop below zero.
    #[test]
    fn prop_lots_only_shrink(ops in prop::collection::vec(op(), 1..40)) {
        let service = WalletService::new(Arc::new(ManualClock::new(1_000, 1)));
        let mut books = Books::default();

        for op in &ops {
            let _ = books.run(&service, op);
            for lot in &books.lots {
                prop_assert!(lot.amount >= Decimal::ZERO);
                prop_assert!(lot.amount <= lot.initial_amount);
            }
        }
    }

    /// Every successful movement leaves exactly one signed history row per kind.
    #[test]
    fn prop_history_matches_totals(ops in prop::collection::vec(op(), 1..40)) {
        let service = WalletService::new(Arc::new(ManualClock::new(1_000, 1)));
        let mut books = Books::default();

        for op in &ops {
            let _ = books.run(&service, op);
        }

        for kind in Kind::ALL {
            let rows = books.histories.iter().filter(|history| history.kind == kind);
            let (credits, debits) = rows.fold((Decimal::ZERO, Decimal::ZERO), |(c, d), history| {
                if history.amount > Decimal::ZERO {
                    (c + history.amount, d)
                } else {
                    (c, d - history.amount)
                }
            });
            let item = books.items.get(&kind);
            prop_assert_eq!(item.map_or(Decimal::ZERO, |item| item.total_give), credits);
            prop_assert_eq!(item.map_or(Decimal::ZERO, |item| item.total_use), debits);
        }
        prop_assert!(
            books
                .histories
                .iter()
                .all(|history| !history.amount.is_zero())
        );
    }

    /// A debit never draws from a newer lot while an older one still holds funds.
    #[test]
    fn prop_use_is_fifo(
        gives in prop::collection::vec(1i64..10_000i64, 1..10),
        spend in 1i64..50_000i64,
    ) {
        let service = WalletService::new(Arc::new(ManualClock::new(1_000, 1)));
        let mut books = Books::default();
        for cents in &gives {
            books.run(&service, &Op::Give(Kind::Gold, Decimal::new(*cents, 2))).unwrap();
        }

        if books.run(&service, &Op::Use(Kind::Gold, Decimal::new(spend, 2))).is_ok() {
            let mut lots = books.lots_of(Kind::Gold);
            lots.sort_by_key(ItemDetail::fifo_key);
            let first_untouched = lots.iter().position(|lot| lot.amount == lot.initial_amount);
            if let Some(index) = first_untouched {
                prop_assert!(
                    lots[index..]
                        .iter()
                        .all(|lot| lot.amount == lot.initial_amount)
                );
                prop_assert!(
                    lots[..index.saturating_sub(1)]
                        .iter()
                        .all(|lot| lot.amount.is_zero())
                );
            }
        }
    }
}
