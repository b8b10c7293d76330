//! Wallet client: the public face of the ledger engine.
//!
//! Reads go straight to the connection. Every mutation reads the affected
//! aggregates and lots, plans the change with [`WalletService`] and stages
//! the plan, all inside one transaction run by [`TransactionRunner`].

use std::collections::BTreeMap;

use purse_core::wallet::{
    HistoryMeta, Item, ItemHistory, Kind, Reconciliation, WalletPlan, WalletService,
};
use purse_shared::LedgerConfig;
use purse_shared::types::{CursorPage, CursorRequest};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use tracing::{debug, info};

use crate::error::WalletDbError;
use crate::repositories::WalletRepository;
use crate::store::TransactionRunner;

/// One page of history, newest first.
pub type HistoryPage = CursorPage<ItemHistory>;

/// Multi-kind wallet backed by the database.
#[derive(Debug, Clone)]
pub struct WalletClient {
    repo: WalletRepository,
    runner: TransactionRunner,
    service: WalletService,
}

impl WalletClient {
    /// Creates a client over `db` using the wall clock.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            runner: TransactionRunner::new(db.clone(), config),
            repo: WalletRepository::new(db),
            service: WalletService::default(),
        }
    }

    /// Replaces the planning service, typically to inject a clock.
    #[must_use]
    pub fn with_service(mut self, service: WalletService) -> Self {
        self.service = service;
        self
    }

    // ========================================================================
    // Balance queries
    // ========================================================================

    /// Gets the stored aggregate of one kind. Absent is not an error.
    pub async fn get(&self, user_id: &str, kind: Kind) -> Result<Option<Item>, WalletDbError> {
        self.repo.get_item(user_id, kind).await
    }

    /// Gets one aggregate per kind, synthesizing zero balances (not persisted)
    /// for kinds the user never touched.
    pub async fn get_multi(
        &self,
        user_id: &str,
        kinds: &[Kind],
    ) -> Result<BTreeMap<Kind, Item>, WalletDbError> {
        let existing = self
            .repo
            .tx_get_multi_items(self.repo.connection(), user_id, kinds)
            .await?;
        Ok(WalletService::fill_items(
            user_id,
            kinds.iter().copied(),
            existing,
            self.service.now(),
        ))
    }

    /// Balance of one kind; zero when the user never touched it.
    pub async fn get_amount(&self, user_id: &str, kind: Kind) -> Result<Decimal, WalletDbError> {
        Ok(self
            .get(user_id, kind)
            .await?
            .map_or(Decimal::ZERO, |item| item.amount))
    }

    /// Balances of several kinds, zero-filled.
    pub async fn get_multi_amount(
        &self,
        user_id: &str,
        kinds: &[Kind],
    ) -> Result<BTreeMap<Kind, Decimal>, WalletDbError> {
        Ok(self
            .get_multi(user_id, kinds)
            .await?
            .into_iter()
            .map(|(kind, item)| (kind, item.amount))
            .collect())
    }

    /// Compares the aggregate of one kind with the sum of its lots.
    ///
    /// Both sides are read in one transaction so a concurrent mutation
    /// cannot be seen half applied.
    pub async fn reconcile(
        &self,
        user_id: &str,
        kind: Kind,
    ) -> Result<Reconciliation, WalletDbError> {
        self.runner
            .run_transaction(
                async |txn: &DatabaseTransaction| -> Result<Reconciliation, WalletDbError> {
                    let item = self.repo.tx_get_item(txn, user_id, kind).await?;
                    let lots = self.repo.tx_list_item_details(txn, user_id, kind).await?;
                    Ok(Reconciliation::check(kind, item.as_ref(), &lots))
                },
            )
            .await
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Credits every positive entry of `amounts` as a new lot.
    ///
    /// Returns the aggregates of every kind named in `amounts`.
    pub async fn give(
        &self,
        user_id: &str,
        amounts: &BTreeMap<Kind, Decimal>,
        meta: &HistoryMeta,
    ) -> Result<BTreeMap<Kind, Item>, WalletDbError> {
        let kinds: Vec<Kind> = amounts.keys().copied().collect();
        if WalletService::positive_amounts(amounts).is_empty() {
            return self.get_multi(user_id, &kinds).await;
        }

        let plan = self
            .runner
            .run_transaction(
                async |txn: &DatabaseTransaction| -> Result<WalletPlan, WalletDbError> {
                    let existing = self.repo.tx_get_multi_items(txn, user_id, &kinds).await?;
                    let plan = self.service.plan_give(user_id, amounts, existing, meta)?;
                    debug!(user_id, lots = plan.new_lots.len(), "Planned give");
                    self.repo.stage_plan(txn, &plan).await?;
                    Ok(plan)
                },
            )
            .await?;

        info!(user_id, kinds = ?kinds, "Give committed");
        Ok(plan.items)
    }

    /// Debits every positive entry of `amounts` from the oldest lots first.
    ///
    /// Either every kind is covered or nothing changes.
    pub async fn use_items(
        &self,
        user_id: &str,
        amounts: &BTreeMap<Kind, Decimal>,
        meta: &HistoryMeta,
    ) -> Result<BTreeMap<Kind, Item>, WalletDbError> {
        let kinds: Vec<Kind> = amounts.keys().copied().collect();
        let positive = WalletService::positive_amounts(amounts);
        if positive.is_empty() {
            return self.get_multi(user_id, &kinds).await;
        }

        let plan = self
            .runner
            .run_transaction(
                async |txn: &DatabaseTransaction| -> Result<WalletPlan, WalletDbError> {
                    let existing = self.repo.tx_get_multi_items(txn, user_id, &kinds).await?;
                    let mut lots = BTreeMap::new();
                    for kind in positive.keys() {
                        let kind_lots = self.repo.tx_list_item_details(txn, user_id, *kind).await?;
                        lots.insert(*kind, kind_lots);
                    }

                    let plan = self
                        .service
                        .plan_use(user_id, amounts, existing, lots, meta)?;
                    debug!(user_id, lots = plan.updated_lots.len(), "Planned use");
                    self.repo.stage_plan(txn, &plan).await?;
                    Ok(plan)
                },
            )
            .await?;

        info!(user_id, kinds = ?kinds, "Use committed");
        Ok(plan.items)
    }

    /// Moves `amount` from `from` lots into a new `to` lot.
    ///
    /// A non-positive amount or `from == to` changes nothing and returns the
    /// current balances of both kinds.
    pub async fn exchange(
        &self,
        user_id: &str,
        from: Kind,
        to: Kind,
        amount: Decimal,
        meta: &HistoryMeta,
    ) -> Result<BTreeMap<Kind, Item>, WalletDbError> {
        if !WalletService::is_exchange(from, to, amount) {
            return self.get_multi(user_id, &[from, to]).await;
        }

        let plan = self
            .runner
            .run_transaction(
                async |txn: &DatabaseTransaction| -> Result<WalletPlan, WalletDbError> {
                    let existing = self
                        .repo
                        .tx_get_multi_items(txn, user_id, &[from, to])
                        .await?;
                    let from_lots = self.repo.tx_list_item_details(txn, user_id, from).await?;

                    let plan = self
                        .service
                        .plan_exchange(user_id, from, to, amount, existing, from_lots, meta)?;
                    debug!(user_id, %from, %to, "Planned exchange");
                    self.repo.stage_plan(txn, &plan).await?;
                    Ok(plan)
                },
            )
            .await?;

        info!(user_id, %from, %to, %amount, "Exchange committed");
        Ok(plan.items)
    }

    // ========================================================================
    // History queries
    // ========================================================================

    /// Pages through history of `kinds`, newest first.
    ///
    /// The cursor of the request is the id of the last record of the
    /// previous page; an empty cursor starts from the newest record.
    pub async fn histories_by_cursor(
        &self,
        user_id: &str,
        kinds: &[Kind],
        request: &CursorRequest,
    ) -> Result<HistoryPage, WalletDbError> {
        let Some(limit) = request.fetch_limit() else {
            return Ok(HistoryPage::empty());
        };
        let cursor = request.cursor.as_deref().filter(|cursor| !cursor.is_empty());

        let records = self
            .repo
            .list_histories_by_cursor(user_id, kinds, limit, cursor)
            .await?;
        Ok(CursorPage::new(records, limit, |history| history.id.to_string()))
    }

    /// History of `kinds` created within `[start_at, end_at]` (epoch
    /// milliseconds), newest first.
    pub async fn histories_by_period(
        &self,
        user_id: &str,
        kinds: &[Kind],
        start_at: i64,
        end_at: i64,
    ) -> Result<Vec<ItemHistory>, WalletDbError> {
        self.repo
            .list_histories_by_period(user_id, kinds, start_at, end_at)
            .await
    }
}
