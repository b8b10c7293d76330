//! Wallet repository: translates wallet documents to and from rows.
//!
//! Methods prefixed with `tx_` take the connection explicitly so that they
//! can be staged on the caller's transaction. The others read through the
//! repository's own connection and need no transaction.

use std::str::FromStr;

use purse_core::wallet::{Item, ItemDetail, ItemHistory, Kind, WalletError, WalletPlan};
use purse_shared::types::{HistoryId, ItemId, LotId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::{Map, Value};

use crate::entities::{item_details, item_histories, items};
use crate::error::WalletDbError;

/// Wallet repository for balance, lot and history documents.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Gets the aggregate of one (user, kind) pair, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn get_item(&self, user_id: &str, kind: Kind) -> Result<Option<Item>, WalletDbError> {
        self.tx_get_item(&self.db, user_id, kind).await
    }

    /// Gets the aggregate of one (user, kind) pair on `txn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn tx_get_item<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: &str,
        kind: Kind,
    ) -> Result<Option<Item>, WalletDbError> {
        items::Entity::find_by_id(ItemId::for_owner(user_id, kind.as_str()).to_string())
            .one(txn)
            .await?
            .map(Item::try_from)
            .transpose()
    }

    /// Batch-reads the aggregates of `kinds`. Missing aggregates are simply
    /// absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn tx_get_multi_items<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: &str,
        kinds: &[Kind],
    ) -> Result<Vec<Item>, WalletDbError> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = kinds
            .iter()
            .map(|kind| ItemId::for_owner(user_id, kind.as_str()).to_string())
            .collect();

        items::Entity::find()
            .filter(items::Column::Id.is_in(ids))
            .all(txn)
            .await?
            .into_iter()
            .map(Item::try_from)
            .collect()
    }

    /// Creates or overwrites an aggregate, keyed by its deterministic id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn tx_set_item<C: ConnectionTrait>(
        &self,
        txn: &C,
        item: &Item,
    ) -> Result<(), WalletDbError> {
        items::Entity::insert(items::ActiveModel::from(item))
            .on_conflict(
                OnConflict::column(items::Column::Id)
                    .update_columns([
                        items::Column::Amount,
                        items::Column::TotalGive,
                        items::Column::TotalUse,
                        items::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    /// Inserts a new lot.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn tx_create_item_detail<C: ConnectionTrait>(
        &self,
        txn: &C,
        lot: &ItemDetail,
    ) -> Result<(), WalletDbError> {
        item_details::Entity::insert(item_details::ActiveModel::from(lot))
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    /// Lists every lot of one (user, kind) pair, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn tx_list_item_details<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: &str,
        kind: Kind,
    ) -> Result<Vec<ItemDetail>, WalletDbError> {
        item_details::Entity::find()
            .filter(item_details::Column::UserId.eq(user_id))
            .filter(item_details::Column::Kind.eq(kind.as_str()))
            .order_by_asc(item_details::Column::CreatedAt)
            .order_by_asc(item_details::Column::Id)
            .all(txn)
            .await?
            .into_iter()
            .map(ItemDetail::try_from)
            .collect()
    }

    /// Writes the remaining amount of a lot that was drawn from.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails or the lot does not exist.
    pub async fn tx_update_item_detail<C: ConnectionTrait>(
        &self,
        txn: &C,
        lot: &ItemDetail,
    ) -> Result<(), WalletDbError> {
        item_details::ActiveModel {
            id: Unchanged(lot.id.to_string()),
            amount: Set(lot.amount),
            updated_at: Set(lot.updated_at),
            expired: Set(lot.expired),
            ..Default::default()
        }
        .update(txn)
        .await?;
        Ok(())
    }

    /// Appends a history record.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn tx_create_history<C: ConnectionTrait>(
        &self,
        txn: &C,
        history: &ItemHistory,
    ) -> Result<(), WalletDbError> {
        item_histories::Entity::insert(item_histories::ActiveModel::from(history))
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    /// Stages every write of a plan: aggregates, lots, then history.
    ///
    /// # Errors
    ///
    /// Returns the first failing write; the caller's transaction must then
    /// be discarded.
    pub async fn stage_plan<C: ConnectionTrait>(
        &self,
        txn: &C,
        plan: &WalletPlan,
    ) -> Result<(), WalletDbError> {
        for item in plan.changed_items() {
            self.tx_set_item(txn, item).await?;
        }
        for lot in &plan.updated_lots {
            self.tx_update_item_detail(txn, lot).await?;
        }
        for lot in &plan.new_lots {
            self.tx_create_item_detail(txn, lot).await?;
        }
        for history in &plan.histories {
            self.tx_create_history(txn, history).await?;
        }
        Ok(())
    }

    /// Lists up to `limit` history records of `kinds`, newest first,
    /// starting strictly after the record `cursor`.
    ///
    /// An unknown cursor yields no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn list_histories_by_cursor(
        &self,
        user_id: &str,
        kinds: &[Kind],
        limit: u64,
        cursor: Option<&str>,
    ) -> Result<Vec<ItemHistory>, WalletDbError> {
        if kinds.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = item_histories::Entity::find()
            .filter(item_histories::Column::UserId.eq(user_id))
            .filter(item_histories::Column::Kind.is_in(kind_names(kinds)));

        if let Some(cursor) = cursor {
            let anchor = item_histories::Entity::find_by_id(cursor.to_string())
                .filter(item_histories::Column::UserId.eq(user_id))
                .one(&self.db)
                .await?;
            let Some(anchor) = anchor else {
                return Ok(Vec::new());
            };

            query = query.filter(
                Condition::any()
                    .add(item_histories::Column::CreatedAt.lt(anchor.created_at))
                    .add(
                        Condition::all()
                            .add(item_histories::Column::CreatedAt.eq(anchor.created_at))
                            .add(item_histories::Column::Id.lt(anchor.id)),
                    ),
            );
        }

        query
            .order_by_desc(item_histories::Column::CreatedAt)
            .order_by_desc(item_histories::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ItemHistory::try_from)
            .collect()
    }

    /// Lists history records of `kinds` created within `[start_at, end_at]`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn list_histories_by_period(
        &self,
        user_id: &str,
        kinds: &[Kind],
        start_at: i64,
        end_at: i64,
    ) -> Result<Vec<ItemHistory>, WalletDbError> {
        if kinds.is_empty() || start_at > end_at {
            return Ok(Vec::new());
        }

        item_histories::Entity::find()
            .filter(item_histories::Column::UserId.eq(user_id))
            .filter(item_histories::Column::Kind.is_in(kind_names(kinds)))
            .filter(item_histories::Column::CreatedAt.gte(start_at))
            .filter(item_histories::Column::CreatedAt.lte(end_at))
            .order_by_desc(item_histories::Column::CreatedAt)
            .order_by_desc(item_histories::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ItemHistory::try_from)
            .collect()
    }
}

fn kind_names(kinds: &[Kind]) -> Vec<&'static str> {
    kinds.iter().map(|kind| kind.as_str()).collect()
}

fn corrupt(what: &str, id: &str, err: impl std::fmt::Display) -> WalletDbError {
    WalletError::CorruptState(format!("{what} {id}: {err}")).into()
}

fn parse_kind(what: &str, id: &str, kind: &str) -> Result<Kind, WalletDbError> {
    Kind::from_str(kind).map_err(|err| corrupt(what, id, err))
}

// ============================================================================
// Row <-> document mapping
// ============================================================================

impl TryFrom<items::Model> for Item {
    type Error = WalletDbError;

    fn try_from(model: items::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ItemId::from_str(&model.id).map_err(|err| corrupt("item", &model.id, err))?,
            kind: parse_kind("item", &model.id, &model.kind)?,
            user_id: model.user_id,
            amount: model.amount,
            total_give: model.total_give,
            total_use: model.total_use,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Item> for items::ActiveModel {
    fn from(item: &Item) -> Self {
        Self {
            id: Set(item.id.to_string()),
            user_id: Set(item.user_id.clone()),
            kind: Set(item.kind.as_str().to_string()),
            amount: Set(item.amount),
            total_give: Set(item.total_give),
            total_use: Set(item.total_use),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
    }
}

impl TryFrom<item_details::Model> for ItemDetail {
    type Error = WalletDbError;

    fn try_from(model: item_details::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LotId::from_str(&model.id).map_err(|err| corrupt("lot", &model.id, err))?,
            kind: parse_kind("lot", &model.id, &model.kind)?,
            user_id: model.user_id,
            amount: model.amount,
            initial_amount: model.initial_amount,
            created_at: model.created_at,
            updated_at: model.updated_at,
            expired: model.expired,
        })
    }
}

impl From<&ItemDetail> for item_details::ActiveModel {
    fn from(lot: &ItemDetail) -> Self {
        Self {
            id: Set(lot.id.to_string()),
            user_id: Set(lot.user_id.clone()),
            kind: Set(lot.kind.as_str().to_string()),
            amount: Set(lot.amount),
            initial_amount: Set(lot.initial_amount),
            created_at: Set(lot.created_at),
            updated_at: Set(lot.updated_at),
            expired: Set(lot.expired),
        }
    }
}

impl TryFrom<item_histories::Model> for ItemHistory {
    type Error = WalletDbError;

    fn try_from(model: item_histories::Model) -> Result<Self, Self::Error> {
        let data = match model.data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(corrupt("history data", &model.id, other)),
        };
        Ok(Self {
            id: HistoryId::from_str(&model.id)
                .map_err(|err| corrupt("history", &model.id, err))?,
            kind: parse_kind("history", &model.id, &model.kind)?,
            user_id: model.user_id,
            amount: model.amount,
            data,
            comment: model.comment,
            created_at: model.created_at,
        })
    }
}

impl From<&ItemHistory> for item_histories::ActiveModel {
    fn from(history: &ItemHistory) -> Self {
        Self {
            id: Set(history.id.to_string()),
            user_id: Set(history.user_id.clone()),
            kind: Set(history.kind.as_str().to_string()),
            amount: Set(history.amount),
            data: Set(Value::Object(history.data.clone())),
            comment: Set(history.comment.clone()),
            created_at: Set(history.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use purse_core::wallet::HistoryMeta;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_item_round_trips_through_row() {
        let mut item = Item::zero("u1", Kind::Gold, 10);
        item.apply_delta(dec!(25), 11);

        let active = items::ActiveModel::from(&item);
        let model = items::Model {
            id: active.id.unwrap(),
            user_id: active.user_id.unwrap(),
            kind: active.kind.unwrap(),
            amount: active.amount.unwrap(),
            total_give: active.total_give.unwrap(),
            total_use: active.total_use.unwrap(),
            created_at: active.created_at.unwrap(),
            updated_at: active.updated_at.unwrap(),
        };
        assert_eq!(model.kind, "gold");
        assert_eq!(Item::try_from(model).unwrap(), item);
    }

    #[test]
    fn test_unknown_kind_is_corrupt() {
        let model = item_details::Model {
            id: LotId::new().to_string(),
            user_id: "u1".into(),
            kind: "bronze".into(),
            amount: dec!(1),
            initial_amount: dec!(1),
            created_at: 1,
            updated_at: 1,
            expired: false,
        };
        let err = ItemDetail::try_from(model).unwrap_err();
        assert_eq!(err.error_code(), "CORRUPT_STATE");
    }

    #[test]
    fn test_history_null_data_is_empty_map() {
        let model = item_histories::Model {
            id: HistoryId::new().to_string(),
            user_id: "u1".into(),
            kind: "silver".into(),
            amount: dec!(-3),
            data: Value::Null,
            comment: String::new(),
            created_at: 5,
        };
        let history = ItemHistory::try_from(model).unwrap();
        assert!(history.data.is_empty());
        assert_eq!(history.kind, Kind::Silver);
    }

    #[test]
    fn test_history_data_is_stored_as_object() {
        let mut data = Map::new();
        data.insert("order".into(), json!("A-1"));
        let meta = HistoryMeta::new("purchase").with_data(Some(data));
        let history = ItemHistory::record("u1", Kind::Gold, dec!(-5), &meta, 3);

        let active = item_histories::ActiveModel::from(&history);
        assert_eq!(active.data.unwrap(), json!({"order": "A-1"}));
    }
}
