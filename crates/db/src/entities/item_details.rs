//! `SeaORM` Entity for item_details table (lots).

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "item_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    #[sea_orm(column_type = "Decimal(Some((28, 10)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((28, 10)))")]
    pub initial_amount: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
    pub expired: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
