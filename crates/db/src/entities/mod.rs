//! `SeaORM` entities for the wallet tables.

pub mod item_details;
pub mod item_histories;
pub mod items;
