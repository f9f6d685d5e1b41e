use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An item offered for sale. Cost is in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub name: String,
    pub cost: i32,
    pub quantity: i32,
    pub date_created: NaiveDateTime,
    pub date_updated: NaiveDateTime,
}
