use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use super::schema::{CUSTOMERS, ITEMS, ORDERS, TableSchema};

pub const ORDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Man,
    Woman,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Man => "man",
            Sex::Woman => "woman",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i32,
    pub age: i32,
    pub sex: Sex,
    pub live: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: i32,
    pub price: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i32,
    pub customer_id: i32,
    #[serde(with = "order_time")]
    pub order_time: NaiveDateTime,
    pub total_price: i32,
    pub item_id: i32,
}

mod order_time {
    use super::ORDER_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(ORDER_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), ORDER_TIME_FORMAT).map_err(de::Error::custom)
    }
}

/// A CSV row that maps onto one table of the dataset.
pub trait BulkRecord: for<'de> Deserialize<'de> + Send {
    const TABLE: &'static TableSchema;

    /// Binds the fields in the column order of [`Self::TABLE`].
    fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments>;
}

impl BulkRecord for Customer {
    const TABLE: &'static TableSchema = &CUSTOMERS;

    fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        query
            .bind(self.customer_id)
            .bind(self.age)
            .bind(self.sex.as_str())
            .bind(self.live)
    }
}

impl BulkRecord for Item {
    const TABLE: &'static TableSchema = &ITEMS;

    fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        query.bind(self.item_id).bind(self.price)
    }
}

impl BulkRecord for Order {
    const TABLE: &'static TableSchema = &ORDERS;

    fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        query
            .bind(self.order_id)
            .bind(self.customer_id)
            .bind(self.order_time)
            .bind(self.total_price)
            .bind(self.item_id)
    }
}
