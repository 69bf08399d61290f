mod mysql;
mod postgres;
mod sqlite;

use anyhow::Result;
use serde::Deserialize;

use crate::connection::Connection;
use crate::sheet::Price;

pub use self::mysql::Mysql;
pub use self::postgres::Postgres;
pub use self::sqlite::Sqlite;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl DatabaseType {
    pub fn scheme(self) -> &'static str {
        match self {
            DatabaseType::MySql => "mysql",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub price: &'a Price,
    pub stock_quantity: u32,
    pub category_id: u64,
    pub provider_id: u64,
}

/// Statements issued while loading one row. Always used inside a
/// transaction opened by [`CatalogStore::with_transaction`].
pub trait RowWriter {
    /// Returns the new product id.
    fn insert_product(&mut self, product: &NewProduct<'_>) -> Result<u64>;
    fn find_attribute(&mut self, name: &str, category_id: u64) -> Result<Option<u64>>;
    /// Returns the new attribute id.
    fn insert_attribute(&mut self, name: &str, category_id: u64) -> Result<u64>;
    fn link_attribute(&mut self, product_id: u64, attribute_id: u64, value: &str) -> Result<()>;
}

pub trait CatalogStore {
    /// Run `work` in one transaction: committed if it returns `Ok`, rolled
    /// back otherwise.
    fn with_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RowWriter) -> Result<T>;
}

/// The store picked by a [`Connection`]'s type.
pub enum Store {
    Mysql(Mysql),
    Postgres(Postgres),
    Sqlite(Sqlite),
}

impl Store {
    pub fn connect(conn: &Connection) -> Result<Self> {
        Ok(match conn.r#type {
            DatabaseType::MySql => Store::Mysql(Mysql::connect(conn)?),
            DatabaseType::Postgres => Store::Postgres(Postgres::connect(conn)?),
            DatabaseType::Sqlite => Store::Sqlite(Sqlite::connect(conn)?),
        })
    }
}

impl CatalogStore for Store {
    fn with_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RowWriter) -> Result<T>,
    {
        match self {
            Store::Mysql(db) => db.with_transaction(work),
            Store::Postgres(db) => db.with_transaction(work),
            Store::Sqlite(db) => db.with_transaction(work),
        }
    }
}
