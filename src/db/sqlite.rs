use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Transaction};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::db::{CatalogStore, NewProduct, RowWriter};

const SCHEMA: &str = include_str!("schema.sql");

pub struct Sqlite {
    conn: rusqlite::Connection,
}

impl Sqlite {
    pub fn connect(conn: &Connection) -> Result<Self> {
        let path = conn
            .path
            .as_ref()
            .and_then(|p| expand_path(p))
            .ok_or_else(|| anyhow::anyhow!("type sqlite needs a valid path field"))?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        debug!("sqlite: opening {}", path.display());
        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(rusqlite::Connection::open_in_memory()?)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create the catalog tables if they do not exist yet.
    pub fn apply_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).context("applying schema")
    }

    pub fn insert_category(&self, id: u64, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO categories (id, name) VALUES (?1, ?2)",
            params![sql_id(id)?, name],
        )?;
        Ok(())
    }

    /// Provider accounts get an unusable password hash; they only own rows.
    pub fn insert_provider(&self, id: u64, email: &str, company_name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (id, email, password_hash, role, company_name)
             VALUES (?1, ?2, '!', 'provider', ?3)",
            params![sql_id(id)?, email, company_name],
        )?;
        Ok(())
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Drop for Sqlite {
    fn drop(&mut self) {
        debug!("sqlite: connection closed");
    }
}

impl CatalogStore for Sqlite {
    fn with_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RowWriter) -> Result<T>,
    {
        let mut tx = self.conn.transaction()?;
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = tx.rollback() {
                    warn!("sqlite: rollback failed: {e}");
                }
                Err(err)
            }
        }
    }
}

fn sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).with_context(|| format!("id {id} out of range"))
}

fn rowid(id: i64) -> Result<u64> {
    u64::try_from(id).with_context(|| format!("unexpected rowid {id}"))
}

impl RowWriter for Transaction<'_> {
    fn insert_product(&mut self, product: &NewProduct<'_>) -> Result<u64> {
        self.execute(
            "INSERT INTO products (name, description, price, stock_quantity, category_id, provider_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.name,
                product.description,
                product.price.to_string(),
                product.stock_quantity,
                sql_id(product.category_id)?,
                sql_id(product.provider_id)?,
            ],
        )?;
        rowid(self.last_insert_rowid())
    }

    fn find_attribute(&mut self, name: &str, category_id: u64) -> Result<Option<u64>> {
        let id: Option<i64> = self
            .query_row(
                "SELECT id FROM attributes WHERE name = ?1 AND category_id = ?2",
                params![name, sql_id(category_id)?],
                |row| row.get(0),
            )
            .optional()?;
        id.map(rowid).transpose()
    }

    fn insert_attribute(&mut self, name: &str, category_id: u64) -> Result<u64> {
        self.execute(
            "INSERT INTO attributes (name, category_id) VALUES (?1, ?2)",
            params![name, sql_id(category_id)?],
        )?;
        rowid(self.last_insert_rowid())
    }

    fn link_attribute(&mut self, product_id: u64, attribute_id: u64, value: &str) -> Result<()> {
        self.execute(
            "INSERT INTO product_attributes (product_id, attribute_id, value) VALUES (?1, ?2, ?3)",
            params![sql_id(product_id)?, sql_id(attribute_id)?, value],
        )?;
        Ok(())
    }
}

/// Expand a leading `~` and `$VAR` (or `%VAR%` on Windows) components.
pub(crate) fn expand_path(path: &Path) -> Option<PathBuf> {
    let mut expanded_path = PathBuf::new();
    let mut path_iter = path.iter();
    if path.starts_with("~") {
        path_iter.next()?;
        expanded_path = expanded_path.join(dirs_next::home_dir()?);
    }
    for path in path_iter {
        let path = path.to_str()?;
        expanded_path = if cfg!(unix) && path.starts_with('$') {
            expanded_path.join(std::env::var(path.strip_prefix('$')?).unwrap_or_default())
        } else if cfg!(windows) && path.starts_with('%') && path.ends_with('%') {
            expanded_path
                .join(std::env::var(path.strip_prefix('%')?.strip_suffix('%')?).unwrap_or_default())
        } else {
            expanded_path.join(path)
        }
    }
    Some(expanded_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Price;

    fn store() -> Sqlite {
        let db = Sqlite::open_in_memory().unwrap();
        db.apply_schema().unwrap();
        db.insert_category(1, "GPU").unwrap();
        db.insert_provider(5, "forit@mail.com", "ForIT").unwrap();
        db
    }

    fn product(price: &Price) -> NewProduct<'_> {
        NewProduct {
            name: "Card",
            description: "",
            price,
            stock_quantity: 3,
            category_id: 1,
            provider_id: 5,
        }
    }

    fn count(db: &Sqlite, table: &str) -> i64 {
        db.connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn committed_work_is_visible() {
        let mut db = store();
        let price = Price::zero();
        let (product_id, attribute_id) = db
            .with_transaction(|w| {
                let p = w.insert_product(&product(&price))?;
                assert_eq!(w.find_attribute("Memory GB", 1)?, None);
                let a = w.insert_attribute("Memory GB", 1)?;
                assert_eq!(w.find_attribute("Memory GB", 1)?, Some(a));
                w.link_attribute(p, a, "8")?;
                Ok((p, a))
            })
            .unwrap();
        assert!(product_id > 0 && attribute_id > 0);
        assert_eq!(count(&db, "products"), 1);
        assert_eq!(count(&db, "product_attributes"), 1);
    }

    #[test]
    fn failed_work_is_rolled_back() {
        let mut db = store();
        let price = Price::zero();
        let result: Result<()> = db.with_transaction(|w| {
            let p = w.insert_product(&product(&price))?;
            let a = w.insert_attribute("Color", 1)?;
            w.link_attribute(p, a, "black")?;
            anyhow::bail!("late failure")
        });
        assert!(result.is_err());
        assert_eq!(count(&db, "products"), 0);
        assert_eq!(count(&db, "attributes"), 0);
        assert_eq!(count(&db, "product_attributes"), 0);
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let mut db = store();
        let price = Price::zero();
        let result = db.with_transaction(|w| {
            let mut p = product(&price);
            p.provider_id = 99;
            w.insert_product(&p)
        });
        assert!(result.is_err());
    }

    #[test]
    fn attribute_names_are_unique_per_category() {
        let mut db = store();
        db.insert_category(2, "CPU").unwrap();
        db.with_transaction(|w| {
            w.insert_attribute("Cores", 1)?;
            w.insert_attribute("Cores", 2)?;
            Ok(())
        })
        .unwrap();
        let dup = db.with_transaction(|w| w.insert_attribute("Cores", 1));
        assert!(dup.is_err());
    }

    #[test]
    fn expand_path_handles_plain_paths() {
        assert_eq!(
            expand_path(Path::new("dev/sqlite/catalog.db")),
            Some(PathBuf::from("dev/sqlite/catalog.db"))
        );
    }
}
