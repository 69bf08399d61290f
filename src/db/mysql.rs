use anyhow::{Context, Result};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Transaction, TxOpts};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::db::{CatalogStore, NewProduct, RowWriter};

pub struct Mysql {
    conn: Conn,
}

impl Mysql {
    pub fn connect(conn: &Connection) -> Result<Self> {
        let user = conn.require(&conn.user, "user")?;
        let host = conn.require(&conn.host, "host")?;
        let port = conn
            .port
            .ok_or_else(|| anyhow::anyhow!("type mysql needs the port field"))?;
        let port = u16::try_from(port).with_context(|| format!("invalid mysql port {port}"))?;

        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(host))
            .tcp_port(port)
            .user(Some(user))
            .pass(conn.password.as_deref())
            .db_name(conn.database.as_deref());

        debug!("mysql: connecting");
        let conn = Conn::new(opts)?;
        debug!("mysql: connected");
        Ok(Self { conn })
    }
}

impl Drop for Mysql {
    fn drop(&mut self) {
        debug!("mysql: connection closed");
    }
}

impl CatalogStore for Mysql {
    fn with_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RowWriter) -> Result<T>,
    {
        let mut tx = self.conn.start_transaction(TxOpts::default())?;
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = tx.rollback() {
                    warn!("mysql: rollback failed: {e}");
                }
                Err(err)
            }
        }
    }
}

impl RowWriter for Transaction<'_> {
    fn insert_product(&mut self, product: &NewProduct<'_>) -> Result<u64> {
        self.exec_drop(
            "INSERT INTO products (name, description, price, stock_quantity, category_id, provider_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                product.name,
                product.description,
                product.price.to_string(),
                product.stock_quantity,
                product.category_id,
                product.provider_id,
            ),
        )?;
        self.last_insert_id()
            .ok_or_else(|| anyhow::anyhow!("no id assigned to product `{}`", product.name))
    }

    fn find_attribute(&mut self, name: &str, category_id: u64) -> Result<Option<u64>> {
        let id = self.exec_first(
            "SELECT id FROM attributes WHERE name = ? AND category_id = ?",
            (name, category_id),
        )?;
        Ok(id)
    }

    fn insert_attribute(&mut self, name: &str, category_id: u64) -> Result<u64> {
        self.exec_drop(
            "INSERT INTO attributes (name, category_id) VALUES (?, ?)",
            (name, category_id),
        )?;
        self.last_insert_id()
            .ok_or_else(|| anyhow::anyhow!("no id assigned to attribute `{name}`"))
    }

    fn link_attribute(&mut self, product_id: u64, attribute_id: u64, value: &str) -> Result<()> {
        self.exec_drop(
            "INSERT INTO product_attributes (product_id, attribute_id, value) VALUES (?, ?, ?)",
            (product_id, attribute_id, value),
        )?;
        Ok(())
    }
}
