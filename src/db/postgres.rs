use anyhow::{Context, Result};
use postgres::{Client, NoTls, Transaction};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::db::{CatalogStore, NewProduct, RowWriter};

/// Ids are `integer` columns, as in the MySQL schema.
pub struct Postgres {
    client: Client,
}

impl Postgres {
    pub fn database_url(conn: &Connection) -> Result<String> {
        let user = conn.require(&conn.user, "user")?;
        let host = conn.require(&conn.host, "host")?;
        let port = conn
            .port
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("type postgres needs the port field"))?;
        let password = conn
            .password
            .as_ref()
            .map_or(String::new(), |p| p.to_string());

        match conn.database.as_ref() {
            Some(database) => Ok(format!(
                "postgres://{user}:{password}@{host}:{port}/{database}"
            )),
            None => Ok(format!("postgres://{user}:{password}@{host}:{port}")),
        }
    }

    pub fn connect(conn: &Connection) -> Result<Self> {
        debug!("postgres: connecting");
        let url = Postgres::database_url(conn)?;
        let client = Client::connect(&url, NoTls)?;
        debug!("postgres: connected");
        Ok(Self { client })
    }
}

impl Drop for Postgres {
    fn drop(&mut self) {
        debug!("postgres: connection closed");
    }
}

impl CatalogStore for Postgres {
    fn with_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RowWriter) -> Result<T>,
    {
        let mut tx = self.client.transaction()?;
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = tx.rollback() {
                    warn!("postgres: rollback failed: {e}");
                }
                Err(err)
            }
        }
    }
}

fn int_id(id: u64) -> Result<i32> {
    i32::try_from(id).with_context(|| format!("id {id} does not fit an integer column"))
}

fn positive_id(id: i32) -> Result<u64> {
    u64::try_from(id).with_context(|| format!("database returned negative id {id}"))
}

fn returned_id(row: &postgres::Row) -> Result<u64> {
    let id = row
        .try_get::<_, i32>(0)
        .context("id column is not an integer")?;
    positive_id(id)
}

impl RowWriter for Transaction<'_> {
    fn insert_product(&mut self, product: &NewProduct<'_>) -> Result<u64> {
        let row = self.query_one(
            "INSERT INTO products (name, description, price, stock_quantity, category_id, provider_id)
             VALUES ($1, $2, $3::text::numeric, $4, $5, $6)
             RETURNING id",
            &[
                &product.name,
                &product.description,
                &product.price.to_string(),
                &i32::try_from(product.stock_quantity)?,
                &int_id(product.category_id)?,
                &int_id(product.provider_id)?,
            ],
        )?;
        returned_id(&row)
    }

    fn find_attribute(&mut self, name: &str, category_id: u64) -> Result<Option<u64>> {
        let row = self.query_opt(
            "SELECT id FROM attributes WHERE name = $1 AND category_id = $2",
            &[&name, &int_id(category_id)?],
        )?;
        row.as_ref().map(returned_id).transpose()
    }

    fn insert_attribute(&mut self, name: &str, category_id: u64) -> Result<u64> {
        let row = self.query_one(
            "INSERT INTO attributes (name, category_id) VALUES ($1, $2) RETURNING id",
            &[&name, &int_id(category_id)?],
        )?;
        returned_id(&row)
    }

    fn link_attribute(&mut self, product_id: u64, attribute_id: u64, value: &str) -> Result<()> {
        self.execute(
            "INSERT INTO product_attributes (product_id, attribute_id, value) VALUES ($1, $2, $3)",
            &[&int_id(product_id)?, &int_id(attribute_id)?, &value],
        )?;
        Ok(())
    }
}
