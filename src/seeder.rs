//! The per-category, per-row product load.
//!
//! Every row is one transaction: the product, any attribute definitions it
//! introduces and its attribute links are committed together or not at all.
//! A failing row is rolled back and reported, and the run moves on.

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::category::CategoryTable;
use crate::config::SeederConfig;
use crate::db::{CatalogStore, NewProduct};
use crate::error::SeedError;
use crate::normalize::AttributeNormalizer;
use crate::provider::ProviderAssignment;
use crate::sheet::{MissingMarkers, Price, ProductRow, ProductSheet};
use crate::stock::{RandomStock, StockPolicy};

/// Products are seeded without a description.
const DESCRIPTION: &str = "";
const LOG_NAME_CHARS: usize = 40;

/// A category label and the CSV file holding its products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    pub category: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub ordinal: usize,
    pub product: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryReport {
    pub category: String,
    pub inserted: usize,
    pub attributes_created: usize,
    pub links: usize,
    pub failed: Vec<RowFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub categories: Vec<CategoryReport>,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.categories.iter().map(|c| c.inserted).sum()
    }

    pub fn failed(&self) -> usize {
        self.categories.iter().map(|c| c.failed.len()).sum()
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.categories {
            writeln!(
                f,
                "{}: {} inserted, {} failed, {} attributes created, {} links",
                c.category,
                c.inserted,
                c.failed.len(),
                c.attributes_created,
                c.links
            )?;
            for failure in &c.failed {
                writeln!(
                    f,
                    "  row {} '{}': {}",
                    failure.ordinal, failure.product, failure.error
                )?;
            }
        }
        write!(
            f,
            "{} products inserted, {} rows failed",
            self.inserted(),
            self.failed()
        )
    }
}

#[derive(Debug, Default)]
struct RowOutcome {
    product_id: u64,
    attributes_created: usize,
    links: usize,
}

pub struct Seeder<'a, S> {
    store: &'a mut S,
    categories: CategoryTable,
    normalizer: AttributeNormalizer,
    markers: MissingMarkers,
    providers: Box<dyn ProviderAssignment + 'a>,
    stock: Box<dyn StockPolicy + 'a>,
}

impl<'a, S: CatalogStore> Seeder<'a, S> {
    pub fn new(store: &'a mut S, config: &SeederConfig) -> Self {
        Self {
            store,
            categories: CategoryTable::new(config.category_ids.clone()),
            normalizer: AttributeNormalizer::new(&config.acronyms),
            markers: MissingMarkers::new(config.missing_markers.iter().cloned()),
            providers: Box::new(config.providers.clone()),
            stock: Box::new(RandomStock::new(config.max_stock)),
        }
    }

    pub fn with_providers(mut self, providers: impl ProviderAssignment + 'a) -> Self {
        self.providers = Box::new(providers);
        self
    }

    pub fn with_stock(mut self, stock: impl StockPolicy + 'a) -> Self {
        self.stock = Box::new(stock);
        self
    }

    /// Seed each source in order. Every category is resolved before anything
    /// is written, so a mapping error never leaves a partial run behind.
    pub fn run(&mut self, sources: &[SheetSource]) -> Result<SeedReport, SeedError> {
        for source in sources {
            self.categories.resolve(&source.category)?;
        }

        let mut report = SeedReport::default();
        for source in sources {
            info!("--- Processing category: {} ---", source.category);
            let sheet = ProductSheet::from_path(&source.path, &self.markers)?;
            report
                .categories
                .push(self.seed_sheet(&source.category, &sheet)?);
        }
        Ok(report)
    }

    pub fn seed_sheet(
        &mut self,
        category: &str,
        sheet: &ProductSheet,
    ) -> Result<CategoryReport, SeedError> {
        let category_id = self.categories.resolve(category)?;
        let mut report = CategoryReport {
            category: category.to_string(),
            ..Default::default()
        };

        for row in &sheet.rows {
            let product = row.name.clone();
            match self.seed_row(category_id, sheet, row) {
                Ok(outcome) => {
                    info!(
                        "inserted product '{}' with id {}",
                        short_name(&product),
                        outcome.product_id
                    );
                    report.inserted += 1;
                    report.attributes_created += outcome.attributes_created;
                    report.links += outcome.links;
                }
                Err(err) => {
                    warn!(
                        category,
                        ordinal = row.ordinal,
                        "error processing product '{product}': {err:#}"
                    );
                    report.failed.push(RowFailure {
                        ordinal: row.ordinal,
                        product,
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        info!(
            "{}: {} inserted, {} failed",
            category,
            report.inserted,
            report.failed.len()
        );
        Ok(report)
    }

    fn seed_row(
        &mut self,
        category_id: u64,
        sheet: &ProductSheet,
        row: &ProductRow,
    ) -> Result<RowOutcome> {
        if row.name.is_empty() {
            bail!("product name is empty");
        }
        let price = Price::parse(row.price.as_deref())?;
        let provider_id = self.providers.provider_for(row.ordinal);
        let stock_quantity = self.stock.stock_for(row.ordinal);
        let normalizer = &self.normalizer;

        self.store.with_transaction(|w| {
            let product_id = w
                .insert_product(&NewProduct {
                    name: &row.name,
                    description: DESCRIPTION,
                    price: &price,
                    stock_quantity,
                    category_id,
                    provider_id,
                })
                .context("inserting product")?;

            let mut outcome = RowOutcome {
                product_id,
                ..Default::default()
            };
            for (column, value) in sheet.attributes(row) {
                let name = normalizer.normalize(column);
                if name.is_empty() {
                    bail!("attribute column {column:?} has no usable name");
                }
                let attribute_id = match w
                    .find_attribute(&name, category_id)
                    .with_context(|| format!("looking up attribute `{name}`"))?
                {
                    Some(id) => id,
                    None => {
                        let id = w
                            .insert_attribute(&name, category_id)
                            .with_context(|| format!("creating attribute `{name}`"))?;
                        debug!("created attribute '{name}' ({id}) in category {category_id}");
                        outcome.attributes_created += 1;
                        id
                    }
                };
                w.link_attribute(product_id, attribute_id, value)
                    .with_context(|| format!("linking attribute `{name}`"))?;
                outcome.links += 1;
            }
            Ok(outcome)
        })
    }
}

fn short_name(name: &str) -> String {
    if name.chars().count() <= LOG_NAME_CHARS {
        name.to_string()
    } else {
        let cut: String = name.chars().take(LOG_NAME_CHARS).collect();
        format!("{cut}...")
    }
}
