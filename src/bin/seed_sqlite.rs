//! Prepare a local SQLite catalog that `catalog-seeder --sqlite` can load
//! into: tables, the configured categories and the four provider accounts.

use anyhow::Result;

use catalog_seeder::config::SeederConfig;
use catalog_seeder::db::Sqlite;

const PROVIDERS: [(u64, &str, &str); 4] = [
    (5, "forit@mail.com", "ForIT"),
    (6, "vexio@mail.com", "Vexio"),
    (7, "itgalaxy@mail.com", "ITGalaxy"),
    (8, "shop4pc@mail.com", "Shop4PC"),
];

fn main() -> Result<()> {
    let path = std::path::Path::new("dev/sqlite");
    std::fs::create_dir_all(path)?;
    let db_path = path.join("catalog.db");

    let db = Sqlite::open(&db_path)?;
    db.apply_schema()?;

    let config = SeederConfig::default();
    for (name, id) in &config.category_ids {
        db.insert_category(*id, name)?;
    }
    for (id, email, company) in PROVIDERS {
        db.insert_provider(id, email, company)?;
    }

    println!("Prepared SQLite catalog at {}", db_path.display());
    println!("Seed it with: catalog-seeder --sqlite {}", db_path.display());
    Ok(())
}
