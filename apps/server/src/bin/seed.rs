//! # Seed
//!
//! Creates the first manager account and, optionally, demo products.
//!
//! ## Usage
//! ```bash
//! # Superuser (manager) account
//! cargo run -p stockroom-server --bin seed -- --username admin --password s3cret
//!
//! # Plus 40 demo products
//! cargo run -p stockroom-server --bin seed -- -u admin -p s3cret --demo-products 40
//!
//! # Specify database path (default: $STOCKROOM_DB_PATH or ./stockroom.db)
//! cargo run -p stockroom-server --bin seed -- -u admin -p s3cret --db ./data/shop.db
//! ```
//!
//! Demo products get reference numbers `DEMO-0001`, `DEMO-0002`, ... and are
//! skipped if the catalog already has products.

use std::env;

use anyhow::{bail, Context};
use stockroom_core::{Condition, Money, ProductDraft};
use stockroom_db::{Database, DbConfig, NewUser};
use stockroom_server::auth::hash_password;

/// Brands and models for demo data
const CATALOG: &[(&str, &str, &[&str])] = &[
    ("Casio", "Watches", &["G-Shock GA-2100", "F-91W", "Edifice EFR-556", "Pro Trek PRW-30"]),
    ("Seiko", "Watches", &["Presage SRPD37", "5 Sports SRPD55", "Prospex SPB143"]),
    ("Citizen", "Watches", &["Eco-Drive BM8180", "Promaster NY0040"]),
    ("Samsung", "Phones", &["Galaxy A15", "Galaxy S23", "Galaxy Z Flip5"]),
    ("Tecno", "Phones", &["Spark 20", "Camon 30", "Pova 6"]),
    ("Apple", "Phones", &["iPhone 13", "iPhone 15 Pro"]),
];

const SUPPLIERS: &[&str] = &["Lagos Wholesale", "Prime Imports", "City Distributors"];

#[derive(Debug)]
struct Args {
    username: String,
    password: String,
    db_path: String,
    demo_products: usize,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let args: Vec<String> = env::args().collect();

    let mut username = None;
    let mut password = None;
    let mut db_path = env::var("STOCKROOM_DB_PATH").unwrap_or_else(|_| "./stockroom.db".to_string());
    let mut demo_products = 0;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--username" | "-u" => {
                username = value;
                i += 1;
            }
            "--password" | "-p" => {
                password = value;
                i += 1;
            }
            "--db" | "-d" => {
                if let Some(path) = value {
                    db_path = path;
                }
                i += 1;
            }
            "--demo-products" | "-n" => {
                let raw = value.context("--demo-products needs a number")?;
                demo_products = raw
                    .parse()
                    .with_context(|| format!("invalid --demo-products value '{raw}'"))?;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Stockroom seed");
                println!();
                println!("Usage: seed --username <NAME> --password <PASSWORD> [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --username <NAME>        Manager account to create");
                println!("  -p, --password <PASSWORD>    Its password");
                println!("  -n, --demo-products <N>      Also insert N demo products (default: 0)");
                println!("  -d, --db <PATH>              Database file path (default: ./stockroom.db)");
                println!("  -h, --help                   Show this help message");
                return Ok(None);
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
        i += 1;
    }

    let (Some(username), Some(password)) = (username, password) else {
        bail!("--username and --password are required (try --help)");
    };

    Ok(Some(Args {
        username,
        password,
        db_path,
        demo_products,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    println!("Stockroom seed");
    println!("==============");
    println!("Database: {}", args.db_path);
    println!();

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let users = db.users();
    if users.username_exists(args.username.trim()).await? {
        println!("⚠ Account '{}' already exists, leaving it alone", args.username);
    } else {
        let username = stockroom_core::validation::validate_username(&args.username)?;
        let hash = hash_password(&args.password)?;
        let (user, profile) = users
            .create(&NewUser::new(username, hash).superuser())
            .await?;
        println!("✓ Created {} account '{}'", profile.role, user.username);
    }

    if args.demo_products > 0 {
        seed_products(&db, args.demo_products).await?;
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");
    Ok(())
}

async fn seed_products(db: &Database, count: usize) -> anyhow::Result<()> {
    let products = db.products();

    let existing = products.summary().await?.products;
    if existing > 0 {
        println!("⚠ Catalog already has {existing} products, skipping demo data");
        return Ok(());
    }

    let mut generated = 0;
    for (index, draft) in demo_drafts().take(count).enumerate() {
        if let Err(e) = products.insert(&draft).await {
            eprintln!("Failed to insert {}: {}", draft.ref_no, e);
            continue;
        }
        generated += 1;
        if (index + 1) % 25 == 0 {
            println!("  Generated {} products...", index + 1);
        }
    }

    println!("✓ Generated {generated} demo products");
    Ok(())
}

/// Endless, deterministic demo catalog.
fn demo_drafts() -> impl Iterator<Item = ProductDraft> {
    let models: Vec<(&str, &str, &str)> = CATALOG
        .iter()
        .flat_map(|(brand, category, models)| {
            models.iter().map(move |model| (*brand, *category, *model))
        })
        .collect();

    (0usize..).map(move |n| {
        let (brand, category, model) = models[n % models.len()];

        // Spread of prices and stock levels, some of them low.
        let base = 2_500 + (n as i64 * 7_919) % 150_000;
        let selling = Money::from_cents(base * 13 / 10);

        ProductDraft {
            brand: brand.to_string(),
            model_name: model.to_string(),
            ref_no: format!("DEMO-{:04}", n + 1),
            category: Some(category.to_string()),
            supplier: Some(SUPPLIERS[n % SUPPLIERS.len()].to_string()),
            purchase_price: Money::from_cents(base),
            selling_price: selling,
            quantity: (n as i64 * 37) % 23,
            condition: if n % 5 == 4 { Condition::Used } else { Condition::New },
            remark: None,
        }
    })
}
