use sqlsetup::*;
use tracing_subscriber::EnvFilter;

const STORES: &str = r#"[
    {"store_id": 1, "name": " Corner Shop ", "region": "NORTH-EAST", "opened": "2015/06/01"},
    {"store_id": 2, "name": "Null", "region": "SOUTH-WEST", "opened": "2018/11/23"},
    {"store_id": 3, "name": "Harbour", "region": "WEST", "opened": ""}
]"#;

const SALES: &str = r#"[
    {"sale_id": 100, "store_id": 1, "amount": 12.5},
    {"sale_id": 101, "store_id": 1, "amount": 3},
    {"sale_id": 102, "store_id": 3, "amount": 40.25}
]"#;

fn frame(json: &str) -> Result<Frame, Box<dyn std::error::Error>> {
    let records: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(Frame::from_json_records(&records)?)
}

async fn load(db: &dyn Database) -> Result<(), Box<dyn std::error::Error>> {
    let stores = conv_date_format(&basic_clean(&frame(STORES)?), &["opened"])?;
    let sales = frame(SALES)?;

    db.create_table(&stores, "stores", &TableOptions::new().primary_key("store_id"))
        .await?;
    db.create_table(
        &sales,
        "sales",
        &TableOptions::new()
            .primary_key("sale_id")
            .foreign_key("store_id", "stores", "store_id"),
    )
    .await?;

    db.insert_data(&stores, "stores").await?;
    db.insert_data(&sales, "sales").await?;

    for region in stores.column("region").into_iter().flat_map(|c| c.values()) {
        if let Cell::Text(region) = region {
            println!("{} -> {}", region, split_field(region, "-", 0, region));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Ok(json) = std::env::var("SQLSETUP_PG_CONFIG") {
        let config = PostgresConfig::from_json(&json)?;
        println!("{config}");
        let mut db = match PostgresDb::connect(config).await {
            Ok(db) => db,
            Err(e) if e.is_fatal() => {
                eprintln!("{e}");
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        };
        db.ensure_schema("demo").await?;
        load(&db).await?;
        println!("{:?}", db.fetch_all("SELECT COUNT(*) FROM demo.sales").await?);
        db.close().await;
    } else {
        let db = SqliteDb::connect(SqliteConfig::new("demo.db").with_path(std::env::temp_dir())).await?;
        println!("{db}");
        load(&db).await?;
        println!("{:?}", db.fetch_all("SELECT COUNT(*) FROM sales").await?);
        db.close().await;
    }
    Ok(())
}
