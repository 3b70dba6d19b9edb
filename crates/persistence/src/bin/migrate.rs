#![deny(warnings)]

use persistence::archive::{default_sqlite_url, ensure_parent_dir, init_db, list_slots};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    ensure_parent_dir(&url)?;
    let pool = init_db(&url).await?;
    let slots = list_slots(&pool).await?;
    println!("Archive migrated at {} | slots: {}", url, slots.len());
    Ok(())
}
