//! Global SaaS catalog queries and seeding

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::db::models::SaasProduct;
use crate::{Error, Result};

/// Result cap when searching
pub const SEARCH_LIMIT: usize = 50;

/// Result cap when browsing without a search term
pub const BROWSE_LIMIT: i64 = 100;

pub const STATUS_VERIFIED: &str = "verified";

/// Case-insensitive substring match on name or description
///
/// Folding happens in Rust because SQLite only folds ASCII case.
fn matches_term(product: &SaasProduct, folded_term: &str) -> bool {
    product.name.to_lowercase().contains(folded_term)
        || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(folded_term))
}

/// Verified products ordered by name, optionally filtered by a substring of
/// name or description (case-insensitive)
pub async fn search_products(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<SaasProduct>> {
    let term = search.map(str::trim).filter(|t| !t.is_empty());

    let products = match term {
        Some(term) => {
            let folded = term.to_lowercase();
            sqlx::query_as::<_, SaasProduct>(
                r#"
                SELECT * FROM saas_products
                WHERE status = ?
                ORDER BY name COLLATE NOCASE ASC
                "#,
            )
            .bind(STATUS_VERIFIED)
            .fetch_all(pool)
            .await?
            .into_iter()
            .filter(|p| matches_term(p, &folded))
            .take(SEARCH_LIMIT)
            .collect()
        }
        None => {
            sqlx::query_as::<_, SaasProduct>(
                r#"
                SELECT * FROM saas_products
                WHERE status = ?
                ORDER BY name COLLATE NOCASE ASC
                LIMIT ?
                "#,
            )
            .bind(STATUS_VERIFIED)
            .bind(BROWSE_LIMIT)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(products)
}

/// One `[[product]]` entry of a seed file
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub id: Option<String>,
    pub name: String,
    pub website_url: Option<String>,
    pub logo_url: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub default_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    product: Vec<ProductSeed>,
}

/// Parse a TOML seed document
pub fn parse_seed(content: &str) -> Result<Vec<ProductSeed>> {
    let file: SeedFile = toml::from_str(content)
        .map_err(|e| Error::InvalidInput(format!("Invalid catalog seed: {}", e)))?;
    Ok(file.product)
}

/// Upsert seed products by id, returning how many rows were written
pub async fn upsert_products(pool: &SqlitePool, seeds: &[ProductSeed]) -> Result<usize> {
    let mut tx = pool.begin().await?;

    for seed in seeds {
        if seed.name.trim().is_empty() {
            return Err(Error::InvalidInput("Catalog product without a name".to_string()));
        }
        let id = seed
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO saas_products
                (id, name, website_url, logo_url, category, description, status, default_cost, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                website_url = excluded.website_url,
                logo_url = excluded.logo_url,
                category = excluded.category,
                description = excluded.description,
                status = excluded.status,
                default_cost = excluded.default_cost
            "#,
        )
        .bind(&id)
        .bind(seed.name.trim())
        .bind(&seed.website_url)
        .bind(&seed.logo_url)
        .bind(&seed.category)
        .bind(&seed.description)
        .bind(seed.status.as_deref().unwrap_or(STATUS_VERIFIED))
        .bind(seed.default_cost)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(seeds.len())
}

/// Load a TOML seed file into the catalog
pub async fn seed_catalog_file(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let seeds = parse_seed(&content)?;
    let count = upsert_products(pool, &seeds).await?;
    info!("Seeded {} catalog products from {}", count, path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    const SEED: &str = r#"
        [[product]]
        id = "figma"
        name = "Figma"
        category = "Design"
        description = "Collaborative interface design"
        default_cost = 15.0

        [[product]]
        id = "slack"
        name = "Slack"
        description = "Team chat with 100% more channels"

        [[product]]
        id = "unknown-tool"
        name = "Acme Design Suite"
        status = "pending"
    "#;

    async fn seeded() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        let seeds = parse_seed(SEED).unwrap();
        assert_eq!(upsert_products(&pool, &seeds).await.unwrap(), 3);
        pool
    }

    #[tokio::test]
    async fn test_browse_returns_only_verified_sorted() {
        let pool = seeded().await;
        let products = search_products(&pool, None).await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Figma", "Slack"]);
        assert_eq!(products[0].default_cost, Some(15.0));
    }

    #[tokio::test]
    async fn test_search_matches_name_or_description_case_insensitive() {
        let pool = seeded().await;

        let by_name = search_products(&pool, Some("FIG")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "figma");

        let by_description = search_products(&pool, Some("interface")).await.unwrap();
        assert_eq!(by_description[0].id, "figma");

        // Pending products never match
        assert!(search_products(&pool, Some("Acme")).await.unwrap().is_empty());

        // Blank search behaves like browsing
        assert_eq!(search_products(&pool, Some("   ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let pool = seeded().await;
        let hits = search_products(&pool, Some("100%")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "slack");

        assert!(search_products(&pool, Some("%")).await.unwrap().len() == 1);
        assert!(search_products(&pool, Some("_")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let pool = seeded().await;
        let extra = parse_seed(
            r#"
            [[product]]
            id = "elan"
            name = "Élan Notes"
            description = "Notizen für Teams"
            "#,
        )
        .unwrap();
        upsert_products(&pool, &extra).await.unwrap();

        for term in ["Élan", "élan", "ÉLAN", "FÜR"] {
            let hits = search_products(&pool, Some(term)).await.unwrap();
            assert_eq!(hits.len(), 1, "term {}", term);
            assert_eq!(hits[0].id, "elan");
        }
    }

    #[tokio::test]
    async fn test_reseed_updates_in_place() {
        let pool = seeded().await;
        let updated = parse_seed(
            r#"
            [[product]]
            id = "slack"
            name = "Slack"
            default_cost = 8.75
            "#,
        )
        .unwrap();
        upsert_products(&pool, &updated).await.unwrap();

        let products = search_products(&pool, Some("slack")).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].default_cost, Some(8.75));
    }

    #[test]
    fn test_parse_seed_rejects_invalid_toml() {
        assert!(parse_seed("[[product]]\nname = ").is_err());
        assert!(parse_seed("").unwrap().is_empty());
    }
}
