//! Seed the price list from a YAML file.
//!
//! Categories and items are upserted by slug, so the command can be re-run
//! after editing prices. The server picks up changes once its five minute
//! price cache expires.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{error, info};

use quick_laundry_server::db::PricingRepository;
use quick_laundry_server::models::PriceList;

use super::{CommandError, connect};

/// Problems that would leave the catalog inconsistent, one line each.
#[must_use]
pub fn validate_price_list(list: &PriceList) -> Vec<String> {
    let mut problems = Vec::new();

    let mut category_slugs = HashSet::new();
    for category in &list.categories {
        if !category_slugs.insert(category.slug.as_str()) {
            problems.push(format!("duplicate category slug `{}`", category.slug));
        }
    }

    let mut item_slugs = HashSet::new();
    for item in &list.items {
        if !item_slugs.insert(item.slug.as_str()) {
            problems.push(format!("duplicate item slug `{}`", item.slug));
        }
        if !category_slugs.contains(item.category.as_str()) {
            problems.push(format!(
                "item `{}` refers to unknown category `{}`",
                item.slug, item.category
            ));
        }
        if item.price.is_sign_negative() {
            problems.push(format!("item `{}` has a negative price", item.slug));
        }
    }

    problems
}

/// Parse a price list without touching the database.
///
/// # Errors
///
/// Returns an error if the YAML does not describe a price list or the list
/// is inconsistent.
pub fn parse_price_list(content: &str) -> Result<PriceList, CommandError> {
    let list: PriceList = serde_yaml::from_str(content)?;

    let problems = validate_price_list(&list);
    if !problems.is_empty() {
        error!("Price list validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(CommandError::PriceListInvalid(problems.len()));
    }

    Ok(list)
}

/// Upsert every category and item in the file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn pricing(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading price list from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: file_path.to_owned(),
            source,
        })?;
    let list = parse_price_list(&content)?;
    info!(
        categories = list.categories.len(),
        items = list.items.len(),
        "Price list validated"
    );

    let pool = connect().await?;
    let repo = PricingRepository::new(&pool);

    let mut category_ids = HashMap::new();
    for category in &list.categories {
        let id = repo.upsert_category(category).await?;
        category_ids.insert(category.slug.as_str(), id);
    }

    for item in &list.items {
        // Validation guarantees every referenced category exists
        if let Some(&category_id) = category_ids.get(item.category.as_str()) {
            repo.upsert_item(category_id, item).await?;
        }
    }

    info!("Seeding complete!");
    info!("  Categories: {}", list.categories.len());
    info!("  Items: {}", list.items.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: "Common Items"
    slug: common-items
    display_order: 1
items:
  - category: common-items
    name: "Shirt"
    slug: shirt
    service_type: iron
    price: "7.00"
    popular: true
  - category: common-items
    name: "Saree"
    slug: saree
    service_type: steam_iron
    price: 40
    gender: women
"#;

    #[test]
    fn test_parse_sample() {
        let list = parse_price_list(SAMPLE).unwrap();
        assert_eq!(list.categories.len(), 1);
        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].popular);
        assert_eq!(list.items[1].price.to_string(), "40");
    }

    #[test]
    fn test_unknown_category_and_duplicates() {
        let mut list: PriceList = serde_yaml::from_str(SAMPLE).unwrap();
        list.items[1].category = "kids".to_string();
        list.items[1].slug = "shirt".to_string();

        let problems = validate_price_list(&list);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("duplicate item slug `shirt`"));
        assert!(problems[1].contains("unknown category `kids`"));
    }

    #[test]
    fn test_bundled_price_list_is_valid() {
        let content = include_str!("../../../../data/pricing.yaml");
        let list = parse_price_list(content).unwrap();
        assert_eq!(list.categories.len(), 5);
        assert_eq!(list.items.len(), 45);
    }
}
