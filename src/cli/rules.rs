use comfy_table::{Cell, Table};

use crate::categories::find_category;
use crate::error::Result;
use crate::rules::{create_rule, delete_rule, list_rules, update_rule};

pub fn add(keyword: &str, category: &str, priority: i64) -> Result<()> {
    let (settings, conn) = super::open()?;
    let cat = find_category(&conn, &settings.household, category)?;
    let rule = create_rule(&conn, &settings.household, keyword, cat.id, priority)?;
    println!("Added rule {}: '{}' \u{2192} {}", rule.id, rule.keyword, cat.name);
    Ok(())
}

pub fn list() -> Result<()> {
    let (settings, conn) = super::open()?;
    let rules = list_rules(&conn, &settings.household)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Keyword", "Category", "Priority", "Hits"]);
    for listing in rules {
        table.add_row(vec![
            Cell::new(listing.rule.id),
            Cell::new(listing.rule.keyword),
            Cell::new(listing.category_name),
            Cell::new(listing.rule.priority),
            Cell::new(listing.rule.hit_count),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn update(id: i64, keyword: Option<&str>, category: Option<&str>, priority: Option<i64>) -> Result<()> {
    let (settings, conn) = super::open()?;
    let category_id = category
        .map(|name| find_category(&conn, &settings.household, name).map(|c| c.id))
        .transpose()?;
    let rule = update_rule(&conn, &settings.household, id, keyword, category_id, priority)?;
    println!("Updated rule {}: '{}' (priority {})", rule.id, rule.keyword, rule.priority);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (settings, conn) = super::open()?;
    let rule = delete_rule(&conn, &settings.household, id)?;
    println!("Deleted rule {id}: '{}'", rule.keyword);
    Ok(())
}
