use comfy_table::{Cell, Table};

use crate::categories::find_category;
use crate::error::Result;
use crate::fmt::{month, won};
use crate::models::parse_month;
use crate::recurring::{
    add_recurring_item, check_duplicate_templates, generate_recurring, list_recurring_items,
    set_recurring_active,
};

/// Explicit ids, or every active item when none are given.
fn selected_ids(conn: &rusqlite::Connection, household: &str, ids: Vec<i64>) -> Result<Vec<i64>> {
    if !ids.is_empty() {
        return Ok(ids);
    }
    Ok(list_recurring_items(conn, household)?
        .into_iter()
        .filter(|item| item.is_active)
        .map(|item| item.id)
        .collect())
}

pub fn add(name: &str, amount: u64, person: Option<&str>, category: Option<&str>) -> Result<()> {
    let (settings, conn) = super::open()?;
    let category_id = category
        .map(|c| find_category(&conn, &settings.household, c).map(|c| c.id))
        .transpose()?;
    let person = person.unwrap_or(&settings.default_person);
    let item = add_recurring_item(&conn, &settings.household, name, amount, person, category_id)?;
    println!("Added recurring item {}: {} {}", item.id, item.name, won(item.amount));
    Ok(())
}

pub fn list() -> Result<()> {
    let (settings, conn) = super::open()?;
    let items = list_recurring_items(&conn, &settings.household)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Person", "Amount", "Active"]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(item.name),
            Cell::new(item.person),
            Cell::new(won(item.amount)),
            Cell::new(if item.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Recurring\n{table}");
    Ok(())
}

pub fn set_active(id: i64, active: bool) -> Result<()> {
    let (settings, conn) = super::open()?;
    set_recurring_active(&conn, &settings.household, id, active)?;
    println!("Recurring item {id} {}", if active { "resumed" } else { "paused" });
    Ok(())
}

pub fn check(raw_month: &str, ids: Vec<i64>) -> Result<()> {
    let target = parse_month(raw_month)?;
    let (settings, conn) = super::open()?;
    let ids = selected_ids(&conn, &settings.household, ids)?;
    let check = check_duplicate_templates(&conn, &settings.household, target, &ids)?;
    println!("{}: {} already generated, {} new", month(target), check.duplicate_ids.len(), check.new_ids.len());
    if !check.duplicate_ids.is_empty() {
        let ids: Vec<String> = check.duplicate_ids.iter().map(i64::to_string).collect();
        println!("Already generated: {}", ids.join(", "));
    }
    Ok(())
}

pub fn generate(raw_month: &str, ids: Vec<i64>) -> Result<()> {
    let target = parse_month(raw_month)?;
    let (settings, conn) = super::open()?;
    let ids = selected_ids(&conn, &settings.household, ids)?;
    let result = generate_recurring(&conn, &settings.household, target, &ids)?;
    println!("{}: {} created, {} skipped (already generated)", month(target), result.created, result.skipped);
    Ok(())
}
