use crate::categories::find_category;
use crate::error::{CardbookError, Result};
use crate::store::{get_row, set_row_category, set_row_excluded};
use crate::workflow::save_rule_from_row;

pub fn category(row_id: i64, category: &str) -> Result<()> {
    let (settings, conn) = super::open()?;
    let cat = find_category(&conn, &settings.household, category)?;
    let row = set_row_category(&conn, &settings.household, row_id, cat.id)?;
    println!("Row {}: {} \u{2192} {}", row.id, row.merchant_name, cat.name);
    Ok(())
}

pub fn set_excluded(row_id: i64, excluded: bool) -> Result<()> {
    let (settings, conn) = super::open()?;
    let row = set_row_excluded(&conn, &settings.household, row_id, excluded)?;
    let verb = if row.is_excluded { "excluded" } else { "included" };
    println!("Row {}: {} {verb}", row.id, row.merchant_name);
    Ok(())
}

pub fn save_rule(row_id: i64, category: Option<&str>) -> Result<()> {
    let (settings, conn) = super::open()?;
    let row = get_row(&conn, &settings.household, row_id)?;
    let category_id = match category {
        Some(name) => find_category(&conn, &settings.household, name)?.id,
        None => row.category_id.ok_or_else(|| {
            CardbookError::InvalidState(format!("row {row_id} has no category, pass --category"))
        })?,
    };
    let rule = save_rule_from_row(&conn, &settings.household, &row.merchant_name, category_id)?;
    println!("Saved rule {}: '{}' (priority {})", rule.id, rule.keyword, rule.priority);
    Ok(())
}
