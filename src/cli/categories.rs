use comfy_table::{Cell, Table};

use crate::categories::{add_category, list_categories};
use crate::error::Result;

pub fn add(name: &str, person: Option<&str>) -> Result<()> {
    let (settings, conn) = super::open()?;
    let category = add_category(&conn, &settings.household, name, person)?;
    println!("Added category: {} (ID {})", category.name, category.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let (settings, conn) = super::open()?;
    let categories = list_categories(&conn, &settings.household)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Person"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.person.unwrap_or_default()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
