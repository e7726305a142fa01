use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{month, won};
use crate::models::ImportStatus;
use crate::store::{delete_import, get_import, list_imports, list_rows};

fn status_label(status: ImportStatus) -> String {
    match status {
        ImportStatus::Reviewing => status.key().yellow().to_string(),
        ImportStatus::Confirmed => status.key().green().to_string(),
        ImportStatus::Cancelled => status.key().dimmed().to_string(),
    }
}

pub fn list() -> Result<()> {
    let (settings, conn) = super::open()?;
    let imports = list_imports(&conn, &settings.household)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Month", "Card", "Person", "File", "Rows", "Matched", "Status"]);
    for import in imports {
        table.add_row(vec![
            Cell::new(import.id),
            Cell::new(month(import.statement_month)),
            Cell::new(import.provider.name()),
            Cell::new(import.person),
            Cell::new(import.file_name),
            Cell::new(import.total_rows),
            Cell::new(import.matched_rows),
            Cell::new(status_label(import.status)),
        ]);
    }
    println!("Imports\n{table}");
    Ok(())
}

/// Original cells as stored at upload, in column order.
fn original_cells(original_data: Option<&str>) -> Result<String> {
    let Some(json) = original_data else {
        return Ok(String::new());
    };
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut cells: Vec<(usize, String)> = map
        .into_iter()
        .map(|(col, value)| {
            let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            (col.parse().unwrap_or(usize::MAX), text)
        })
        .collect();
    cells.sort_by_key(|(col, _)| *col);
    Ok(cells.into_iter().map(|(_, text)| text).collect::<Vec<_>>().join(" | "))
}

pub fn show(id: i64, raw: bool) -> Result<()> {
    let (settings, conn) = super::open()?;
    let import = get_import(&conn, &settings.household, id)?;
    let rows = list_rows(&conn, &settings.household, id)?;

    println!(
        "Import {} | {} | {} | {} | {}",
        import.id,
        month(import.statement_month),
        import.provider.name(),
        import.person,
        status_label(import.status),
    );
    println!("File:       {}", import.file_name);
    if let Some(checksum) = &import.checksum {
        println!("SHA-256:    {}", &checksum[..checksum.len().min(16)]);
    }
    println!("Uploaded:   {}", import.created_at);
    if let Some(confirmed_at) = &import.confirmed_at {
        println!("Confirmed:  {confirmed_at}");
    }

    let mut table = Table::new();
    let mut header = vec!["Row", "Date", "Merchant", "Amount", "Category", ""];
    if raw {
        header.push("Original");
    }
    table.set_header(header);
    let mut total = 0u64;
    for row in rows {
        if !row.is_excluded {
            total += row.amount;
        }
        let category = match (row.is_matched, row.category_name) {
            (true, Some(name)) => name,
            _ => "(uncategorized)".red().to_string(),
        };
        let mut flags = Vec::new();
        if row.is_excluded {
            flags.push("excluded");
        }
        if row.is_foreign_currency {
            flags.push("foreign");
        }
        let mut cells = vec![
            Cell::new(row.id),
            Cell::new(row.transaction_date.format("%Y-%m-%d")),
            Cell::new(row.merchant_name),
            Cell::new(won(row.amount)),
            Cell::new(category),
            Cell::new(flags.join(",")),
        ];
        if raw {
            cells.push(Cell::new(original_cells(row.original_data.as_deref())?));
        }
        table.add_row(cells);
    }
    println!("{table}");
    println!("Total (excluding excluded rows): {}", won(total).bold());
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (settings, conn) = super::open()?;
    let import = delete_import(&conn, &settings.household, id)?;
    println!("Deleted import {} ({} rows)", import.id, import.total_rows);
    Ok(())
}
