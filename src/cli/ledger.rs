use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::won;
use crate::ledger::list_transactions;

pub fn list(limit: usize) -> Result<()> {
    let (settings, conn) = super::open()?;
    let entries = list_transactions(&conn, &settings.household)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Type", "Person", "Category", "Description", "Amount", "Source"]);
    for e in entries.iter().take(limit) {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.transaction_date.format("%Y-%m-%d")),
            Cell::new(e.txn_type.label()),
            Cell::new(&e.person),
            Cell::new(e.category_name.as_deref().unwrap_or("-")),
            Cell::new(&e.description),
            Cell::new(won(e.amount)),
            Cell::new(e.source()),
        ]);
    }
    println!("Ledger ({} of {} entries)\n{table}", entries.len().min(limit), entries.len());
    Ok(())
}
