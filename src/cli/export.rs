use crate::error::Result;
use crate::ledger::export_transactions_csv;
use crate::settings::shellexpand_path;

pub fn transactions(output: Option<String>) -> Result<()> {
    let (settings, conn) = super::open()?;
    let csv = export_transactions_csv(&conn, &settings.household)?;
    match output {
        Some(path) => {
            let path = shellexpand_path(&path);
            std::fs::write(&path, csv)?;
            println!("Exported transactions to {path}");
        }
        None => println!("{csv}"),
    }
    Ok(())
}
