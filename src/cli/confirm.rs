use colored::Colorize;

use crate::error::Result;
use crate::workflow::confirm_import;

pub fn run(import_id: i64) -> Result<()> {
    let (settings, conn) = super::open()?;
    let result = confirm_import(&conn, &settings.household, import_id)?;
    println!(
        "{}",
        format!("Import {} confirmed: {} transactions added", result.import_id, result.created).green()
    );
    Ok(())
}
