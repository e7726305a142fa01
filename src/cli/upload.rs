use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::fmt::month;
use crate::models::parse_month;
use crate::store::ingest_file;

pub fn run(file: &str, statement_month: &str, person: Option<&str>, provider: Option<&str>) -> Result<()> {
    let statement_month = parse_month(statement_month)?;
    let provider = super::provider_arg(provider)?;
    let (settings, conn) = super::open()?;
    let person = person.unwrap_or(&settings.default_person);

    let import = ingest_file(
        &conn,
        &settings.household,
        &PathBuf::from(file),
        person,
        statement_month,
        provider,
    )?;

    println!(
        "Import {} ({}, {}): {} rows, {} auto-categorized",
        import.id,
        import.provider.name(),
        month(import.statement_month),
        import.total_rows,
        import.matched_rows,
    );
    let unmatched = import.total_rows - import.matched_rows;
    if unmatched > 0 {
        println!(
            "{}",
            format!("{unmatched} rows need a category. Run `cardbook imports show {}`.", import.id).yellow()
        );
    }
    Ok(())
}
