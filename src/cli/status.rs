use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Household:  {}", settings.household);
    println!("Person:     {}", settings.default_person);
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `cardbook init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let count = |sql: &str| -> Result<i64> {
        Ok(conn.query_row(sql, [&settings.household], |r| r.get(0))?)
    };
    let categories = count("SELECT count(*) FROM categories WHERE household = ?1 AND is_active = 1")?;
    let rules = count("SELECT count(*) FROM mapping_rules WHERE household = ?1")?;
    let reviewing = count("SELECT count(*) FROM card_imports WHERE household = ?1 AND status = 'reviewing'")?;
    let confirmed = count("SELECT count(*) FROM card_imports WHERE household = ?1 AND status = 'confirmed'")?;
    let transactions = count("SELECT count(*) FROM transactions WHERE household = ?1")?;

    println!();
    println!("Categories:    {categories}");
    println!("Rules:         {rules}");
    println!("In review:     {reviewing}");
    println!("Confirmed:     {confirmed}");
    println!("Transactions:  {transactions}");
    Ok(())
}
