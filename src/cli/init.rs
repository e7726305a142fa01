use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(data_dir: Option<String>, household: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(household) = household {
        settings.household = household.trim().to_string();
    }

    std::fs::create_dir_all(PathBuf::from(&settings.data_dir))?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    let existed = settings_file_exists();
    save_settings(&settings)?;

    println!("Data directory: {}", settings.data_dir);
    println!("Household:      {}", settings.household);
    if existed {
        println!("Settings updated.");
    } else {
        println!("Initialized. Add categories and rules, then `cardbook upload` a statement.");
    }
    Ok(())
}
