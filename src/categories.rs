use rusqlite::{Connection, OptionalExtension};

use crate::error::{CardbookError, Result};
use crate::models::Category;

fn map_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        person: row.get(2)?,
    })
}

pub fn add_category(conn: &Connection, household: &str, name: &str, person: Option<&str>) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CardbookError::Other("Name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE household = ?1 AND name = ?2 AND is_active = 1)",
        [household, name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(CardbookError::Other(format!("Category name already exists: {name}")));
    }
    conn.execute(
        "INSERT INTO categories (household, name, person) VALUES (?1, ?2, ?3)",
        rusqlite::params![household, name, person],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        person: person.map(str::to_string),
    })
}

pub fn list_categories(conn: &Connection, household: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, person FROM categories \
         WHERE household = ?1 AND is_active = 1 ORDER BY name ASC",
    )?;
    let categories = stmt
        .query_map([household], map_category)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn get_category(conn: &Connection, household: &str, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, person FROM categories WHERE household = ?1 AND id = ?2 AND is_active = 1",
        rusqlite::params![household, id],
        map_category,
    )
    .optional()?
    .ok_or_else(|| CardbookError::NotFound(format!("category {id}")))
}

pub fn find_category(conn: &Connection, household: &str, name: &str) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, person FROM categories WHERE household = ?1 AND name = ?2 AND is_active = 1",
        [household, name.trim()],
        map_category,
    )
    .optional()?
    .ok_or_else(|| CardbookError::NotFound(format!("category '{name}'")))
}
