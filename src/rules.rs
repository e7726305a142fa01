use rusqlite::{Connection, OptionalExtension};

use crate::categories::get_category;
use crate::error::{CardbookError, Result};
use crate::models::MappingRule;

/// Priority given to rules created from the review screen.
pub const REVIEW_RULE_PRIORITY: i64 = 10;

/// A rule joined with its category name, for listings.
#[derive(Debug, Clone)]
pub struct RuleListing {
    pub rule: MappingRule,
    pub category_name: String,
}

fn get_rule(conn: &Connection, household: &str, id: i64) -> Result<MappingRule> {
    conn.query_row(
        "SELECT id, keyword, category_id, priority, hit_count FROM mapping_rules \
         WHERE household = ?1 AND id = ?2",
        rusqlite::params![household, id],
        |row| {
            Ok(MappingRule {
                id: row.get(0)?,
                keyword: row.get(1)?,
                category_id: row.get(2)?,
                priority: row.get(3)?,
                hit_count: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| CardbookError::NotFound(format!("rule {id}")))
}

fn validate_keyword(keyword: &str) -> Result<&str> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(CardbookError::Other("Keyword is required".into()));
    }
    Ok(keyword)
}

pub fn create_rule(
    conn: &Connection,
    household: &str,
    keyword: &str,
    category_id: i64,
    priority: i64,
) -> Result<MappingRule> {
    let keyword = validate_keyword(keyword)?;
    get_category(conn, household, category_id)?;
    conn.execute(
        "INSERT INTO mapping_rules (household, keyword, category_id, priority) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![household, keyword, category_id, priority],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            CardbookError::Conflict(format!("a rule for '{keyword}' already exists"))
        }
        other => CardbookError::Db(other),
    })?;
    get_rule(conn, household, conn.last_insert_rowid())
}

/// Insert or retarget the rule for `keyword`, keyed per household.
pub fn upsert_rule(
    conn: &Connection,
    household: &str,
    keyword: &str,
    category_id: i64,
    priority: i64,
) -> Result<MappingRule> {
    let keyword = validate_keyword(keyword)?;
    get_category(conn, household, category_id)?;
    conn.execute(
        "INSERT INTO mapping_rules (household, keyword, category_id, priority) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (household, keyword) DO UPDATE SET category_id = excluded.category_id, priority = excluded.priority",
        rusqlite::params![household, keyword, category_id, priority],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM mapping_rules WHERE household = ?1 AND keyword = ?2",
        [household, keyword],
        |row| row.get(0),
    )?;
    get_rule(conn, household, id)
}

pub fn update_rule(
    conn: &Connection,
    household: &str,
    id: i64,
    keyword: Option<&str>,
    category_id: Option<i64>,
    priority: Option<i64>,
) -> Result<MappingRule> {
    let current = get_rule(conn, household, id)?;
    let keyword = match keyword {
        Some(k) => validate_keyword(k)?.to_string(),
        None => current.keyword,
    };
    let category_id = category_id.unwrap_or(current.category_id);
    get_category(conn, household, category_id)?;
    conn.execute(
        "UPDATE mapping_rules SET keyword = ?1, category_id = ?2, priority = ?3 WHERE id = ?4",
        rusqlite::params![keyword, category_id, priority.unwrap_or(current.priority), id],
    )?;
    get_rule(conn, household, id)
}

pub fn delete_rule(conn: &Connection, household: &str, id: i64) -> Result<MappingRule> {
    let rule = get_rule(conn, household, id)?;
    conn.execute("DELETE FROM mapping_rules WHERE id = ?1", [id])?;
    Ok(rule)
}

pub fn list_rules(conn: &Connection, household: &str) -> Result<Vec<RuleListing>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.keyword, r.category_id, r.priority, r.hit_count, c.name \
         FROM mapping_rules r JOIN categories c ON r.category_id = c.id \
         WHERE r.household = ?1 ORDER BY r.keyword ASC",
    )?;
    let rows = stmt
        .query_map([household], |row| {
            Ok(RuleListing {
                rule: MappingRule {
                    id: row.get(0)?,
                    keyword: row.get(1)?,
                    category_id: row.get(2)?,
                    priority: row.get(3)?,
                    hit_count: row.get(4)?,
                },
                category_name: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
