use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::{CategorizedRow, MappingRule, RawRow};

/// Rules in evaluation order: priority descending, then insertion order.
pub fn load_rules(conn: &Connection, household: &str) -> Result<Vec<MappingRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, keyword, category_id, priority, hit_count FROM mapping_rules \
         WHERE household = ?1 ORDER BY priority DESC, id ASC",
    )?;
    let rules = stmt
        .query_map([household], |row| {
            Ok(MappingRule {
                id: row.get(0)?,
                keyword: row.get(1)?,
                category_id: row.get(2)?,
                priority: row.get(3)?,
                hit_count: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rules)
}

/// First rule whose keyword occurs in the merchant text, ignoring case.
/// `rules` must already be in evaluation order.
pub fn categorize<'a>(merchant: &str, rules: &'a [MappingRule]) -> Option<&'a MappingRule> {
    let merchant = merchant.to_lowercase();
    rules
        .iter()
        .filter(|r| !r.keyword.trim().is_empty())
        .find(|r| merchant.contains(&r.keyword.to_lowercase()))
}

pub fn categorize_rows(rows: Vec<RawRow>, rules: &[MappingRule]) -> Vec<CategorizedRow> {
    rows.into_iter()
        .map(|raw| {
            let rule = categorize(&raw.merchant, rules);
            CategorizedRow {
                category_id: rule.map(|r| r.category_id),
                rule_id: rule.map(|r| r.id),
                raw,
            }
        })
        .collect()
}

/// Bump hit counts for the rules that categorized `rows`.
pub fn record_hits(conn: &Connection, rows: &[CategorizedRow]) -> Result<()> {
    let mut hits: HashMap<i64, i64> = HashMap::new();
    for rule_id in rows.iter().filter_map(|r| r.rule_id) {
        *hits.entry(rule_id).or_default() += 1;
    }
    let mut stmt = conn.prepare_cached("UPDATE mapping_rules SET hit_count = hit_count + ?1 WHERE id = ?2")?;
    for (rule_id, count) in hits {
        stmt.execute([count, rule_id])?;
    }
    Ok(())
}
