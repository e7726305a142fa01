use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{CardbookError, Result};
use crate::ledger::insert_transactions;
use crate::models::{ImportStatus, MappingRule, NewLedgerTransaction, TransactionType};
use crate::rules::{upsert_rule, REVIEW_RULE_PRIORITY};
use crate::store::{get_import, list_rows};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmResult {
    pub import_id: i64,
    pub created: usize,
}

/// Turn every non-excluded row of a reviewed import into an expense in the
/// ledger and lock the import. Runs as a single transaction.
pub fn confirm_import(conn: &Connection, household: &str, import_id: i64) -> Result<ConfirmResult> {
    // Take the write lock before reading the status so a concurrent confirm
    // waits and then sees `confirmed` instead of a stale snapshot.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let import = get_import(&tx, household, import_id)?;
    if import.status != ImportStatus::Reviewing {
        return Err(CardbookError::Conflict(format!(
            "import {import_id} is already {}",
            import.status.key()
        )));
    }

    let txns: Vec<NewLedgerTransaction> = list_rows(&tx, household, import_id)?
        .into_iter()
        .filter(|row| !row.is_excluded)
        .map(|row| NewLedgerTransaction {
            txn_type: TransactionType::Expense,
            category_id: row.category_id,
            person: import.person.clone(),
            description: row.merchant_name,
            amount: row.amount,
            transaction_date: row.transaction_date,
            is_emergency: false,
            card_provider: Some(import.provider),
            card_statement_row_id: Some(row.id),
            recurring_item_id: None,
            memo: None,
        })
        .collect();
    if txns.is_empty() {
        return Err(CardbookError::InvalidState(format!(
            "import {import_id} has no rows left to confirm"
        )));
    }

    let created = insert_transactions(&tx, household, &txns)?;
    let flipped = tx.execute(
        "UPDATE card_imports SET status = ?1, confirmed_at = datetime('now') \
         WHERE id = ?2 AND household = ?3 AND status = ?4",
        rusqlite::params![ImportStatus::Confirmed, import_id, household, ImportStatus::Reviewing],
    )?;
    if flipped == 0 {
        // Dropping `tx` rolls back the ledger rows inserted above.
        return Err(CardbookError::Conflict(format!(
            "import {import_id} was confirmed concurrently"
        )));
    }
    tx.commit()?;

    tracing::info!(import_id, household, created, "confirmed import");
    Ok(ConfirmResult { import_id, created })
}

/// Remember a reviewer's choice for this exact merchant text.
pub fn save_rule_from_row(conn: &Connection, household: &str, merchant: &str, category_id: i64) -> Result<MappingRule> {
    upsert_rule(conn, household, merchant, category_id, REVIEW_RULE_PRIORITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::add_category;
    use crate::categorizer::load_rules;
    use crate::db::get_connection;
    use crate::db::tests::test_db;
    use crate::ledger::list_transactions;
    use crate::store::tests::{samsung_workbook, upload};
    use crate::store::{delete_import, set_row_category, set_row_excluded};

    #[test]
    fn test_confirm_skips_excluded_rows() {
        let (_dir, conn) = test_db();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        let rows = list_rows(&conn, "home", import.id).unwrap();
        assert_eq!(rows.len(), 2);
        set_row_excluded(&conn, "home", rows[1].id, true).unwrap();

        let result = confirm_import(&conn, "home", import.id).unwrap();
        assert_eq!(result.created, 1);

        let confirmed = get_import(&conn, "home", import.id).unwrap();
        assert_eq!(confirmed.status, ImportStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());

        let ledger = list_transactions(&conn, "home").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].description, "스타벅스 강남점");
        assert_eq!(ledger[0].card_statement_row_id, Some(rows[0].id));
        assert_eq!(ledger[0].card_provider.as_deref(), Some("samsung"));
        assert_eq!(ledger[0].txn_type, TransactionType::Expense);
    }

    #[test]
    fn test_second_confirm_conflicts() {
        let (_dir, conn) = test_db();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        confirm_import(&conn, "home", import.id).unwrap();
        assert!(matches!(
            confirm_import(&conn, "home", import.id),
            Err(CardbookError::Conflict(_))
        ));
        assert_eq!(list_transactions(&conn, "home").unwrap().len(), 2);
    }

    #[test]
    fn test_confirm_from_second_connection_conflicts() {
        let (dir, conn) = test_db();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        let other = get_connection(&dir.path().join("test.db")).unwrap();
        assert_eq!(get_import(&other, "home", import.id).unwrap().status, ImportStatus::Reviewing);

        confirm_import(&conn, "home", import.id).unwrap();
        assert!(matches!(
            confirm_import(&other, "home", import.id),
            Err(CardbookError::Conflict(_))
        ));
        assert_eq!(list_transactions(&other, "home").unwrap().len(), 2);
    }

    #[test]
    fn test_failed_ledger_insert_rolls_back_confirm() {
        let (_dir, conn) = test_db();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_ledger BEFORE INSERT ON transactions \
             BEGIN SELECT RAISE(ABORT, 'ledger is read-only'); END;",
        )
        .unwrap();

        assert!(matches!(
            confirm_import(&conn, "home", import.id),
            Err(CardbookError::Db(_))
        ));
        let after = get_import(&conn, "home", import.id).unwrap();
        assert_eq!(after.status, ImportStatus::Reviewing);
        assert!(after.confirmed_at.is_none());
        assert!(list_transactions(&conn, "home").unwrap().is_empty());

        conn.execute_batch("DROP TRIGGER reject_ledger;").unwrap();
        assert_eq!(confirm_import(&conn, "home", import.id).unwrap().created, 2);
    }

    #[test]
    fn test_confirm_missing_import() {
        let (_dir, conn) = test_db();
        assert!(matches!(confirm_import(&conn, "home", 42), Err(CardbookError::NotFound(_))));
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        assert!(matches!(
            confirm_import(&conn, "elsewhere", import.id),
            Err(CardbookError::NotFound(_))
        ));
    }

    #[test]
    fn test_confirm_all_excluded_is_invalid() {
        let (_dir, conn) = test_db();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        for row in list_rows(&conn, "home", import.id).unwrap() {
            set_row_excluded(&conn, "home", row.id, true).unwrap();
        }
        assert!(matches!(
            confirm_import(&conn, "home", import.id),
            Err(CardbookError::InvalidState(_))
        ));
        assert_eq!(get_import(&conn, "home", import.id).unwrap().status, ImportStatus::Reviewing);
        assert!(list_transactions(&conn, "home").unwrap().is_empty());
    }

    #[test]
    fn test_confirmed_import_is_frozen() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "home", "식비", None).unwrap();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        let row_id = list_rows(&conn, "home", import.id).unwrap()[0].id;
        confirm_import(&conn, "home", import.id).unwrap();

        assert!(matches!(
            set_row_category(&conn, "home", row_id, food.id),
            Err(CardbookError::Forbidden(_))
        ));
        assert!(matches!(
            set_row_excluded(&conn, "home", row_id, true),
            Err(CardbookError::Forbidden(_))
        ));
        assert!(matches!(
            delete_import(&conn, "home", import.id),
            Err(CardbookError::Forbidden(_))
        ));
    }

    #[test]
    fn test_confirm_carries_reviewed_category() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "home", "식비", None).unwrap();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        let rows = list_rows(&conn, "home", import.id).unwrap();
        set_row_category(&conn, "home", rows[1].id, food.id).unwrap();
        confirm_import(&conn, "home", import.id).unwrap();

        let ledger = list_transactions(&conn, "home").unwrap();
        let gs25 = ledger.iter().find(|t| t.description == "GS25 역삼점").unwrap();
        assert_eq!(gs25.category_name.as_deref(), Some("식비"));
        let starbucks = ledger.iter().find(|t| t.description == "스타벅스 강남점").unwrap();
        assert_eq!(starbucks.category_name, None);
    }

    #[test]
    fn test_save_rule_from_row_upserts() {
        let (_dir, conn) = test_db();
        let cafe = add_category(&conn, "home", "카페", None).unwrap();
        let food = add_category(&conn, "home", "식비", None).unwrap();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        let before = list_rows(&conn, "home", import.id).unwrap();

        save_rule_from_row(&conn, "home", "스타벅스 강남점", cafe.id).unwrap();
        let rule = save_rule_from_row(&conn, "home", "스타벅스 강남점", food.id).unwrap();
        assert_eq!(rule.priority, REVIEW_RULE_PRIORITY);
        assert_eq!(rule.category_id, food.id);
        assert_eq!(load_rules(&conn, "home").unwrap().len(), 1);

        let after = list_rows(&conn, "home", import.id).unwrap();
        assert_eq!(before[0].category_id, after[0].category_id);
    }

    #[test]
    fn test_saved_rule_applies_to_next_upload() {
        let (_dir, conn) = test_db();
        let cafe = add_category(&conn, "home", "카페", None).unwrap();
        save_rule_from_row(&conn, "home", "스타벅스 강남점", cafe.id).unwrap();
        let import = upload(&conn, "home", &samsung_workbook()).unwrap();
        assert_eq!(import.matched_rows, 1);
    }
}
