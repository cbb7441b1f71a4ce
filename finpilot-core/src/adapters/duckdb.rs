//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::{params, Connection, Row};
use rust_decimal::Decimal;
use sqlparser::ast::Statement;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Budget, Category, Expense, NewBudget, NewSavingsGoal, NewUser, SavingsGoal, StoredExpense,
    User,
};
use crate::ports::{QueryResult, Repository};
use crate::services::{MigrationResult, MigrationService};

/// Parse SQL up front so malformed statements never reach the engine
fn parse_sql(sql: &str) -> Result<Vec<Statement>> {
    let dialect = DuckDbDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| {
        let msg = e.to_string();
        let cleaned = msg.trim_start_matches("sql parser error: ");
        Error::validation(cleaned.to_string())
    })
}

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, phone_number, \
     monthly_budget::VARCHAR, created_at::VARCHAR, updated_at::VARCHAR, is_active";

const EXPENSE_COLUMNS: &str = "id, user_id, seq, amount::VARCHAR, description, \
     occurred_at::VARCHAR, category, payment_method, payee, reference_no, status, digest, \
     link_state, previous_digest, unlink_reason, original_digest, created_at::VARCHAR, \
     deleted_at::VARCHAR";

const BUDGET_COLUMNS: &str = "id, user_id, name, category, limit_amount::VARCHAR, period, \
     is_rollover, start_date::VARCHAR, created_at::VARCHAR, updated_at::VARCHAR";

const GOAL_COLUMNS: &str = "id, user_id, name, target_amount::VARCHAR, current_amount::VARCHAR, \
     deadline::VARCHAR, description, created_at::VARCHAR, updated_at::VARCHAR";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff on file locking errors, which show
    /// up when a second process holds the file briefly.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[finpilot] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!(
                "Failed to open database after {} retries",
                MAX_RETRIES
            ))
        }))
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is statically linked via the "json" feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn query_users<P: duckdb::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<User>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, UserRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    fn query_expenses<P: duckdb::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<Expense>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ExpenseRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| row.into_stored()?.into_expense())
            .collect()
    }

    fn query_stored<P: duckdb::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<StoredExpense>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, ExpenseRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(ExpenseRow::into_stored).collect()
    }

    fn query_budgets<P: duckdb::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<Budget>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, BudgetRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(BudgetRow::into_budget).collect()
    }

    fn query_goals<P: duckdb::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<SavingsGoal>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, GoalRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(GoalRow::into_goal).collect()
    }

    fn run_select(&self, conn: &Connection, sql: &str) -> Result<QueryResult> {
        let mut stmt = conn.prepare(sql)?;
        let mut result_rows = stmt.query([])?;

        let mut rows: Vec<Vec<serde_json::Value>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = result_rows.next()? {
            if rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            rows.push((0..column_count).map(|i| column_value(row, i)).collect());
        }

        // Release the borrow on stmt before reading column names
        drop(result_rows);

        let count = if column_count > 0 {
            column_count
        } else {
            stmt.column_count()
        };
        let columns = (0..count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
        })
    }
}

impl Repository for DuckDbRepository {
    // === Users ===

    fn insert_user(&self, user: &NewUser, password_hash: &str, now: NaiveDateTime) -> Result<User> {
        let conn = self.conn()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_users')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, full_name, phone_number,
                                created_at, updated_at, is_active)
             VALUES (?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), TRUE)",
            params![
                id,
                user.username.trim(),
                user.email.trim(),
                password_hash,
                user.full_name,
                user.phone_number,
                sql_timestamp(now),
                sql_timestamp(now),
            ],
        )?;

        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Self::query_users(&conn, &sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("inserted user not found"))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(Self::query_users(&conn, &sql, [id])?.into_iter().next())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        Ok(Self::query_users(&conn, &sql, [username.trim()])?
            .into_iter()
            .next())
    }

    fn find_user_by_phone_suffix(&self, suffix: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM users WHERE is_active AND phone_number IS NOT NULL ORDER BY id",
            USER_COLUMNS
        );
        let users = Self::query_users(&conn, &sql, [])?;
        Ok(users.into_iter().find(|u| {
            u.phone_number
                .as_deref()
                .and_then(crate::domain::user::phone_suffix)
                .as_deref()
                == Some(suffix)
        }))
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET full_name = ?, phone_number = ?,
                    monthly_budget = CAST(? AS DECIMAL(18, 2)), is_active = ?,
                    updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ?",
            params![
                user.full_name,
                user.phone_number,
                user.monthly_budget.map(|d| d.to_string()),
                user.is_active,
                sql_timestamp(user.updated_at),
                user.id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("User {}", user.id)));
        }
        Ok(())
    }

    // === Expenses ===

    fn next_expense_id(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT nextval('seq_expenses')", [], |row| row.get(0))?)
    }

    fn latest_expense(&self, user_id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE user_id = ? ORDER BY seq DESC LIMIT 1",
            EXPENSE_COLUMNS
        );
        Ok(Self::query_expenses(&conn, &sql, [user_id])?
            .into_iter()
            .next())
    }

    fn insert_expense(&self, e: &Expense) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (id, user_id, seq, amount, description, occurred_at, category,
                                   payment_method, payee, reference_no, status, digest, link_state,
                                   previous_digest, unlink_reason, original_digest, created_at,
                                   deleted_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?,
                     ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                e.id,
                e.user_id,
                e.seq,
                e.amount.to_string(),
                e.description,
                sql_timestamp(e.occurred_at),
                e.category.as_str(),
                e.payment_method.as_str(),
                e.payee,
                e.reference_no,
                e.status.as_str(),
                e.digest,
                e.link.kind(),
                e.link.previous_digest(),
                e.link.unlink_reason(),
                e.original_digest,
                sql_timestamp(e.created_at),
                e.deleted_at.map(sql_timestamp),
            ],
        )?;
        Ok(())
    }

    fn update_expense(&self, e: &Expense) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE expenses SET amount = CAST(? AS DECIMAL(18, 2)), description = ?,
                    occurred_at = CAST(? AS TIMESTAMP), category = ?, payment_method = ?,
                    payee = ?, reference_no = ?, status = ?, digest = ?, link_state = ?,
                    previous_digest = ?, unlink_reason = ?, original_digest = ?,
                    deleted_at = CAST(? AS TIMESTAMP)
             WHERE id = ? AND user_id = ?",
            params![
                e.amount.to_string(),
                e.description,
                sql_timestamp(e.occurred_at),
                e.category.as_str(),
                e.payment_method.as_str(),
                e.payee,
                e.reference_no,
                e.status.as_str(),
                e.digest,
                e.link.kind(),
                e.link.previous_digest(),
                e.link.unlink_reason(),
                e.original_digest,
                e.deleted_at.map(sql_timestamp),
                e.id,
                e.user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("Expense {}", e.id)));
        }
        Ok(())
    }

    fn soft_delete_expense(&self, user_id: i64, id: i64, at: NaiveDateTime) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE expenses SET deleted_at = CAST(? AS TIMESTAMP)
             WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
            params![sql_timestamp(at), id, user_id],
        )?;
        Ok(updated > 0)
    }

    fn get_expense(&self, user_id: i64, id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
            EXPENSE_COLUMNS
        );
        Ok(Self::query_expenses(&conn, &sql, [id, user_id])?
            .into_iter()
            .next())
    }

    fn list_expenses(&self, user_id: i64, skip: usize, limit: usize) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE user_id = ? AND deleted_at IS NULL
             ORDER BY occurred_at DESC, seq DESC LIMIT ? OFFSET ?",
            EXPENSE_COLUMNS
        );
        Self::query_expenses(&conn, &sql, [user_id, limit as i64, skip as i64])
    }

    fn chain_expenses(&self, user_id: i64) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE user_id = ? ORDER BY seq",
            EXPENSE_COLUMNS
        );
        Self::query_expenses(&conn, &sql, [user_id])
    }

    fn stored_chain(&self, user_id: i64) -> Result<Vec<StoredExpense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE user_id = ? ORDER BY seq",
            EXPENSE_COLUMNS
        );
        Self::query_stored(&conn, &sql, [user_id])
    }

    fn expenses_between(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses
             WHERE user_id = ? AND deleted_at IS NULL
               AND occurred_at >= CAST(? AS TIMESTAMP) AND occurred_at < CAST(? AS TIMESTAMP)
             ORDER BY seq",
            EXPENSE_COLUMNS
        );
        Self::query_expenses(
            &conn,
            &sql,
            params![user_id, sql_timestamp(start), sql_timestamp(end)],
        )
    }

    // === Budgets ===

    fn insert_budget(&self, user_id: i64, budget: &NewBudget, now: NaiveDateTime) -> Result<Budget> {
        let conn = self.conn()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_budgets')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO budgets (id, user_id, name, category, limit_amount, period, is_rollover,
                                  start_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?, CAST(? AS TIMESTAMP),
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                id,
                user_id,
                budget.name.trim(),
                budget.category.as_str(),
                budget.limit.to_string(),
                budget.period.as_str(),
                budget.is_rollover,
                sql_timestamp(now),
                sql_timestamp(now),
                sql_timestamp(now),
            ],
        )?;

        let sql = format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS);
        Self::query_budgets(&conn, &sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("inserted budget not found"))
    }

    fn get_budget(&self, user_id: i64, id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM budgets WHERE id = ? AND user_id = ?",
            BUDGET_COLUMNS
        );
        Ok(Self::query_budgets(&conn, &sql, [id, user_id])?
            .into_iter()
            .next())
    }

    fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM budgets WHERE user_id = ? ORDER BY id",
            BUDGET_COLUMNS
        );
        Self::query_budgets(&conn, &sql, [user_id])
    }

    fn budgets_for_category(&self, user_id: i64, category: Category) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM budgets WHERE user_id = ? AND category = ? ORDER BY id",
            BUDGET_COLUMNS
        );
        Self::query_budgets(&conn, &sql, params![user_id, category.as_str()])
    }

    fn update_budget(&self, b: &Budget) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE budgets SET name = ?, limit_amount = CAST(? AS DECIMAL(18, 2)), period = ?,
                    is_rollover = ?, updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ? AND user_id = ?",
            params![
                b.name,
                b.limit.to_string(),
                b.period.as_str(),
                b.is_rollover,
                sql_timestamp(b.updated_at),
                b.id,
                b.user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("Budget {}", b.id)));
        }
        Ok(())
    }

    fn delete_budget(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM budgets WHERE id = ? AND user_id = ?",
            [id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // === Savings goals ===

    fn insert_goal(
        &self,
        user_id: i64,
        goal: &NewSavingsGoal,
        now: NaiveDateTime,
    ) -> Result<SavingsGoal> {
        let conn = self.conn()?;
        let id: i64 =
            conn.query_row("SELECT nextval('seq_savings_goals')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO savings_goals (id, user_id, name, target_amount, current_amount,
                                        deadline, description, created_at, updated_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS DECIMAL(18, 2)),
                     CAST(? AS TIMESTAMP), ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))",
            params![
                id,
                user_id,
                goal.name.trim(),
                goal.target_amount.to_string(),
                goal.current_amount.to_string(),
                goal.deadline.map(sql_timestamp),
                goal.description,
                sql_timestamp(now),
                sql_timestamp(now),
            ],
        )?;

        let sql = format!("SELECT {} FROM savings_goals WHERE id = ?", GOAL_COLUMNS);
        Self::query_goals(&conn, &sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("inserted savings goal not found"))
    }

    fn get_goal(&self, user_id: i64, id: i64) -> Result<Option<SavingsGoal>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM savings_goals WHERE id = ? AND user_id = ?",
            GOAL_COLUMNS
        );
        Ok(Self::query_goals(&conn, &sql, [id, user_id])?
            .into_iter()
            .next())
    }

    fn list_goals(&self, user_id: i64) -> Result<Vec<SavingsGoal>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM savings_goals WHERE user_id = ? ORDER BY id",
            GOAL_COLUMNS
        );
        Self::query_goals(&conn, &sql, [user_id])
    }

    fn update_goal(&self, g: &SavingsGoal) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE savings_goals SET name = ?, target_amount = CAST(? AS DECIMAL(18, 2)),
                    current_amount = CAST(? AS DECIMAL(18, 2)), deadline = CAST(? AS TIMESTAMP),
                    description = ?, updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ? AND user_id = ?",
            params![
                g.name,
                g.target_amount.to_string(),
                g.current_amount.to_string(),
                g.deadline.map(sql_timestamp),
                g.description,
                sql_timestamp(g.updated_at),
                g.id,
                g.user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("Savings goal {}", g.id)));
        }
        Ok(())
    }

    fn delete_goal(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM savings_goals WHERE id = ? AND user_id = ?",
            [id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // === Queries ===

    fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let statements = parse_sql(sql)?;
        if statements.is_empty() {
            return Err(Error::validation("Empty query"));
        }
        if !statements.iter().all(|s| matches!(s, Statement::Query(_))) {
            return Err(Error::validation("Only SELECT queries are allowed"));
        }

        let conn = self.conn()?;
        self.run_select(&conn, sql)
    }

    fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let statements = parse_sql(sql)?;
        let is_select = !statements.is_empty()
            && statements.iter().all(|s| matches!(s, Statement::Query(_)));

        let conn = self.conn()?;
        if is_select {
            return self.run_select(&conn, sql);
        }

        let affected = conn.execute(sql, [])?;
        Ok(QueryResult {
            columns: vec!["affected_rows".to_string()],
            rows: vec![vec![serde_json::json!(affected)]],
            row_count: 1,
        })
    }
}

// Raw rows as read from DuckDB; conversion into domain types can fail
// without going through duckdb's error type.

struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    phone_number: Option<String>,
    monthly_budget: Option<String>,
    created_at: String,
    updated_at: String,
    is_active: bool,
}

impl UserRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            full_name: row.get(4)?,
            phone_number: row.get(5)?,
            monthly_budget: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            is_active: row.get(9)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            phone_number: self.phone_number,
            monthly_budget: self.monthly_budget.as_deref().map(parse_decimal).transpose()?,
            created_at: parse_naive_datetime(&self.created_at)?,
            updated_at: parse_naive_datetime(&self.updated_at)?,
            is_active: self.is_active,
        })
    }
}

struct ExpenseRow {
    id: i64,
    user_id: i64,
    seq: i64,
    amount: String,
    description: String,
    occurred_at: String,
    category: String,
    payment_method: String,
    payee: Option<String>,
    reference_no: Option<String>,
    status: String,
    digest: String,
    link_state: String,
    previous_digest: Option<String>,
    unlink_reason: Option<String>,
    original_digest: Option<String>,
    created_at: String,
    deleted_at: Option<String>,
}

impl ExpenseRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            seq: row.get(2)?,
            amount: row.get(3)?,
            description: row.get(4)?,
            occurred_at: row.get(5)?,
            category: row.get(6)?,
            payment_method: row.get(7)?,
            payee: row.get(8)?,
            reference_no: row.get(9)?,
            status: row.get(10)?,
            digest: row.get(11)?,
            link_state: row.get(12)?,
            previous_digest: row.get(13)?,
            unlink_reason: row.get(14)?,
            original_digest: row.get(15)?,
            created_at: row.get(16)?,
            deleted_at: row.get(17)?,
        })
    }

    /// Typed columns are parsed here; text columns are left for the caller
    fn into_stored(self) -> Result<StoredExpense> {
        Ok(StoredExpense {
            id: self.id,
            user_id: self.user_id,
            seq: self.seq,
            amount: parse_decimal(&self.amount)?,
            description: self.description,
            occurred_at: parse_naive_datetime(&self.occurred_at)?,
            category: self.category,
            payment_method: self.payment_method,
            payee: self.payee,
            reference_no: self.reference_no,
            status: self.status,
            digest: self.digest,
            link_state: self.link_state,
            previous_digest: self.previous_digest,
            unlink_reason: self.unlink_reason,
            original_digest: self.original_digest,
            created_at: parse_naive_datetime(&self.created_at)?,
            deleted_at: self
                .deleted_at
                .as_deref()
                .map(parse_naive_datetime)
                .transpose()?,
        })
    }
}

struct BudgetRow {
    id: i64,
    user_id: i64,
    name: String,
    category: String,
    limit: String,
    period: String,
    is_rollover: bool,
    start_date: String,
    created_at: String,
    updated_at: String,
}

impl BudgetRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            limit: row.get(4)?,
            period: row.get(5)?,
            is_rollover: row.get(6)?,
            start_date: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_budget(self) -> Result<Budget> {
        Ok(Budget {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            category: self.category.parse()?,
            limit: parse_decimal(&self.limit)?,
            period: self.period.parse()?,
            is_rollover: self.is_rollover,
            start_date: parse_naive_datetime(&self.start_date)?,
            created_at: parse_naive_datetime(&self.created_at)?,
            updated_at: parse_naive_datetime(&self.updated_at)?,
        })
    }
}

struct GoalRow {
    id: i64,
    user_id: i64,
    name: String,
    target_amount: String,
    current_amount: String,
    deadline: Option<String>,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl GoalRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            target_amount: row.get(3)?,
            current_amount: row.get(4)?,
            deadline: row.get(5)?,
            description: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_goal(self) -> Result<SavingsGoal> {
        Ok(SavingsGoal {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            target_amount: parse_decimal(&self.target_amount)?,
            current_amount: parse_decimal(&self.current_amount)?,
            deadline: self
                .deadline
                .as_deref()
                .map(parse_naive_datetime)
                .transpose()?,
            description: self.description,
            created_at: parse_naive_datetime(&self.created_at)?,
            updated_at: parse_naive_datetime(&self.updated_at)?,
        })
    }
}

/// Convert a result cell into JSON
///
/// Decimals are rendered as strings so amounts survive exactly.
fn column_value(row: &Row<'_>, idx: usize) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => serde_json::Value::Null,
        Ok(ValueRef::Boolean(b)) => serde_json::Value::Bool(b),
        Ok(ValueRef::TinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::SmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Int(i)) => serde_json::json!(i),
        Ok(ValueRef::BigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::HugeInt(i)) => serde_json::json!(i.to_string()),
        Ok(ValueRef::UTinyInt(i)) => serde_json::json!(i),
        Ok(ValueRef::USmallInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UInt(i)) => serde_json::json!(i),
        Ok(ValueRef::UBigInt(i)) => serde_json::json!(i),
        Ok(ValueRef::Float(f)) => serde_json::json!(f),
        Ok(ValueRef::Double(f)) => serde_json::json!(f),
        Ok(ValueRef::Decimal(d)) => serde_json::Value::String(d.to_string()),
        Ok(ValueRef::Text(bytes)) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        Ok(ValueRef::Blob(bytes)) => {
            serde_json::Value::String(format!("<blob {} bytes>", bytes.len()))
        }
        Ok(ValueRef::Date32(days)) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|d| serde_json::Value::String(d.to_string()))
            .unwrap_or(serde_json::Value::Null),
        Ok(ValueRef::Timestamp(_, micros)) => chrono::DateTime::from_timestamp_micros(micros)
            .map(|dt| serde_json::Value::String(dt.naive_utc().to_string()))
            .unwrap_or_else(|| serde_json::json!(micros)),
        _ => serde_json::Value::Null,
    }
}

/// Timestamp literal accepted by `CAST(? AS TIMESTAMP)`
fn sql_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map(|d| d.normalize())
        .map_err(|e| Error::database(format!("invalid decimal '{}': {}", s, e)))
}

fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainLink, ExpenseStatus, PaymentMethod};

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "pw".to_string(),
            full_name: None,
            phone_number: Some("+91 98765 43210".to_string()),
        }
    }

    fn expense(id: i64, user_id: i64, seq: i64) -> Expense {
        Expense {
            id,
            user_id,
            seq,
            amount: Decimal::new(12345, 2),
            description: "Taxi".to_string(),
            occurred_at: ts("2025-02-03 08:15:30.250000"),
            category: Category::Transport,
            payment_method: PaymentMethod::Upi,
            payee: Some("Cab Co".to_string()),
            reference_no: None,
            status: ExpenseStatus::Pending,
            digest: format!("digest-{}", id),
            link: ChainLink::Genesis,
            original_digest: None,
            created_at: ts("2025-02-03 08:15:31"),
            deleted_at: None,
        }
    }

    // ==================== SQL validation ====================

    #[test]
    fn test_valid_select() {
        assert!(parse_sql("SELECT * FROM expenses").is_ok());
        assert!(parse_sql("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
    }

    #[test]
    fn test_malformed_sql() {
        assert!(parse_sql("SELEC * FROM expenses").is_err());
        assert!(parse_sql("SELECT * FROM expenses WHERE (amount > 100").is_err());
        assert!(parse_sql("UPDATE expenses amount = 100").is_err());
    }

    #[test]
    fn test_execute_query_is_read_only() {
        let repo = repo();
        let err = repo.execute_query("DELETE FROM expenses").unwrap_err();
        assert!(err.to_string().contains("Only SELECT"));

        let result = repo.execute_query("SELECT 1 AS one").unwrap();
        assert_eq!(result.columns, vec!["one".to_string()]);
        assert_eq!(result.rows[0][0], serde_json::json!(1));
    }

    #[test]
    fn test_execute_sql_reports_affected_rows() {
        let repo = repo();
        repo.insert_expense(&expense(1, 1, 1)).unwrap();
        let result = repo
            .execute_sql("UPDATE expenses SET amount = 9999 WHERE id = 1")
            .unwrap();
        assert_eq!(result.rows[0][0], serde_json::json!(1));
    }

    // ==================== Round trips ====================

    #[test]
    fn test_expense_round_trip() {
        let repo = repo();
        let original = expense(7, 3, 1);
        repo.insert_expense(&original).unwrap();

        let loaded = repo.get_expense(3, 7).unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(repo.get_expense(4, 7).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_chain_position_is_conflict() {
        let repo = repo();
        repo.insert_expense(&expense(1, 1, 1)).unwrap();
        let err = repo.insert_expense(&expense(2, 1, 1)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {:?}", err);
    }

    #[test]
    fn test_soft_delete_keeps_chain() {
        let repo = repo();
        repo.insert_expense(&expense(1, 1, 1)).unwrap();
        repo.insert_expense(&expense(2, 1, 2)).unwrap();

        assert!(repo.soft_delete_expense(1, 1, ts("2025-02-04 00:00:00")).unwrap());
        assert!(!repo.soft_delete_expense(1, 1, ts("2025-02-04 00:00:00")).unwrap());

        assert_eq!(repo.list_expenses(1, 0, 50).unwrap().len(), 1);
        let chain = repo.chain_expenses(1).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain[0].is_deleted());
        assert_eq!(repo.latest_expense(1).unwrap().unwrap().seq, 2);
    }

    #[test]
    fn test_stored_chain_keeps_unknown_text_columns() {
        let repo = repo();
        repo.insert_expense(&expense(1, 1, 1)).unwrap();
        repo.execute_sql("UPDATE expenses SET category = 'misc', link_state = 'modified' WHERE id = 1")
            .unwrap();

        assert!(repo.chain_expenses(1).is_err());
        let stored = repo.stored_chain(1).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].category, "misc");
        assert_eq!(stored[0].link_state, "modified");
        assert_eq!(stored[0].amount, Decimal::new(12345, 2));
    }

    #[test]
    fn test_user_lookup_by_phone() {
        let repo = repo();
        let now = ts("2025-01-01 00:00:00");
        let user = repo.insert_user(&new_user("ravi"), "hash", now).unwrap();
        assert!(user.is_active);

        let found = repo.find_user_by_phone_suffix("9876543210").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_user_by_phone_suffix("0000000000").unwrap().is_none());

        let dup = repo.insert_user(&new_user("ravi"), "hash", now).unwrap_err();
        assert!(matches!(dup, Error::Conflict(_)));
    }

    #[test]
    fn test_parse_naive_datetime_variants() {
        assert!(parse_naive_datetime("2025-01-15 10:30:00").is_ok());
        assert!(parse_naive_datetime("2025-01-15 10:30:00.123456").is_ok());
        assert!(parse_naive_datetime("garbage").is_err());
    }
}
