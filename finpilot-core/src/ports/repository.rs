//! Repository port - persistence abstraction

use chrono::NaiveDateTime;

use crate::domain::result::Result;
use crate::domain::{
    Budget, Category, Expense, NewBudget, NewSavingsGoal, NewUser, SavingsGoal, StoredExpense,
    User,
};

/// Persistence operations the services depend on
///
/// Implementations must be safe to share across threads; serialization of
/// chain appends happens above this layer.
pub trait Repository: Send + Sync {
    // === Users ===

    /// Insert a user with an already hashed password
    fn insert_user(&self, user: &NewUser, password_hash: &str, now: NaiveDateTime) -> Result<User>;

    fn get_user(&self, id: i64) -> Result<Option<User>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Active user whose phone number ends with the given ten digits
    fn find_user_by_phone_suffix(&self, suffix: &str) -> Result<Option<User>>;

    /// Persist mutable profile fields (name, phone, global budget, active flag)
    fn update_user(&self, user: &User) -> Result<()>;

    // === Expenses ===

    /// Allocate the next global expense id
    fn next_expense_id(&self) -> Result<i64>;

    /// Record with the highest chain position for the user, deleted or not
    fn latest_expense(&self, user_id: i64) -> Result<Option<Expense>>;

    fn insert_expense(&self, expense: &Expense) -> Result<()>;

    /// Overwrite every stored column of an existing expense
    fn update_expense(&self, expense: &Expense) -> Result<()>;

    fn soft_delete_expense(&self, user_id: i64, id: i64, at: NaiveDateTime) -> Result<bool>;

    /// Non-deleted expense owned by the user
    fn get_expense(&self, user_id: i64, id: i64) -> Result<Option<Expense>>;

    /// Non-deleted expenses, newest first
    fn list_expenses(&self, user_id: i64, skip: usize, limit: usize) -> Result<Vec<Expense>>;

    /// Every record of the user's chain in append order, including deleted ones
    fn chain_expenses(&self, user_id: i64) -> Result<Vec<Expense>>;

    /// The user's chain in append order as stored, for integrity checks
    fn stored_chain(&self, user_id: i64) -> Result<Vec<StoredExpense>>;

    /// Non-deleted expenses with `start <= occurred_at < end`
    fn expenses_between(
        &self,
        user_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Expense>>;

    // === Budgets ===

    fn insert_budget(&self, user_id: i64, budget: &NewBudget, now: NaiveDateTime) -> Result<Budget>;

    fn get_budget(&self, user_id: i64, id: i64) -> Result<Option<Budget>>;

    fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>>;

    fn budgets_for_category(&self, user_id: i64, category: Category) -> Result<Vec<Budget>>;

    fn update_budget(&self, budget: &Budget) -> Result<()>;

    fn delete_budget(&self, user_id: i64, id: i64) -> Result<bool>;

    // === Savings goals ===

    fn insert_goal(&self, user_id: i64, goal: &NewSavingsGoal, now: NaiveDateTime)
        -> Result<SavingsGoal>;

    fn get_goal(&self, user_id: i64, id: i64) -> Result<Option<SavingsGoal>>;

    fn list_goals(&self, user_id: i64) -> Result<Vec<SavingsGoal>>;

    fn update_goal(&self, goal: &SavingsGoal) -> Result<()>;

    fn delete_goal(&self, user_id: i64, id: i64) -> Result<bool>;

    // === Queries ===

    /// Execute a read-only SQL query
    fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Execute arbitrary SQL (read or write)
    fn execute_sql(&self, sql: &str) -> Result<QueryResult>;
}

/// Result of a SQL query
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}
