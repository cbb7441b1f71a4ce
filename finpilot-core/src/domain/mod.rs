//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod budget;
pub mod category;
pub mod chain;
mod expense;
pub mod money;
pub mod period;
pub mod result;
mod savings;
pub mod user;

pub use budget::{Budget, BudgetPeriod, BudgetStatus, BudgetUpdate, NewBudget};
pub use category::{Category, ExpenseStatus, PaymentMethod};
pub use chain::{compute_digest, ChainLink, DigestInput, GENESIS};
pub use expense::{Expense, ExpenseUpdate, NewExpense, StoredExpense};
pub use savings::{NewSavingsGoal, SavingsGoal, SavingsGoalUpdate};
pub use user::{NewUser, User};
