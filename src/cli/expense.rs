//! Expense CLI commands

use clap::Subcommand;

use crate::context::SystemClock;
use crate::display::{format_expense_details, format_expense_list};
use crate::error::{SpendError, SpendResult};
use crate::models::{CategoryFilter, ExpenseId};
use crate::services::{ExpenseLedger, NewExpense};

use super::{match_id, parse_amount, parse_date, CommandContext};

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Category name or ID
        category: String,
        /// Amount (e.g., "12" or "12.50")
        amount: String,
        /// Effective date (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(short = 'D', long)]
        date: Option<String>,
        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Only this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
        /// Maximum number of expenses to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one expense
    Show {
        /// Category name or ID
        category: String,
        /// Expense ID (full or short form)
        expense: String,
    },

    /// Delete an expense and update its budgets
    Delete {
        /// Category name or ID
        category: String,
        /// Expense ID (full or short form)
        expense: String,
    },
}

/// Handle an expense command
pub fn handle_expense_command(cx: &CommandContext<'_>, cmd: ExpenseCommands) -> SpendResult<()> {
    let clock = SystemClock;
    let ledger = ExpenseLedger::new(cx.storage, &clock);
    let ctx = &cx.request;

    match cmd {
        ExpenseCommands::Add {
            category,
            amount,
            date,
            description,
        } => {
            let amount = parse_amount(&amount)?;
            let date = date.as_deref().map(parse_date).transpose()?;
            let category = cx.resolve_category(&category)?;

            let expense = ledger.create_expense(
                ctx,
                NewExpense {
                    category_id: category.id,
                    amount,
                    description,
                    date,
                },
            )?;

            println!(
                "Recorded {} in {} ({})",
                expense.amount.format_with_symbol(cx.symbol()),
                category.name,
                expense.id.short()
            );
        }

        ExpenseCommands::List { category, limit } => {
            let filter = match category {
                Some(identifier) => CategoryFilter::Only(cx.resolve_category(&identifier)?.id),
                None => CategoryFilter::All,
            };

            let mut expenses = ledger.list_expenses(ctx, filter)?;
            let total = expenses.len();
            expenses.truncate(limit);

            print!(
                "{}",
                format_expense_list(
                    &expenses,
                    &cx.category_names()?,
                    cx.symbol(),
                    &cx.settings.date_format
                )
            );
            if total > expenses.len() {
                println!("Showing {} of {} expenses.", expenses.len(), total);
            }
        }

        ExpenseCommands::Show { category, expense } => {
            let category = cx.resolve_category(&category)?;
            let id = resolve_expense_id(cx, &ledger, category.id, &expense)?;
            let expense = ledger.get_expense(ctx, category.id, id)?;
            print!(
                "{}",
                format_expense_details(&expense, &category.name, cx.symbol())
            );
        }

        ExpenseCommands::Delete { category, expense } => {
            let category = cx.resolve_category(&category)?;
            let id = resolve_expense_id(cx, &ledger, category.id, &expense)?;
            let removed = ledger.delete_expense(ctx, category.id, id)?;
            println!(
                "Deleted {} expense {} from {}",
                removed.amount.format_with_symbol(cx.symbol()),
                removed.id.short(),
                category.name
            );
        }
    }

    Ok(())
}

fn resolve_expense_id(
    cx: &CommandContext<'_>,
    ledger: &ExpenseLedger<'_, crate::storage::Storage>,
    category_id: crate::models::CategoryId,
    input: &str,
) -> SpendResult<ExpenseId> {
    let ids: Vec<ExpenseId> = ledger
        .list_expenses(&cx.request, CategoryFilter::Only(category_id))?
        .into_iter()
        .map(|e| e.id)
        .collect();

    match_id(input, &ids, |id: &ExpenseId| id.short())
        .ok_or_else(|| SpendError::expense_not_found(input))
}
