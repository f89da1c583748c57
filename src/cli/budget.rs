//! Budget CLI commands

use clap::Subcommand;

use crate::context::SystemClock;
use crate::display::{format_budget_details, format_budget_list, format_reconciliation};
use crate::error::{SpendError, SpendResult};
use crate::models::{BudgetId, CategoryFilter};
use crate::services::{BudgetTracker, BudgetUpdate, NewBudget};
use crate::storage::Storage;

use super::{match_id, parse_amount, CommandContext};

/// Budget subcommands
#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Create a budget starting now
    Create {
        /// Category name or ID
        category: String,
        /// Target amount (e.g., "500" or "500.00")
        amount: String,
        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,
    },

    /// List budgets with their status
    List {
        /// Only this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show one budget
    Show {
        /// Budget ID (full or short form)
        budget: String,
    },

    /// Change a budget's target or period
    Edit {
        /// Budget ID (full or short form)
        budget: String,
        /// New target amount
        #[arg(short, long)]
        amount: Option<String>,
        /// New period (recomputes spent)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Delete a budget
    Delete {
        /// Category name or ID
        category: String,
        /// Budget ID (full or short form)
        budget: String,
    },

    /// Check that spent matches the budget's expenses
    Verify {
        /// Budget ID (full or short form)
        budget: String,
    },

    /// Recompute spent from the budget's expenses
    Reconcile {
        /// Budget ID (full or short form)
        budget: String,
    },
}

/// Handle a budget command
pub fn handle_budget_command(cx: &CommandContext<'_>, cmd: BudgetCommands) -> SpendResult<()> {
    let clock = SystemClock;
    let tracker = BudgetTracker::new(cx.storage, &clock)
        .with_warning_percent(cx.settings.budget_warning_percent);
    let ctx = &cx.request;

    match cmd {
        BudgetCommands::Create {
            category,
            amount,
            period,
        } => {
            let amount = parse_amount(&amount)?;
            let category = cx.resolve_category(&category)?;

            let budget = tracker.create_budget(
                ctx,
                NewBudget {
                    category_id: category.id,
                    amount,
                    period,
                },
            )?;

            println!(
                "Created {} budget of {} for {} ({})",
                budget.period,
                budget.amount.format_with_symbol(cx.symbol()),
                category.name,
                budget.id.short()
            );
            println!("Window: {}", budget.window());
            if budget.spent.is_positive() {
                println!(
                    "Already spent in this window: {}",
                    budget.spent.format_with_symbol(cx.symbol())
                );
            }
        }

        BudgetCommands::List { category } => {
            let filter = match category {
                Some(identifier) => CategoryFilter::Only(cx.resolve_category(&identifier)?.id),
                None => CategoryFilter::All,
            };
            let statuses = tracker.list_budget_statuses(ctx, filter)?;
            print!(
                "{}",
                format_budget_list(&statuses, &cx.category_names()?, cx.symbol())
            );
        }

        BudgetCommands::Show { budget } => {
            let id = resolve_budget_id(cx, &tracker, &budget)?;
            let status = tracker.budget_status(ctx, id)?;
            let names = cx.category_names()?;
            let category_name = names
                .get(&status.budget.category_id)
                .map(String::as_str)
                .unwrap_or("?");
            print!(
                "{}",
                format_budget_details(&status, category_name, cx.symbol())
            );
        }

        BudgetCommands::Edit {
            budget,
            amount,
            period,
        } => {
            if amount.is_none() && period.is_none() {
                return Err(SpendError::Validation(
                    "Nothing to change: pass --amount and/or --period".into(),
                ));
            }
            let amount = amount.as_deref().map(parse_amount).transpose()?;
            let id = resolve_budget_id(cx, &tracker, &budget)?;

            let updated = tracker.update_budget(ctx, id, BudgetUpdate { amount, period })?;
            println!(
                "Updated budget {}: {} {} (spent {})",
                updated.id.short(),
                updated.period,
                updated.amount.format_with_symbol(cx.symbol()),
                updated.spent.format_with_symbol(cx.symbol())
            );
        }

        BudgetCommands::Delete { category, budget } => {
            let category = cx.resolve_category(&category)?;
            let id = resolve_budget_id(cx, &tracker, &budget)?;
            let removed = tracker.delete_budget(ctx, category.id, id)?;
            println!("Deleted budget {} from {}", removed.id.short(), category.name);
        }

        BudgetCommands::Verify { budget } => {
            let id = resolve_budget_id(cx, &tracker, &budget)?;
            let verified = tracker.verify_budget(ctx, id)?;
            println!(
                "Budget {} is consistent: spent {}",
                verified.id.short(),
                verified.spent.format_with_symbol(cx.symbol())
            );
        }

        BudgetCommands::Reconcile { budget } => {
            let id = resolve_budget_id(cx, &tracker, &budget)?;
            let report = tracker.reconcile_budget(ctx, id)?;
            print!("{}", format_reconciliation(&report, cx.symbol()));
        }
    }

    Ok(())
}

fn resolve_budget_id(
    cx: &CommandContext<'_>,
    tracker: &BudgetTracker<'_, Storage>,
    input: &str,
) -> SpendResult<BudgetId> {
    let ids: Vec<BudgetId> = tracker
        .list_budgets(&cx.request, CategoryFilter::All)?
        .into_iter()
        .map(|b| b.id)
        .collect();

    match_id(input, &ids, |id: &BudgetId| id.short())
        .ok_or_else(|| SpendError::budget_not_found(input))
}
