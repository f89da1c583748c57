//! Category CLI commands

use clap::Subcommand;

use crate::display::{format_category_details, format_category_list};
use crate::error::{SpendError, SpendResult};
use crate::services::CategoryService;

use super::CommandContext;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a category
    Create {
        /// Category name (unique, case-insensitive)
        name: String,
    },

    /// List categories with usage
    List,

    /// Show category details
    Show {
        /// Category name or ID
        category: String,
    },

    /// Categories with the most expenses
    Top {
        /// Number of categories to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Delete a category with all its budgets and expenses
    Delete {
        /// Category name or ID
        category: String,
        /// Required to confirm the cascade
        #[arg(long)]
        force: bool,
    },
}

/// Handle a category command
pub fn handle_category_command(cx: &CommandContext<'_>, cmd: CategoryCommands) -> SpendResult<()> {
    let service = CategoryService::new(cx.storage);
    let ctx = &cx.request;

    match cmd {
        CategoryCommands::Create { name } => {
            let category = service.create_category(ctx, &name)?;
            println!("Created category '{}' ({})", category.name, category.id.short());
        }

        CategoryCommands::List => {
            let stats = service.list_categories(ctx)?;
            print!("{}", format_category_list(&stats, cx.symbol()));
        }

        CategoryCommands::Show { category } => {
            let category = service.find_category(ctx, &category)?;
            let stats = service
                .list_categories(ctx)?
                .into_iter()
                .find(|s| s.category.id == category.id)
                .ok_or_else(|| SpendError::category_not_found(category.id.to_string()))?;
            print!("{}", format_category_details(&stats, cx.symbol()));
        }

        CategoryCommands::Top { limit } => {
            let stats = service.most_used_categories(ctx, limit)?;
            print!("{}", format_category_list(&stats, cx.symbol()));
        }

        CategoryCommands::Delete { category, force } => {
            let category = service.find_category(ctx, &category)?;
            if !force {
                return Err(SpendError::Validation(format!(
                    "Deleting '{}' also deletes its budgets and expenses; re-run with --force",
                    category.name
                )));
            }

            let removal = service.delete_category(ctx, category.id)?;
            println!(
                "Deleted category '{}' ({} budgets, {} expenses)",
                removal.category.name, removal.budgets_removed, removal.expenses_removed
            );
        }
    }

    Ok(())
}
