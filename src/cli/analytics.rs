//! Analytics CLI commands

use clap::Subcommand;

use crate::context::SystemClock;
use crate::display::{format_category_analytics, format_trend, format_user_analytics};
use crate::error::SpendResult;
use crate::models::CategoryFilter;
use crate::services::AnalyticsEngine;

use super::{render_structured, CommandContext, OutputFormat};

/// Analytics subcommands
#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Statistics for one category over the last period
    Category {
        /// Category name or ID
        category: String,
        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Statistics across all categories over the last period
    Summary {
        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Compare the last period with the one before it
    Trend {
        /// Only this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
        /// weekly, monthly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Handle an analytics command
pub fn handle_analytics_command(cx: &CommandContext<'_>, cmd: AnalyticsCommands) -> SpendResult<()> {
    let clock = SystemClock;
    let engine = AnalyticsEngine::new(cx.storage, &clock);
    let ctx = &cx.request;

    match cmd {
        AnalyticsCommands::Category {
            category,
            period,
            format,
        } => {
            let category = cx.resolve_category(&category)?;
            let report = engine.category_analytics(ctx, category.id, &period)?;
            match render_structured(&report, format)? {
                Some(out) => println!("{}", out),
                None => print!("{}", format_category_analytics(&report, cx.symbol())),
            }
        }

        AnalyticsCommands::Summary { period, format } => {
            let report = engine.user_expense_analytics(ctx, &period)?;
            match render_structured(&report, format)? {
                Some(out) => println!("{}", out),
                None => print!("{}", format_user_analytics(&report, cx.symbol())),
            }
        }

        AnalyticsCommands::Trend {
            category,
            period,
            format,
        } => {
            let filter = match category {
                Some(identifier) => CategoryFilter::Only(cx.resolve_category(&identifier)?.id),
                None => CategoryFilter::All,
            };
            let trend = engine.expense_trend(ctx, filter, &period)?;
            match render_structured(&trend, format)? {
                Some(out) => println!("{}", out),
                None => print!("{}", format_trend(&trend, cx.symbol())),
            }
        }
    }

    Ok(())
}
