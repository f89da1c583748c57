//! Budget display formatting

use std::collections::HashMap;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{BudgetHealth, BudgetStatus, CategoryId};
use crate::services::Reconciliation;

use super::format_percentage;

#[derive(Tabled)]
struct BudgetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Budget")]
    amount: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn status_label(status: &BudgetStatus) -> String {
    if status.expired {
        return "expired".to_string();
    }
    match status.health {
        BudgetHealth::Ok => format!("{} days left", status.days_remaining),
        BudgetHealth::Warning => "warning".to_string(),
        BudgetHealth::Exceeded => "EXCEEDED".to_string(),
    }
}

/// Format budget statuses as a table
pub fn format_budget_list(
    statuses: &[BudgetStatus],
    names: &HashMap<CategoryId, String>,
    currency_symbol: &str,
) -> String {
    if statuses.is_empty() {
        return "No budgets found.".to_string();
    }

    let rows = statuses.iter().map(|s| BudgetRow {
        id: s.budget.id.short(),
        category: names
            .get(&s.budget.category_id)
            .cloned()
            .unwrap_or_else(|| s.budget.category_id.short()),
        period: s.budget.period.to_string(),
        window: format!(
            "{} .. {}",
            s.budget.start.format("%Y-%m-%d"),
            s.budget.end.format("%Y-%m-%d")
        ),
        spent: s.budget.spent.format_with_symbol(currency_symbol),
        amount: s.budget.amount.format_with_symbol(currency_symbol),
        used: format_percentage(s.spent_percentage),
        status: status_label(s),
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

/// Format one budget with its derived figures
pub fn format_budget_details(status: &BudgetStatus, category_name: &str, currency_symbol: &str) -> String {
    let budget = &status.budget;
    let mut output = String::new();
    output.push_str(&format!("Budget:    {}\n", budget.id));
    output.push_str(&format!("Category:  {}\n", category_name));
    output.push_str(&format!("Period:    {}\n", budget.period));
    output.push_str(&format!("Window:    {}\n", budget.window()));
    output.push_str(&format!(
        "Target:    {}\n",
        budget.amount.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!(
        "Spent:     {} ({})\n",
        budget.spent.format_with_symbol(currency_symbol),
        format_percentage(status.spent_percentage)
    ));
    output.push_str(&format!(
        "Remaining: {}\n",
        status.remaining.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!("Status:    {}\n", status_label(status)));
    if budget.clamp_count > 0 {
        output.push_str(&format!(
            "Warning:   spent was clamped at zero {} time(s); run 'budget reconcile'\n",
            budget.clamp_count
        ));
    }
    output
}

pub fn format_reconciliation(report: &Reconciliation, currency_symbol: &str) -> String {
    if report.drift.is_zero() {
        return format!(
            "Budget {} is consistent: spent {}\n",
            report.budget.id.short(),
            report.after.format_with_symbol(currency_symbol)
        );
    }
    format!(
        "Budget {} reconciled: spent {} -> {} (drift {})\n",
        report.budget.id.short(),
        report.before.format_with_symbol(currency_symbol),
        report.after.format_with_symbol(currency_symbol),
        report.drift.format_with_symbol(currency_symbol)
    )
}
