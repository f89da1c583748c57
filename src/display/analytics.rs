//! Analytics report formatting

use crate::models::Expense;
use crate::services::{CategoryAnalytics, ExpenseAnalytics, ExpenseSummary, ExpenseTrend};

use super::format_percentage;

fn describe(expense: &Option<Expense>, currency_symbol: &str) -> String {
    match expense {
        Some(e) => format!(
            "{} on {}{}",
            e.amount.format_with_symbol(currency_symbol),
            e.date.format("%Y-%m-%d"),
            e.description
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        ),
        None => "-".to_string(),
    }
}

fn format_summary(summary: &ExpenseSummary, currency_symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "  Total:            {}\n",
        summary.total.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!("  Expenses:         {}\n", summary.count));
    output.push_str(&format!(
        "  Average per day:  {}{:.2}\n",
        currency_symbol, summary.average_per_day
    ));
    output.push_str(&format!(
        "  Average expense:  {}{:.2}\n",
        currency_symbol, summary.average_expense_amount
    ));
    output.push_str(&format!(
        "  Largest:          {}\n",
        describe(&summary.largest, currency_symbol)
    ));
    output.push_str(&format!(
        "  Smallest:         {}\n",
        describe(&summary.smallest, currency_symbol)
    ));
    output
}

pub fn format_category_analytics(report: &CategoryAnalytics, currency_symbol: &str) -> String {
    let mut output = format!(
        "{} - {} ({})\n",
        report.category_name, report.period, report.window
    );
    output.push_str(&format_summary(&report.summary, currency_symbol));
    output
}

pub fn format_user_analytics(report: &ExpenseAnalytics, currency_symbol: &str) -> String {
    let mut output = format!("All categories - {} ({})\n", report.period, report.window);
    output.push_str(&format_summary(&report.summary, currency_symbol));
    output
}

pub fn format_trend(trend: &ExpenseTrend, currency_symbol: &str) -> String {
    let growth = match trend.growth_rate {
        Some(rate) if rate < 0.0 => format!("-{}", format_percentage(-rate)),
        Some(rate) => format!("+{}", format_percentage(rate)),
        None => "n/a".to_string(),
    };

    let mut output = format!("{} trend: {}\n", trend.period, trend.direction);
    output.push_str(&format!(
        "  Current  ({}): {}\n",
        trend.current_window,
        trend.current_total.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!(
        "  Previous ({}): {}\n",
        trend.previous_window,
        trend.previous_total.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!("  Change: {}\n", growth));
    output
}
