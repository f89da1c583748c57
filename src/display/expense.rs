//! Expense display formatting

use std::collections::HashMap;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{CategoryId, Expense};

use super::truncate;

#[derive(Tabled)]
struct ExpenseRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Format expenses as a table; `names` maps category ids to display names
pub fn format_expense_list(
    expenses: &[Expense],
    names: &HashMap<CategoryId, String>,
    currency_symbol: &str,
    date_format: &str,
) -> String {
    if expenses.is_empty() {
        return "No expenses found.".to_string();
    }

    let rows = expenses.iter().map(|e| ExpenseRow {
        id: e.id.short(),
        date: e.date.format(date_format).to_string(),
        category: names
            .get(&e.category_id)
            .cloned()
            .unwrap_or_else(|| e.category_id.short()),
        amount: e.amount.format_with_symbol(currency_symbol),
        description: truncate(e.description.as_deref().unwrap_or(""), 40),
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

/// Format a single expense
pub fn format_expense_details(expense: &Expense, category_name: &str, currency_symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Expense:     {}\n", expense.id));
    output.push_str(&format!("Category:    {}\n", category_name));
    output.push_str(&format!(
        "Amount:      {}\n",
        expense.amount.format_with_symbol(currency_symbol)
    ));
    output.push_str(&format!(
        "Date:        {}\n",
        expense.date.format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(description) = &expense.description {
        output.push_str(&format!("Description: {}\n", description));
    }
    output.push_str(&format!(
        "Recorded:    {}\n",
        expense.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, UserId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_list_uses_category_names() {
        let category = CategoryId::new();
        let expense = Expense::new(
            UserId::new("alice").unwrap(),
            category,
            Money::from_cents(1250),
            Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap(),
        )
        .with_description(Some("Bus pass".into()));

        let names = HashMap::from([(category, "Transport".to_string())]);
        let output = format_expense_list(&[expense], &names, "$", "%Y-%m-%d");

        assert!(output.contains("Transport"));
        assert!(output.contains("$12.50"));
        assert!(output.contains("2025-02-03"));
        assert!(output.contains("Bus pass"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            format_expense_list(&[], &HashMap::new(), "$", "%Y-%m-%d"),
            "No expenses found."
        );
    }
}
