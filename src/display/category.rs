//! Category display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::services::CategoryStats;

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Expenses")]
    expenses: usize,
    #[tabled(rename = "Total")]
    total: String,
}

pub fn format_category_list(stats: &[CategoryStats], currency_symbol: &str) -> String {
    if stats.is_empty() {
        return "No categories found.".to_string();
    }

    let rows = stats.iter().map(|s| CategoryRow {
        id: s.category.id.short(),
        name: s.category.name.clone(),
        expenses: s.expense_count,
        total: s.total_amount.format_with_symbol(currency_symbol),
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n", table)
}

pub fn format_category_details(stats: &CategoryStats, currency_symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Category: {}\n", stats.category.name));
    output.push_str(&format!("ID:       {}\n", stats.category.id));
    output.push_str(&format!(
        "Created:  {}\n",
        stats.category.created_at.format("%Y-%m-%d")
    ));
    output.push_str(&format!("Expenses: {}\n", stats.expense_count));
    output.push_str(&format!(
        "Total:    {}\n",
        stats.total_amount.format_with_symbol(currency_symbol)
    ));
    output
}
