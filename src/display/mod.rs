//! Display formatting for terminal output
//!
//! List views are rendered with `tabled`; detail and analytics views are
//! plain aligned text.

pub mod analytics;
pub mod budget;
pub mod category;
pub mod expense;

pub use analytics::{format_category_analytics, format_trend, format_user_analytics};
pub use budget::{format_budget_details, format_budget_list, format_reconciliation};
pub use category::{format_category_details, format_category_list};
pub use expense::{format_expense_details, format_expense_list};

/// Format a percentage with appropriate precision
pub fn format_percentage(pct: f64) -> String {
    if pct < 0.1 && pct > 0.0 {
        format!("{:.2}%", pct)
    } else if pct < 10.0 {
        format!("{:.1}%", pct)
    } else {
        format!("{:.0}%", pct)
    }
}

/// Truncate a string to a maximum number of characters with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
