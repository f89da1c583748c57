//! CLI command handlers
//!
//! Bridges clap argument parsing with the service layer. Handlers resolve
//! user-facing identifiers (category names, short ids, dates) and print the
//! results; all rules live in the services.

pub mod analytics;
pub mod budget;
pub mod category;
pub mod expense;

pub use analytics::{handle_analytics_command, AnalyticsCommands};
pub use budget::{handle_budget_command, BudgetCommands};
pub use category::{handle_category_command, CategoryCommands};
pub use expense::{handle_expense_command, ExpenseCommands};

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::config::Settings;
use crate::context::RequestContext;
use crate::error::{SpendError, SpendResult};
use crate::models::{Category, CategoryId, Money};
use crate::services::CategoryService;
use crate::storage::Storage;

/// Everything a handler needs for one invocation
pub struct CommandContext<'a> {
    pub storage: &'a Storage,
    pub settings: &'a Settings,
    pub request: RequestContext,
}

impl<'a> CommandContext<'a> {
    pub fn new(storage: &'a Storage, settings: &'a Settings, request: RequestContext) -> Self {
        Self {
            storage,
            settings,
            request,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.settings.currency_symbol
    }

    /// Find a category by name or id
    pub fn resolve_category(&self, identifier: &str) -> SpendResult<Category> {
        CategoryService::new(self.storage).find_category(&self.request, identifier)
    }

    /// Category id -> name, for list views
    pub fn category_names(&self) -> SpendResult<HashMap<CategoryId, String>> {
        use crate::storage::CategoryStore;

        Ok(self
            .storage
            .list_categories(&self.request)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }
}

/// Output format for machine-readable views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Serialize `value` for the json/yaml formats; `None` for text
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> SpendResult<Option<String>> {
    match format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(Some)
            .map_err(|e| SpendError::Json(e.to_string())),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(Some)
            .map_err(|e| SpendError::Config(format!("Failed to render YAML: {}", e))),
    }
}

/// Parse an amount such as "25", "25.50" or "$25.50"
pub fn parse_amount(input: &str) -> SpendResult<Money> {
    Money::parse(input)
        .map_err(|e| SpendError::Validation(format!("Invalid amount '{}': {}", input, e)))
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_date(input: &str) -> SpendResult<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            SpendError::Validation(format!(
                "Invalid date '{}': expected YYYY-MM-DD or RFC 3339",
                input
            ))
        })
}

/// Match a full id or the short `xxx-1a2b3c4d` form shown in listings
pub(crate) fn match_id<'i, T, I>(input: &str, candidates: I, short: impl Fn(&T) -> String) -> Option<T>
where
    T: Copy + std::str::FromStr + PartialEq + 'i,
    I: IntoIterator<Item = &'i T>,
{
    let candidates: Vec<T> = candidates.into_iter().copied().collect();
    if let Ok(id) = input.parse::<T>() {
        if candidates.contains(&id) {
            return Some(id);
        }
    }
    let needle = input.trim().to_lowercase();
    let mut matches = candidates.into_iter().filter(|c| short(c) == needle);
    match (matches.next(), matches.next()) {
        (Some(id), None) => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseId;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2025-03-04").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2025-03-04T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 4, 8, 30, 0).unwrap()
        );
        assert!(parse_date("04/03/2025").unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5").unwrap(), Money::from_cents(1250));
        assert!(parse_amount("abc").unwrap_err().is_validation());
    }

    #[test]
    fn test_match_id_full_and_short() {
        let ids = vec![ExpenseId::new(), ExpenseId::new()];

        let full = ids[1].to_string();
        assert_eq!(match_id(&full, &ids, |id: &ExpenseId| id.short()), Some(ids[1]));

        let short = ids[0].short();
        assert_eq!(match_id(&short, &ids, |id: &ExpenseId| id.short()), Some(ids[0]));

        assert_eq!(match_id("exp-00000000", &ids, |id: &ExpenseId| id.short()), None);
    }

    #[test]
    fn test_render_structured() {
        let value = serde_json::json!({"total": 3000});
        assert!(render_structured(&value, OutputFormat::Text).unwrap().is_none());
        assert!(render_structured(&value, OutputFormat::Json)
            .unwrap()
            .unwrap()
            .contains("\"total\": 3000"));
        assert!(render_structured(&value, OutputFormat::Yaml)
            .unwrap()
            .unwrap()
            .contains("total: 3000"));
    }
}
