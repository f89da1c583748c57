//! Budget consistency and analytics behaviour through the public API

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use spendguard::config::SpendPaths;
use spendguard::context::{FixedClock, RequestContext};
use spendguard::models::{Budget, CategoryFilter, CategoryId, Expense, Money, UserId};
use spendguard::services::{
    AnalyticsEngine, BudgetTracker, CategoryService, ExpenseLedger, NewBudget, NewExpense,
};
use spendguard::storage::Storage;
use spendguard::SpendError;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()
}

struct Fixture {
    _temp: TempDir,
    storage: Storage,
    clock: FixedClock,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(SpendPaths::with_base_dir(temp.path().to_path_buf())).unwrap();
        Self {
            _temp: temp,
            storage,
            clock: FixedClock::new(start()),
        }
    }

    /// An independent handle on the same data directory, as a second
    /// process would open it
    fn open_again(&self) -> Storage {
        Storage::open(self.storage.paths().clone()).unwrap()
    }

    fn ledger(&self) -> ExpenseLedger<'_, Storage> {
        ExpenseLedger::new(&self.storage, &self.clock)
    }

    fn tracker(&self) -> BudgetTracker<'_, Storage> {
        BudgetTracker::new(&self.storage, &self.clock)
    }

    fn analytics(&self) -> AnalyticsEngine<'_, Storage> {
        AnalyticsEngine::new(&self.storage, &self.clock)
    }

    fn category(&self, ctx: &RequestContext, name: &str) -> CategoryId {
        CategoryService::new(&self.storage)
            .create_category(ctx, name)
            .unwrap()
            .id
    }

    fn budget(&self, ctx: &RequestContext, category_id: CategoryId, units: i64, period: &str) -> Budget {
        self.tracker()
            .create_budget(
                ctx,
                NewBudget {
                    category_id,
                    amount: Money::from_units(units),
                    period: period.into(),
                },
            )
            .unwrap()
    }

    fn expense(&self, ctx: &RequestContext, category_id: CategoryId, cents: i64, date: DateTime<Utc>) -> Expense {
        self.ledger()
            .create_expense(
                ctx,
                NewExpense {
                    category_id,
                    amount: Money::from_cents(cents),
                    description: None,
                    date: Some(date),
                },
            )
            .unwrap()
    }

    fn spent(&self, ctx: &RequestContext, budget: &Budget) -> Money {
        self.tracker().get_budget(ctx, budget.id).unwrap().spent
    }

    /// Sum of the expenses that should count toward `budget`
    fn expected(&self, ctx: &RequestContext, budget: &Budget) -> Money {
        self.ledger()
            .list_expenses(ctx, CategoryFilter::Only(budget.category_id))
            .unwrap()
            .iter()
            .filter(|e| budget.contains(e.date))
            .map(|e| e.amount)
            .sum()
    }
}

fn user(name: &str) -> RequestContext {
    RequestContext::new(UserId::new(name).unwrap(), StdDuration::from_secs(30))
}

#[test]
fn monthly_budget_starts_empty_with_thirty_day_window() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    let budget = fx.budget(&alice, food, 500, "monthly");

    assert_eq!(budget.spent, Money::zero());
    assert_eq!(budget.start, start());
    assert_eq!(budget.end, start() + Duration::days(30));
}

#[test]
fn expense_create_and_delete_round_trip_spent() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 500, "monthly");

    let expense = fx.expense(&alice, food, 5000, start() + Duration::days(3));
    assert_eq!(fx.spent(&alice, &budget), Money::from_units(50));

    fx.ledger().delete_expense(&alice, food, expense.id).unwrap();
    assert_eq!(fx.spent(&alice, &budget), Money::zero());
}

#[test]
fn category_analytics_for_three_equal_expenses() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    for days_ago in 1..=3 {
        fx.expense(&alice, food, 1000, start() - Duration::days(days_ago));
    }

    let report = fx
        .analytics()
        .category_analytics(&alice, food, "weekly")
        .unwrap();

    assert_eq!(report.category_name, "Food");
    assert_eq!(report.summary.total, Money::from_units(30));
    assert_eq!(report.summary.count, 3);
    assert_eq!(report.summary.average_per_day, 30.0 / 7.0);
    assert!((report.summary.average_per_day - 4.2857).abs() < 1e-4);
    assert_eq!(report.summary.average_expense_amount, 10.0);
}

#[test]
fn analytics_on_empty_window_reports_zero_average() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    // Outside the trailing week
    fx.expense(&alice, food, 1000, start() - Duration::days(8));

    let report = fx
        .analytics()
        .category_analytics(&alice, food, "weekly")
        .unwrap();

    assert_eq!(report.summary.count, 0);
    assert_eq!(report.summary.total, Money::zero());
    assert_eq!(report.summary.average_expense_amount, 0.0);
    assert_eq!(report.summary.average_per_day, 0.0);
    assert!(report.summary.largest.is_none());
    assert!(report.summary.smallest.is_none());

    let user_report = fx.analytics().user_expense_analytics(&alice, "weekly").unwrap();
    assert_eq!(user_report.summary.count, 0);
    assert_eq!(user_report.summary.average_expense_amount, 0.0);
}

#[test]
fn analytics_rejects_unknown_period() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    let err = fx
        .analytics()
        .category_analytics(&alice, food, "daily")
        .unwrap_err();
    assert!(matches!(err, SpendError::InvalidPeriod(_)));

    let err = fx
        .analytics()
        .user_expense_analytics(&alice, "fortnightly")
        .unwrap_err();
    assert!(matches!(err, SpendError::InvalidPeriod(_)));
}

#[test]
fn average_per_day_uses_exact_day_counts() {
    let fx = Fixture::new();
    let alice = user("alice");
    let rent = fx.category(&alice, "Rent");
    fx.expense(&alice, rent, 123_456, start() - Duration::days(2));

    for (label, days) in [("weekly", 7.0), ("monthly", 30.0), ("yearly", 365.0)] {
        let report = fx.analytics().user_expense_analytics(&alice, label).unwrap();
        assert_eq!(report.summary.average_per_day, 1234.56 / days);
    }
}

#[test]
fn new_budget_counts_expenses_already_in_window() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    // Future-dated expenses inside the coming window, and one just outside
    fx.expense(&alice, food, 1500, start() + Duration::days(1));
    fx.expense(&alice, food, 2500, start() + Duration::days(6));
    fx.expense(&alice, food, 9900, start() + Duration::days(8));

    let weekly = fx.budget(&alice, food, 100, "weekly");
    assert_eq!(weekly.spent, Money::from_units(40));

    let monthly = fx.budget(&alice, food, 500, "monthly");
    assert_eq!(monthly.spent, Money::from_units(139));
}

#[test]
fn spent_tracks_expenses_over_mixed_sequences() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let rent = fx.category(&alice, "Rent");

    let weekly = fx.budget(&alice, food, 100, "weekly");
    let monthly = fx.budget(&alice, food, 400, "monthly");
    let yearly_rent = fx.budget(&alice, rent, 12_000, "yearly");
    let budgets = [weekly, monthly, yearly_rent];

    let mut seed: u64 = 0x5eed_cafe;
    let mut next = move |bound: u64| {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (seed >> 33) % bound
    };

    let mut live: Vec<Expense> = Vec::new();
    for step in 0..120 {
        let delete = !live.is_empty() && next(3) == 0;
        if delete {
            let victim = live.remove(next(live.len() as u64) as usize);
            fx.ledger()
                .delete_expense(&alice, victim.category_id, victim.id)
                .unwrap();
        } else {
            let category = if next(2) == 0 { food } else { rent };
            // Spread dates from two days before the windows to well past the monthly end
            let offset = Duration::hours(next(40 * 24) as i64 - 48);
            let cents = 1 + next(20_000) as i64;
            live.push(fx.expense(&alice, category, cents, start() + offset));
        }

        for budget in &budgets {
            assert_eq!(
                fx.spent(&alice, budget),
                fx.expected(&alice, budget),
                "budget {} drifted at step {}",
                budget.id,
                step
            );
        }
    }

    for budget in &budgets {
        assert!(fx.tracker().verify_budget(&alice, budget.id).is_ok());
        assert_eq!(fx.tracker().get_budget(&alice, budget.id).unwrap().clamp_count, 0);
    }
}

#[test]
fn concurrent_creates_and_deletes_lose_no_updates() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 1_000, "monthly");

    let created: Vec<Expense> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let fx = &fx;
                scope.spawn(move || {
                    let ctx = user("alice");
                    (0..8)
                        .map(|i| {
                            fx.expense(&ctx, food, 100 + worker * 10 + i, start() + Duration::hours(i + 1))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total: Money = created.iter().map(|e| e.amount).sum();
    assert_eq!(created.len(), 32);
    assert_eq!(fx.spent(&alice, &budget), total);

    std::thread::scope(|scope| {
        for chunk in created.chunks(8) {
            let fx = &fx;
            scope.spawn(move || {
                let ctx = user("alice");
                for expense in chunk {
                    fx.ledger().delete_expense(&ctx, food, expense.id).unwrap();
                }
            });
        }
    });

    let after = fx.tracker().get_budget(&alice, budget.id).unwrap();
    assert_eq!(after.spent, Money::zero());
    assert_eq!(after.clamp_count, 0);
}

#[test]
fn writes_through_two_handles_on_one_directory_both_land() {
    let fx = Fixture::new();
    // Opened before anything exists, so its in-memory view is empty
    let other = fx.open_again();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 500, "monthly");

    fx.expense(&alice, food, 1000, start() + Duration::days(1));
    ExpenseLedger::new(&other, &fx.clock)
        .create_expense(
            &alice,
            NewExpense {
                category_id: food,
                amount: Money::from_cents(2000),
                description: None,
                date: Some(start() + Duration::days(2)),
            },
        )
        .unwrap();

    let fresh = fx.open_again();
    let expenses = ExpenseLedger::new(&fresh, &fx.clock)
        .list_expenses(&alice, CategoryFilter::All)
        .unwrap();
    assert_eq!(expenses.len(), 2);

    let tracker = BudgetTracker::new(&fresh, &fx.clock);
    assert_eq!(tracker.get_budget(&alice, budget.id).unwrap().spent, Money::from_units(30));
    assert!(tracker.verify_budget(&alice, budget.id).is_ok());
}

#[test]
fn concurrent_writers_on_separate_handles_lose_no_updates() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 1_000, "monthly");

    std::thread::scope(|scope| {
        for worker in 0..3 {
            let fx = &fx;
            scope.spawn(move || {
                let storage = fx.open_again();
                let ledger = ExpenseLedger::new(&storage, &fx.clock);
                let ctx = user("alice");
                for i in 0..5 {
                    ledger
                        .create_expense(
                            &ctx,
                            NewExpense {
                                category_id: food,
                                amount: Money::from_cents(100 + worker * 10 + i),
                                description: None,
                                date: Some(start() + Duration::hours(i + 1)),
                            },
                        )
                        .unwrap();
                }
            });
        }
    });

    let fresh = fx.open_again();
    let expenses = ExpenseLedger::new(&fresh, &fx.clock)
        .list_expenses(&alice, CategoryFilter::All)
        .unwrap();
    assert_eq!(expenses.len(), 15);

    let total = Money::checked_sum(expenses.iter().map(|e| e.amount)).unwrap();
    let tracker = BudgetTracker::new(&fresh, &fx.clock);
    assert_eq!(tracker.get_budget(&alice, budget.id).unwrap().spent, total);
    assert!(tracker.verify_budget(&alice, budget.id).is_ok());
}

#[test]
fn expired_deadline_fails_without_writing() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 100, "weekly");

    let expired = RequestContext::new(UserId::new("alice").unwrap(), StdDuration::ZERO);
    let err = fx
        .ledger()
        .create_expense(
            &expired,
            NewExpense {
                category_id: food,
                amount: Money::from_units(5),
                description: None,
                date: None,
            },
        )
        .unwrap_err();

    assert!(matches!(err, SpendError::Timeout { .. }));
    assert!(fx.ledger().list_expenses(&alice, CategoryFilter::All).unwrap().is_empty());
    assert_eq!(fx.spent(&alice, &budget), Money::zero());
}

#[test]
fn other_users_records_are_not_found() {
    let fx = Fixture::new();
    let alice = user("alice");
    let bob = user("bob");
    let food = fx.category(&alice, "Food");
    let budget = fx.budget(&alice, food, 100, "weekly");
    let expense = fx.expense(&alice, food, 500, start());

    assert!(fx.tracker().get_budget(&bob, budget.id).unwrap_err().is_not_found());
    assert!(fx
        .tracker()
        .delete_budget(&bob, food, budget.id)
        .unwrap_err()
        .is_not_found());
    assert!(fx
        .ledger()
        .delete_expense(&bob, food, expense.id)
        .unwrap_err()
        .is_not_found());
    assert!(fx
        .analytics()
        .category_analytics(&bob, food, "weekly")
        .unwrap_err()
        .is_not_found());

    // Bob cannot file an expense under Alice's category either
    let err = fx
        .ledger()
        .create_expense(
            &bob,
            NewExpense {
                category_id: food,
                amount: Money::from_units(1),
                description: None,
                date: None,
            },
        )
        .unwrap_err();
    assert!(err.is_not_found());

    // The foreign message is the same as for a missing id
    let missing = fx
        .tracker()
        .get_budget(&alice, spendguard::models::BudgetId::new())
        .unwrap_err();
    assert_eq!(
        missing.to_string().split(':').next(),
        fx.tracker().get_budget(&bob, budget.id).unwrap_err().to_string().split(':').next()
    );

    assert_eq!(fx.spent(&alice, &budget), Money::from_units(5));
    assert_eq!(fx.analytics().user_expense_analytics(&bob, "yearly").unwrap().summary.count, 0);
}

#[test]
fn deleting_uncounted_expense_clamps_and_is_reconcilable() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    // Counted by the budget created afterwards through recomputation
    let early = fx.expense(&alice, food, 2000, start() + Duration::days(1));
    let budget = fx.budget(&alice, food, 100, "weekly");
    assert_eq!(budget.spent, Money::from_units(20));

    // Force drift: the budget forgets the expense
    let tracker = fx.tracker();
    tracker.on_expense_deleted(&alice, &early).unwrap();
    assert_eq!(fx.spent(&alice, &budget), Money::zero());

    // Now deleting the real expense has to clamp
    fx.ledger().delete_expense(&alice, food, early.id).unwrap();
    let clamped = tracker.get_budget(&alice, budget.id).unwrap();
    assert_eq!(clamped.spent, Money::zero());
    assert_eq!(clamped.clamp_count, 1);

    let report = tracker.reconcile_budget(&alice, budget.id).unwrap();
    assert_eq!(report.drift, Money::zero());
}

#[test]
fn trend_compares_with_previous_window() {
    let fx = Fixture::new();
    let alice = user("alice");
    let food = fx.category(&alice, "Food");

    fx.expense(&alice, food, 10_000, start() - Duration::days(10));
    fx.expense(&alice, food, 15_000, start() - Duration::days(2));

    let trend = fx
        .analytics()
        .expense_trend(&alice, CategoryFilter::Only(food), "weekly")
        .unwrap();

    assert_eq!(trend.current_total, Money::from_units(150));
    assert_eq!(trend.previous_total, Money::from_units(100));
    assert!((trend.growth_rate.unwrap() - 50.0).abs() < 1e-9);
    assert_eq!(trend.direction, spendguard::services::TrendDirection::Increasing);
}
