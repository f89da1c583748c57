use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use spendguard::cli::{
    handle_analytics_command, handle_budget_command, handle_category_command,
    handle_expense_command, CommandContext,
};
use spendguard::config::{SpendPaths, Settings};
use spendguard::context::RequestContext;
use spendguard::models::UserId;
use spendguard::storage::Storage;

#[derive(Parser)]
#[command(
    name = "spendguard",
    version,
    about = "Track expenses against per-category budgets",
    long_about = "SpendGuard records expenses by category, keeps each budget's spent \
                  total in step with them and reports spending analytics over \
                  weekly, monthly and yearly windows."
)]
struct Cli {
    /// Owner whose records are used
    #[arg(short, long, global = true, env = "SPENDGUARD_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expense commands
    #[command(subcommand, alias = "exp")]
    Expense(spendguard::cli::ExpenseCommands),

    /// Budget commands
    #[command(subcommand)]
    Budget(spendguard::cli::BudgetCommands),

    /// Category commands
    #[command(subcommand, alias = "cat")]
    Category(spendguard::cli::CategoryCommands),

    /// Spending analytics
    #[command(subcommand)]
    Analytics(spendguard::cli::AnalyticsCommands),

    /// Show recent changes from the audit log
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Create the data directory and default settings
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = SpendPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    spendguard::logging::init(&settings.log_filter);

    let Some(command) = cli.command else {
        println!("SpendGuard - expense tracking against budgets");
        println!();
        println!("Run 'spendguard --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => {
            paths.ensure_directories()?;
            if !paths.settings_file().exists() {
                settings.save(&paths)?;
            }
            println!("Initialized SpendGuard at: {}", paths.base_dir().display());
            return Ok(());
        }
        Commands::Config => {
            println!("SpendGuard Configuration");
            println!("========================");
            println!("Base directory:    {}", paths.base_dir().display());
            println!("Data directory:    {}", paths.data_dir().display());
            println!("Audit log:         {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Currency symbol:   {}", settings.currency_symbol);
            println!("  Date format:       {}", settings.date_format);
            println!("  Operation timeout: {}ms", settings.operation_timeout_ms);
            println!("  Budget warning at: {}%", settings.budget_warning_percent);
            println!("  Log filter:        {}", settings.log_filter);
            return Ok(());
        }
        _ => {}
    }

    let owner = cli
        .user
        .as_deref()
        .and_then(UserId::new)
        .context("No user given: pass --user or set SPENDGUARD_USER")?;

    let request = RequestContext::new(owner, settings.operation_timeout());
    let storage = Storage::open_within(paths, &request)?;
    let cx = CommandContext::new(&storage, &settings, request);

    match command {
        Commands::Expense(cmd) => handle_expense_command(&cx, cmd)?,
        Commands::Budget(cmd) => handle_budget_command(&cx, cmd)?,
        Commands::Category(cmd) => handle_category_command(&cx, cmd)?,
        Commands::Analytics(cmd) => handle_analytics_command(&cx, cmd)?,
        Commands::History { limit } => {
            let entries = storage
                .audit_log()
                .read_recent_for(cx.request.owner().as_str(), limit)?;
            if entries.is_empty() {
                println!("No history yet.");
            }
            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
        Commands::Init | Commands::Config => {}
    }

    Ok(())
}
