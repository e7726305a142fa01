mod categories;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod ledger;
mod models;
mod normalize;
mod parser;
mod providers;
mod recurring;
mod rules;
mod settings;
mod sheet;
mod store;
mod workflow;

use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

use cli::{
    CategoriesCommands, Cli, Commands, ExportCommands, ImportsCommands, RecurringCommands, ReviewCommands,
    RulesCommands,
};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then --verbose, then warnings only.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let result = match cli.command {
        Commands::Init { data_dir, household } => cli::init::run(data_dir, household),
        Commands::Status => cli::status::run(),
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, person } => cli::categories::add(&name, person.as_deref()),
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                keyword,
                category,
                priority,
            } => cli::rules::add(&keyword, &category, priority),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Update {
                id,
                keyword,
                category,
                priority,
            } => cli::rules::update(id, keyword.as_deref(), category.as_deref(), priority),
            RulesCommands::Delete { id } => cli::rules::delete(id),
        },
        Commands::Upload {
            file,
            month,
            person,
            provider,
        } => cli::upload::run(&file, &month, person.as_deref(), provider.as_deref()),
        Commands::Imports { command } => match command {
            ImportsCommands::List => cli::imports::list(),
            ImportsCommands::Show { id, raw } => cli::imports::show(id, raw),
            ImportsCommands::Delete { id } => cli::imports::delete(id),
        },
        Commands::Review { command } => match command {
            ReviewCommands::Category { row, category } => cli::review::category(row, &category),
            ReviewCommands::Exclude { row } => cli::review::set_excluded(row, true),
            ReviewCommands::Include { row } => cli::review::set_excluded(row, false),
            ReviewCommands::SaveRule { row, category } => cli::review::save_rule(row, category.as_deref()),
        },
        Commands::Confirm { import } => cli::confirm::run(import),
        Commands::Ledger { limit } => cli::ledger::list(limit),
        Commands::Recurring { command } => match command {
            RecurringCommands::Add {
                name,
                amount,
                person,
                category,
            } => cli::recurring::add(&name, amount, person.as_deref(), category.as_deref()),
            RecurringCommands::List => cli::recurring::list(),
            RecurringCommands::Pause { id } => cli::recurring::set_active(id, false),
            RecurringCommands::Resume { id } => cli::recurring::set_active(id, true),
            RecurringCommands::Check { month, ids } => cli::recurring::check(&month, ids),
            RecurringCommands::Generate { month, ids } => cli::recurring::generate(&month, ids),
        },
        Commands::Export { command } => match command {
            ExportCommands::Transactions { output } => cli::export::transactions(output),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
