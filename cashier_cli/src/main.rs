use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;

use cashier_cli::args::{parse_bool, parse_chunk_size, parse_tax_percentage};
use cashier_cli::config::{ConfigManager, get_config};
use cashier_cli::error::CliError;
use cashier_cli::orchestrators::reconcile_orchestrator::ReconcileOrchestrator;
use cashier_cli::orchestrators::subscribe_orchestrator::{SubscribeOrchestrator, SubscribeRequest};
use cashier_cli::terminal;
use cashier_core::{Customer, Database};

#[derive(Parser)]
#[command(name = "cashier")]
#[command(author, version, about = "Cashier - multi-plan Stripe subscriptions and status reconciliation", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh stored subscription statuses from Stripe
    UpdateSubscriptionStatus {
        /// Subscriptions per chunk [default: reconcile.chunk_size]
        #[arg(value_parser = parse_chunk_size, allow_negative_numbers = true)]
        chunk_size: Option<i64>,

        /// Only subscriptions that were never synced (true/false, yes/no, 1/0)
        /// [default: reconcile.empty_only]
        #[arg(value_parser = parse_bool)]
        empty_only: Option<bool>,
    },

    /// Create a subscription with several plans
    Subscribe(SubscribeRequest),

    /// Manage subscription owners
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CustomerCommand {
    /// Register a subscription owner and print its id
    Add {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Tax percentage applied to the owner's subscriptions
        #[arg(long, value_name = "PERCENT", value_parser = parse_tax_percentage)]
        tax: Option<f64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., reconcile.chunk_size)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., reconcile.chunk_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("cashier_core", log::LevelFilter::Debug)
            .filter_module("cashier_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if !terminal::supports_ansi() {
        colored::control::set_override(false);
    }

    if let Err(error) = run(cli.command).await {
        let error = CliError::from(error);
        eprint!("{}", error.format_for_user(cli.debug));
        std::process::exit(error.exit_code() as i32);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::UpdateSubscriptionStatus {
            chunk_size,
            empty_only,
        } => {
            let config = get_config()?;
            let orchestrator = ReconcileOrchestrator::from_config(&config, chunk_size, empty_only)
                .await
                .context("Failed to start reconciliation")?;
            orchestrator.run().await?;
        }
        Commands::Subscribe(request) => {
            let config = get_config()?;
            let orchestrator = SubscribeOrchestrator::from_config(&config)
                .await
                .context("Failed to prepare subscription")?;
            orchestrator.subscribe(&request).await?;
        }
        Commands::Customer { command } => customer_command(command).await?,
        Commands::Config { command } => config_command(command)?,
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

async fn customer_command(command: CustomerCommand) -> Result<()> {
    match command {
        CustomerCommand::Add { name, email, tax } => {
            let config = get_config()?;
            let db_path = config.database_path();
            let db = Database::new(&db_path)
                .await
                .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

            let mut customer = Customer::new(name, email);
            customer.tax_percentage = tax;
            let id = db
                .customers()
                .create(&customer)
                .await
                .context("Failed to store customer")?;

            println!("{id}");
            eprintln!("{}", format!("Created customer #{id}").green());
        }
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            eprintln!("{}", format!("Set {key}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());

            let mut current_section = "";
            for (key, value) in &items {
                let (section, name) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if section != current_section {
                    eprintln!();
                    eprintln!("[{}]", section.yellow());
                    current_section = section;
                }
                eprintln!("  {} = {}", name.cyan(), value);
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
