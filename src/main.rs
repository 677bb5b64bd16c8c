use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use userdesk::auth::{NewAccount, UserStore};
use userdesk::config::Config;
use userdesk::ui::{self, actions, Level, Notice, Session};

/// `userdesk` - register, authenticate, list and delete local user accounts.
#[derive(Parser, Debug)]
#[command(name = "userdesk")]
#[command(author, version, about = "Local user account management backed by SQLite.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.userdesk/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database, overriding `database.path` from the config
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommand),

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Print a shell completion script to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Commands that operate on the user database.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Open the interactive console (default when no command is given)
    Ui,

    /// Create the users table if it does not exist
    Init,

    /// Register a new account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Read the password from the first line of stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Check credentials; exits non-zero when they do not match
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password_stdin: bool,
    },

    /// Log in, then print all accounts
    List {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password_stdin: bool,
    },

    /// Delete the account registered with an email address
    Delete {
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the JSON Schema of the configuration file
    Schema,
    /// Write a default configuration file
    Init,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Store(StoreCommand::Ui)) {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "userdesk", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { config_command } => {
            let config = load_config(cli.config.as_deref(), cli.db.as_deref())?;
            run_config_command(config_command, &config)
        }
        Commands::Store(command) => {
            let config = load_config(cli.config.as_deref(), cli.db.as_deref())?;
            let store = open_store(&config)?;
            run_store_command(command, &store)
        }
    }
}

/// Load the config, apply `--db`, then install the log subscriber.
fn load_config(path: Option<&Path>, db: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(db) = db {
        config.database.path = std::path::absolute(db)
            .with_context(|| format!("Invalid database path {}", db.display()))?;
    }
    init_logging(&config.logging.level);
    if !config.has_file() {
        tracing::debug!(path = %config.config_path.display(), "No config file, using defaults");
    }
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build the store and make sure the schema exists.
fn open_store(config: &Config) -> Result<UserStore> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = UserStore::new(db_path, config.store_options());
    store
        .init_schema()
        .with_context(|| format!("Failed to initialise {}", store.db_path().display()))?;
    Ok(store)
}

fn run_store_command(command: StoreCommand, store: &UserStore) -> Result<ExitCode> {
    match command {
        StoreCommand::Ui => {
            ui::console::run(store)?;
            Ok(ExitCode::SUCCESS)
        }
        StoreCommand::Init => {
            println!("User table ready at {}", store.db_path().display());
            Ok(ExitCode::SUCCESS)
        }
        StoreCommand::Register {
            first_name,
            last_name,
            email,
            password_stdin,
        } => {
            let password = read_password(password_stdin, true)?;
            let outcome = actions::register(
                store,
                &NewAccount {
                    first_name: &first_name,
                    last_name: &last_name,
                    email: &email,
                    password: &password,
                },
            );
            Ok(print_notice(&outcome.notice))
        }
        StoreCommand::Login {
            email,
            password_stdin,
        } => {
            let password = read_password(password_stdin, false)?;
            let mut session = Session::new();
            let outcome = actions::login(store, &mut session, &email, &password);
            Ok(print_notice(&outcome.notice))
        }
        StoreCommand::List {
            email,
            password_stdin,
        } => {
            let password = read_password(password_stdin, false)?;
            let mut session = Session::new();
            let login = actions::login(store, &mut session, &email, &password);
            if login.notice.level != Level::Success {
                return Ok(print_notice(&login.notice));
            }
            match actions::database(store, &session) {
                Ok(accounts) => {
                    println!("{}", ui::console::format_table(&accounts));
                    Ok(ExitCode::SUCCESS)
                }
                Err(notice) => Ok(print_notice(&notice)),
            }
        }
        StoreCommand::Delete { email } => {
            let outcome = actions::delete(store, &email);
            Ok(print_notice(&outcome.notice))
        }
    }
}

fn run_config_command(command: ConfigCommands, config: &Config) -> Result<ExitCode> {
    match command {
        ConfigCommands::Show => {
            println!("# {}", config.config_path.display());
            print!(
                "{}",
                toml::to_string_pretty(config).context("Failed to serialize config")?
            );
        }
        ConfigCommands::Schema => println!("{}", Config::json_schema()?),
        ConfigCommands::Init => {
            let fresh = Config {
                config_path: config.config_path.clone(),
                ..Config::default()
            };
            fresh.save_new()?;
            println!("Wrote {}", fresh.config_path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_password(from_stdin: bool, confirm: bool) -> Result<String> {
    if from_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }
    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

/// Print a notice and map its level to the process exit code.
fn print_notice(notice: &Notice) -> ExitCode {
    match notice.level {
        Level::Success => {
            println!("{}", style(&notice.message).green());
            ExitCode::SUCCESS
        }
        Level::Warning => {
            eprintln!("{}", style(&notice.message).yellow());
            ExitCode::FAILURE
        }
        Level::Error => {
            eprintln!("{}", style(&notice.message).red());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_console() {
        let cli = Cli::try_parse_from(["userdesk"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn register_parses_flags() {
        let cli = Cli::try_parse_from([
            "userdesk",
            "--db",
            "/tmp/users.db",
            "register",
            "--first-name",
            "Ana",
            "--last-name",
            "Lee",
            "--email",
            "ana@x.com",
            "--password-stdin",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/users.db")));
        match cli.command {
            Some(Commands::Store(StoreCommand::Register {
                first_name,
                email,
                password_stdin,
                ..
            })) => {
                assert_eq!(first_name, "Ana");
                assert_eq!(email, "ana@x.com");
                assert!(password_stdin);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn completions_and_config_are_not_store_commands() {
        let cli = Cli::try_parse_from(["userdesk", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));

        let cli = Cli::try_parse_from(["userdesk", "config", "schema"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                config_command: ConfigCommands::Schema
            })
        ));

        let cli = Cli::try_parse_from(["userdesk", "init"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Store(StoreCommand::Init))));
    }

    #[test]
    fn db_flag_is_made_absolute() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(
            Some(&tmp.path().join("config.toml")),
            Some(Path::new("relative.db")),
        )
        .unwrap();
        assert!(config.database.path.is_absolute());
        assert!(config.database.path.ends_with("relative.db"));
    }

    #[test]
    fn delete_requires_email() {
        assert!(Cli::try_parse_from(["userdesk", "delete"]).is_err());
    }

    #[test]
    fn open_store_creates_parent_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = tmp.path().join("a").join("b").join("users.db");

        let store = open_store(&config).unwrap();
        assert!(store.db_path().exists());
        assert_eq!(store.count().unwrap(), 0);
    }
}
