//! Lockdown CLI - generate RSA key pairs and maintain encrypted credential stores
//!
//! Logs go to stderr so `list` and `access` output on stdout can be piped.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lockdown_core::SettingsManager;
use tracing::error;
use tracing_subscriber::EnvFilter;

use commands::TerminalPrompt;

/// Lockdown - encrypted credential storage with RSA key pairs
#[derive(Parser, Debug)]
#[command(name = "lockdown")]
#[command(version)]
#[command(about = "Lockdown - encrypt credentials with RSA public keys, read them back with the private key")]
struct Args {
    /// Directory containing settings.json (default: platform config directory)
    #[arg(long, global = true, env = "LOCKDOWN_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a public/private RSA key pair
    Generate {
        /// Directory to write the keys to (created if missing)
        #[arg(short, long)]
        output: PathBuf,

        /// Base file name for the keys (default from settings: lockdown_rsa)
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite existing keys at the output location
        #[arg(short, long)]
        force: bool,

        /// RSA modulus size in bits (default from settings: 2048)
        #[arg(long)]
        bits: Option<usize>,
    },

    /// Add or update the credentials stored under a lookup key
    #[command(alias = "addkey")]
    Add {
        /// Key used to reference the credentials in the store
        lookup_key: String,

        /// Credential store to create or add to
        #[arg(short = 'o', long = "output")]
        store: Option<PathBuf>,

        /// Public key used to encrypt the credentials
        #[arg(short = 'k', long = "key")]
        public_key: PathBuf,
    },

    /// Decrypt a stored entry and print its username
    Access {
        lookup_key: String,

        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Private key used to decrypt the credentials
        #[arg(short = 'k', long = "key")]
        private_key: PathBuf,
    },

    /// Delete the credentials stored under a lookup key
    Delete {
        lookup_key: String,

        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// List the lookup keys in a credential store
    List {
        /// Credential store to list
        store: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let settings_manager = match args.config_dir {
        Some(dir) => SettingsManager::new(&dir)?,
        None => SettingsManager::from_default_dir()?,
    };
    let settings = settings_manager.get();

    match args.command {
        Command::Generate {
            output,
            name,
            force,
            bits,
        } => {
            commands::generate(settings, &output, name.as_deref(), force, bits)?;
        }
        Command::Add {
            lookup_key,
            store,
            public_key,
        } => {
            let store = commands::resolve_store(store, settings)?;
            commands::add(&store, &lookup_key, &public_key, &mut TerminalPrompt)?;
        }
        Command::Access {
            lookup_key,
            store,
            private_key,
        } => {
            let store = commands::resolve_store(store, settings)?;
            println!("{}", commands::access(&store, &lookup_key, &private_key)?);
        }
        Command::Delete { lookup_key, store } => {
            let store = commands::resolve_store(store, settings)?;
            commands::delete(&store, &lookup_key)?;
        }
        Command::List { store } => {
            let store = commands::resolve_store(store, settings)?;
            for lookup_key in commands::list(&store)? {
                println!("{}", lookup_key);
            }
        }
    }

    Ok(())
}
