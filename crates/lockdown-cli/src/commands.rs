//! Command implementations
//!
//! Policy that is not the core's business lives here: refusing to clobber
//! existing key files, password confirmation, and picking a store path.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use lockdown_core::{
    CredentialStore, CryptoContext, KeyFiles, KeyGenerator, LockdownError, SecretString, Settings,
};
use tracing::info;

/// Source of interactively entered credentials
pub trait CredentialPrompt {
    fn read_username(&mut self) -> anyhow::Result<String>;

    fn read_password(&mut self, prompt: &str) -> anyhow::Result<SecretString>;
}

/// Prompts on the controlling terminal; passwords are not echoed
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn read_username(&mut self) -> anyhow::Result<String> {
        eprint!("Username: ");
        std::io::stderr().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_password(&mut self, prompt: &str) -> anyhow::Result<SecretString> {
        let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
        Ok(SecretString::new(password))
    }
}

/// Explicit path, else the configured default store
pub fn resolve_store(explicit: Option<PathBuf>, settings: &Settings) -> anyhow::Result<PathBuf> {
    explicit
        .or_else(|| settings.default_store.clone())
        .ok_or_else(|| {
            LockdownError::Validation(
                "No credential store given and no default store configured".to_string(),
            )
            .into()
        })
}

pub fn generate(
    settings: &Settings,
    output: &Path,
    name: Option<&str>,
    force: bool,
    bits: Option<usize>,
) -> anyhow::Result<KeyFiles> {
    let base_name = name.unwrap_or(&settings.key_base_name);
    let targets = KeyFiles::in_directory(output, base_name, &settings.public_key_suffix);

    let existing: Vec<&Path> = [targets.public_key_file(), targets.private_key_file()]
        .into_iter()
        .filter(|path| path.exists())
        .collect();

    if !existing.is_empty() && !force {
        return Err(LockdownError::Validation(format!(
            "Key(s) exist at target location. Use -f to overwrite existing keys ({:?})",
            existing
        ))
        .into());
    }

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let generator = KeyGenerator::new(CryptoContext::new(), bits.unwrap_or(settings.key_bits));
    info!("Generating {}-bit RSA key pair", generator.bits());
    let files = generator
        .generate(targets.public_key_file(), targets.private_key_file())
        .context("Error generating keys")?;

    info!(
        "Key files generated to\n\tPublic: {}\n\tPrivate: {}",
        files.public_key_file().display(),
        files.private_key_file().display()
    );
    Ok(files)
}

pub fn add(
    store_path: &Path,
    lookup_key: &str,
    public_key: &Path,
    prompt: &mut impl CredentialPrompt,
) -> anyhow::Result<()> {
    let store = CredentialStore::load_or_create(store_path)
        .with_context(|| format!("Error opening credential store {}", store_path.display()))?;

    let username = prompt.read_username()?;
    let password = prompt.read_password("Password: ")?;
    if password.is_empty() {
        return Err(LockdownError::Validation("Blank password entered".to_string()).into());
    }

    let confirm = prompt.read_password("Confirm Password: ")?;
    if confirm != password {
        return Err(LockdownError::Validation("Passwords did not match".to_string()).into());
    }
    drop(confirm);

    store
        .add_or_update_credentials(lookup_key, &username, &password, public_key)
        .context("Error writing to credential store")?;
    Ok(())
}

/// Username stored under `lookup_key`; the password is never printed
pub fn access(store_path: &Path, lookup_key: &str, private_key: &Path) -> anyhow::Result<String> {
    let store = CredentialStore::load(store_path)?;
    let username = store
        .access_credentials(lookup_key, private_key, |username, _| username.to_string())
        .context("Error reading credentials")?;
    Ok(username)
}

pub fn delete(store_path: &Path, lookup_key: &str) -> anyhow::Result<()> {
    let store = CredentialStore::load(store_path)?;
    store
        .delete_credentials(lookup_key)
        .context("Error updating credential store")?;
    Ok(())
}

pub fn list(store_path: &Path) -> anyhow::Result<BTreeSet<String>> {
    let store = CredentialStore::load_or_create(store_path)?;
    let lookup_keys = store.lookup_keys().context("Error reading credential store")?;

    info!(
        "Found {} lookup keys in {}",
        lookup_keys.len(),
        store_path.display()
    );
    Ok(lookup_keys)
}

/// Process exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let lockdown = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<LockdownError>());

    match lockdown {
        Some(LockdownError::Validation(_)) => 2,
        Some(LockdownError::NotFound(_)) => 3,
        Some(LockdownError::Format(_)) => 4,
        Some(LockdownError::Crypto(_)) => 5,
        _ => 1,
    }
}
