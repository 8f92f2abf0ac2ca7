//! Encrypted credential store
//!
//! Every operation reloads the record file; mutations rewrite it whole. There
//! is no locking: two writers racing on one file resolve as last writer wins.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::{decode_plaintext, encode_plaintext, CredentialRecord};
use crate::crypto::{KeyMaterial, Private, Public, RsaCipher, SecretString};
use crate::error::{CryptoError, LockdownError, Result};
use crate::storage::RecordFile;

/// Credentials encrypted under RSA public keys, keyed by plain-text lookup keys
#[derive(Debug, Clone)]
pub struct CredentialStore {
    file: RecordFile,
    cipher: RsaCipher,
}

impl CredentialStore {
    fn new(path: PathBuf) -> Self {
        Self {
            file: RecordFile::new(path),
            cipher: RsaCipher::default(),
        }
    }

    /// Open the store at `path`, creating an empty record file if none exists.
    ///
    /// Meant for creation flows; use [`CredentialStore::load`] when the file
    /// must already exist.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path.into());

        if !store.file.exists() && !store.file.create_if_missing()? {
            warn!(
                "Record file appeared at {:?} between the existence check and creation",
                store.file.path()
            );
        }

        Ok(store)
    }

    /// Open an existing store; never creates
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path.into());

        if !store.file.exists() {
            return Err(LockdownError::NotFound(format!(
                "Credential file does not exist at {}",
                store.file.path().display()
            )));
        }

        Ok(store)
    }

    /// Use an explicitly constructed cipher instead of the default one
    pub fn with_cipher(mut self, cipher: RsaCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Location of the record file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Encrypt `username`/`password` under the public key at `public_key_path`
    /// and store the result under `lookup_key`, replacing any previous entry.
    pub fn add_or_update_credentials(
        &self,
        lookup_key: &str,
        username: &str,
        password: &SecretString,
        public_key_path: &Path,
    ) -> Result<()> {
        require_lookup_key(lookup_key)?;
        if password.is_empty() {
            return Err(LockdownError::Validation("Password must not be empty".to_string()));
        }

        let public_key = KeyMaterial::<Public>::read_pem_file(public_key_path)?;
        let plaintext = encode_plaintext(username, password);
        let ciphertext = self.cipher.encrypt(plaintext.expose(), &public_key)?;
        drop(plaintext);

        let record = CredentialRecord::new(lookup_key, ciphertext);

        let mut records = self.file.load()?;
        records.insert(record.lookup_key().to_string(), record.stored_value());
        self.file.save(&records)?;

        info!("Credentials added for lookup key {}", lookup_key);
        Ok(())
    }

    /// Decrypt the credentials stored under `lookup_key` and hand them to `consumer`.
    ///
    /// The decrypted username and password are zeroed once `consumer` returns,
    /// and also if it panics. Whatever `consumer` returns is passed through.
    ///
    /// A block that decrypts but does not hold `base64:base64` fails the same
    /// way as a padding failure, so a wrong key never yields a distinct error.
    pub fn access_credentials<F, R>(
        &self,
        lookup_key: &str,
        private_key_path: &Path,
        consumer: F,
    ) -> Result<R>
    where
        F: FnOnce(&str, &SecretString) -> R,
    {
        require_lookup_key(lookup_key)?;

        let records = self.file.load()?;
        let value = records.get(lookup_key).ok_or_else(|| {
            LockdownError::NotFound(format!("No credentials stored with lookup key {}", lookup_key))
        })?;
        let record = CredentialRecord::from_stored_value(lookup_key, value)?;

        let private_key = KeyMaterial::<Private>::read_pem_file(private_key_path)?;
        let plaintext = self.cipher.decrypt(record.ciphertext(), &private_key)?;
        drop(private_key);

        let (username, password) =
            decode_plaintext(&plaintext).map_err(|_| CryptoError::InvalidPadding)?;
        drop(plaintext);

        debug!("Providing credentials for lookup key {}", lookup_key);
        Ok(consumer(username.expose(), &password))
    }

    /// Remove the entry for `lookup_key`. Removing an absent key is not an error.
    pub fn delete_credentials(&self, lookup_key: &str) -> Result<()> {
        require_lookup_key(lookup_key)?;

        let mut records = self.file.load()?;
        let removed = records.remove(lookup_key).is_some();
        self.file.save(&records)?;

        if removed {
            info!("Credentials deleted for lookup key {}", lookup_key);
        } else {
            debug!("No credentials stored with lookup key {}; nothing deleted", lookup_key);
        }
        Ok(())
    }

    /// All lookup keys currently in the store, sorted. Nothing is decrypted.
    pub fn lookup_keys(&self) -> Result<BTreeSet<String>> {
        Ok(self.file.load()?.into_keys().collect())
    }

    /// Whether an entry exists for `lookup_key`. Nothing is decrypted.
    pub fn contains(&self, lookup_key: &str) -> Result<bool> {
        Ok(self.file.load()?.contains_key(lookup_key))
    }
}

fn require_lookup_key(lookup_key: &str) -> Result<()> {
    if lookup_key.is_empty() {
        return Err(LockdownError::Validation("Lookup key must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoContext, KeyFiles, KeyGenerator};
    use crate::error::FormatError;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        store: CredentialStore,
        keys: KeyFiles,
        other_keys: KeyFiles,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let generator = KeyGenerator::new(CryptoContext::new(), 1024);

        let keys = KeyFiles::in_directory(temp_dir.path(), "test1_rsa", ".pub");
        generator
            .generate(keys.public_key_file(), keys.private_key_file())
            .unwrap();
        let other_keys = KeyFiles::in_directory(temp_dir.path(), "test2_rsa", ".pub");
        generator
            .generate(other_keys.public_key_file(), other_keys.private_key_file())
            .unwrap();

        let store = CredentialStore::load_or_create(temp_dir.path().join("credfile.store")).unwrap();

        Fixture {
            temp_dir,
            store,
            keys,
            other_keys,
        }
    }

    fn read(store: &CredentialStore, lookup_key: &str, keys: &KeyFiles) -> Result<(String, String)> {
        store.access_credentials(lookup_key, keys.private_key_file(), |user, pass| {
            (user.to_string(), pass.expose().to_string())
        })
    }

    #[test]
    fn test_load_or_create_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credfile.store");

        let store = CredentialStore::load_or_create(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(store.path(), path);
        assert!(store.lookup_keys().unwrap().is_empty());

        // Idempotent
        CredentialStore::load_or_create(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credfile.store");

        let result = CredentialStore::load(&path);
        assert!(matches!(result, Err(LockdownError::NotFound(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credfile.store");
        std::fs::write(&path, "").unwrap();

        let store = CredentialStore::load(&path).unwrap();
        assert!(store.lookup_keys().unwrap().is_empty());
    }

    #[test]
    fn test_add_and_access() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let (user, pass) = read(&f.store, "KEY1", &f.keys).unwrap();
        assert_eq!(user, "user1");
        assert_eq!(pass, "pass1");
    }

    #[test]
    fn test_consumer_called_once() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let mut calls = 0;
        f.store
            .access_credentials("KEY1", f.keys.private_key_file(), |_, _| calls += 1)
            .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_consumer_result_passes_through() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let outcome: Result<std::result::Result<(), String>> = f
            .store
            .access_credentials("KEY1", f.keys.private_key_file(), |_, _| Err("rejected".to_string()));
        assert_eq!(outcome.unwrap(), Err("rejected".to_string()));
    }

    #[test]
    fn test_consumer_panic_propagates() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            f.store
                .access_credentials("KEY1", f.keys.private_key_file(), |_, _| panic!("consumer failed"))
        }));
        assert!(result.is_err());

        // Store is untouched by the failed access
        assert!(f.store.contains("KEY1").unwrap());
    }

    #[test]
    fn test_overwrite_keeps_single_record() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();
        f.store
            .add_or_update_credentials("KEY1", "user2", &SecretString::from("pass2"), f.keys.public_key_file())
            .unwrap();

        assert_eq!(f.store.lookup_keys().unwrap().len(), 1);
        let (user, pass) = read(&f.store, "KEY1", &f.keys).unwrap();
        assert_eq!((user.as_str(), pass.as_str()), ("user2", "pass2"));
    }

    #[test]
    fn test_delete_credentials() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();
        f.store
            .add_or_update_credentials("KEY2", "user2", &SecretString::from("pass2"), f.keys.public_key_file())
            .unwrap();

        f.store.delete_credentials("KEY1").unwrap();

        let (user, _) = read(&f.store, "KEY2", &f.keys).unwrap();
        assert_eq!(user, "user2");
        assert!(matches!(read(&f.store, "KEY1", &f.keys), Err(LockdownError::NotFound(_))));
    }

    #[test]
    fn test_delete_absent_is_idempotent() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        f.store.delete_credentials("NOPE").unwrap();
        f.store.delete_credentials("NOPE").unwrap();

        let keys: Vec<String> = f.store.lookup_keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["KEY1".to_string()]);
    }

    #[test]
    fn test_access_unknown_key() {
        let f = fixture();
        let result = read(&f.store, "KEY1", &f.keys);
        assert!(matches!(result, Err(LockdownError::NotFound(_))));
    }

    #[test]
    fn test_access_with_wrong_private_key() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let result = read(&f.store, "KEY1", &f.other_keys);
        assert!(matches!(result, Err(LockdownError::Crypto(CryptoError::InvalidPadding))));
    }

    #[test]
    fn test_add_with_private_key_is_wrong_type() {
        let f = fixture();
        let result = f.store.add_or_update_credentials(
            "KEY1",
            "user1",
            &SecretString::from("pass1"),
            f.keys.private_key_file(),
        );

        assert!(matches!(
            result,
            Err(LockdownError::Format(FormatError::WrongType { .. }))
        ));
        assert!(f.store.lookup_keys().unwrap().is_empty());
    }

    #[test]
    fn test_access_with_public_key_is_wrong_type() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        let result = read(&f.store, "KEY1", &KeyFiles::new("unused", f.keys.public_key_file()));
        assert!(matches!(
            result,
            Err(LockdownError::Format(FormatError::WrongType { .. }))
        ));
    }

    #[test]
    fn test_add_with_invalid_key_file() {
        let f = fixture();
        let invalid = f.temp_dir.path().join("invalidKey.pub");
        std::fs::write(&invalid, "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ user@host\n").unwrap();

        let result =
            f.store
                .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), &invalid);
        assert!(matches!(result, Err(LockdownError::Format(FormatError::Malformed(_)))));
    }

    #[test]
    fn test_add_rejects_empty_arguments_before_io() {
        let f = fixture();
        let missing_key = f.temp_dir.path().join("does-not-exist.pub");

        let empty_key =
            f.store
                .add_or_update_credentials("", "user1", &SecretString::from("pass1"), &missing_key);
        assert!(matches!(empty_key, Err(LockdownError::Validation(_))));

        let empty_password =
            f.store
                .add_or_update_credentials("KEY1", "user1", &SecretString::default(), &missing_key);
        assert!(matches!(empty_password, Err(LockdownError::Validation(_))));

        assert!(matches!(f.store.delete_credentials(""), Err(LockdownError::Validation(_))));
    }

    #[test]
    fn test_access_rejects_empty_lookup_key_before_io() {
        let f = fixture();
        let missing_key = f.temp_dir.path().join("does-not-exist");
        std::fs::remove_file(f.store.path()).unwrap();

        let mut called = false;
        let result = f.store.access_credentials("", &missing_key, |_, _| called = true);
        assert!(matches!(result, Err(LockdownError::Validation(_))));
        assert!(!called);
        assert!(!f.store.path().exists());
    }

    #[test]
    fn test_message_too_long_leaves_store_unchanged() {
        let f = fixture();
        let long_password = SecretString::new("x".repeat(200));

        let result = f
            .store
            .add_or_update_credentials("KEY1", "user1", &long_password, f.keys.public_key_file());
        assert!(matches!(
            result,
            Err(LockdownError::Crypto(CryptoError::MessageTooLong { .. }))
        ));
        assert!(f.store.lookup_keys().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_record_is_crypto_error() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();

        // Replace the stored ciphertext with a well-formed but bogus block
        let bogus = CredentialRecord::new("KEY1", vec![0x42; 128]).stored_value();
        std::fs::write(f.store.path(), format!("KEY1={}\n", bogus)).unwrap();

        let result = read(&f.store, "KEY1", &f.keys);
        assert!(matches!(result, Err(LockdownError::Crypto(CryptoError::InvalidPadding))));
    }

    #[test]
    fn test_decryptable_garbage_is_crypto_error() {
        let f = fixture();
        let public_key = KeyMaterial::<Public>::read_pem_file(f.keys.public_key_file()).unwrap();
        let ciphertext = RsaCipher::default()
            .encrypt(b"no-separator-here", &public_key)
            .unwrap();
        let stored = CredentialRecord::new("KEY1", ciphertext).stored_value();
        let bogus = CredentialRecord::new("KEY2", vec![0x42; 128]).stored_value();
        std::fs::write(f.store.path(), format!("KEY1={}\nKEY2={}\n", stored, bogus)).unwrap();

        let mut called = false;
        let garbage = f
            .store
            .access_credentials("KEY1", f.keys.private_key_file(), |_, _| called = true)
            .unwrap_err();
        let bad_padding = read(&f.store, "KEY2", &f.keys).unwrap_err();

        assert!(!called);
        assert!(matches!(garbage, LockdownError::Crypto(CryptoError::InvalidPadding)));
        assert_eq!(garbage.to_string(), bad_padding.to_string());
    }

    #[test]
    fn test_non_base64_record_is_format_error() {
        let f = fixture();
        std::fs::write(f.store.path(), "KEY1=***not-base64***\nKEY2=AAAA\n").unwrap();

        let result = read(&f.store, "KEY1", &f.keys);
        assert!(matches!(result, Err(LockdownError::Format(FormatError::Malformed(_)))));

        // Other records are still listed
        assert_eq!(f.store.lookup_keys().unwrap().len(), 2);
    }

    #[test]
    fn test_lookup_keys_sorted_and_escaped() {
        let f = fixture();
        for key in ["zeta", "alpha", "db:prod=main", "with space"] {
            f.store
                .add_or_update_credentials(key, "u", &SecretString::from("p"), f.keys.public_key_file())
                .unwrap();
        }

        let keys: Vec<String> = f.store.lookup_keys().unwrap().into_iter().collect();
        assert_eq!(keys, vec!["alpha", "db:prod=main", "with space", "zeta"]);
        assert!(f.store.contains("db:prod=main").unwrap());
        assert!(!f.store.contains("beta").unwrap());
    }

    #[test]
    fn test_store_holds_no_cache() {
        let f = fixture();
        let second_handle = CredentialStore::load(f.store.path()).unwrap();

        f.store
            .add_or_update_credentials("KEY1", "user1", &SecretString::from("pass1"), f.keys.public_key_file())
            .unwrap();
        assert!(second_handle.contains("KEY1").unwrap());

        second_handle.delete_credentials("KEY1").unwrap();
        assert!(!f.store.contains("KEY1").unwrap());
    }

    #[test]
    fn test_file_contains_no_plaintext() {
        let f = fixture();
        f.store
            .add_or_update_credentials("KEY1", "alice", &SecretString::from("s3cret"), f.keys.public_key_file())
            .unwrap();

        let contents = std::fs::read_to_string(f.store.path()).unwrap();
        assert!(contents.starts_with("KEY1="));
        assert!(!contents.contains("alice"));
        assert!(!contents.contains("s3cret"));
        assert!(!contents.contains("YWxpY2U="));
    }
}
