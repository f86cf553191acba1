use anyhow::Result;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const ENV_PASSWORD: &str = "INBOX_DIGEST_PASSWORD";
const KEYRING_SERVICE: &str = "inbox-digest";

/// Looks up the IMAP app password for one address.
///
/// Order: `INBOX_DIGEST_PASSWORD`, the OS keyring, then a 0600 file in the
/// config directory.
pub struct CredentialStore {
    email: String,
    password_file: PathBuf,
}

impl CredentialStore {
    pub fn new(email: &str) -> Self {
        let safe_email = email.replace(['@', '.', '/', '\\', ':'], "_");
        let password_file = crate::config::Config::config_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(format!(".password_{}", safe_email));

        Self {
            email: email.to_string(),
            password_file,
        }
    }

    fn env_password() -> Option<String> {
        env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty())
    }

    fn keyring_key(&self) -> String {
        format!("imap:{}", self.email)
    }

    fn keyring_get(&self) -> Option<String> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, &self.keyring_key()).ok()?;
        entry.get_password().ok()
    }

    fn keyring_set(&self, password: &str) -> bool {
        match keyring::Entry::new(KEYRING_SERVICE, &self.keyring_key()) {
            Ok(entry) => entry.set_password(password).is_ok(),
            Err(_) => false,
        }
    }

    fn file_get(&self) -> Option<String> {
        fs::read_to_string(&self.password_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn file_set(&self, password: &str) -> Result<()> {
        if let Some(parent) = self.password_file.parent() {
            fs::create_dir_all(parent)?;
        }

        // Create with restricted permissions up front to avoid a readable window
        #[cfg(unix)]
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.password_file)?;
            file.write_all(password.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            let mut file = fs::File::create(&self.password_file)?;
            file.write_all(password.as_bytes())?;
        }

        Ok(())
    }

    pub fn get_password(&self) -> Result<String> {
        if let Some(pwd) = Self::env_password() {
            return Ok(pwd);
        }

        if let Some(pwd) = self.keyring_get() {
            return Ok(pwd);
        }

        if let Some(pwd) = self.file_get() {
            return Ok(pwd);
        }

        anyhow::bail!(
            "No stored password for {}. Set {} or run 'inbox-digest setup'.",
            self.email,
            ENV_PASSWORD
        )
    }

    pub fn set_password(&self, password: &str) -> Result<()> {
        if self.keyring_set(password) && self.keyring_get().as_deref() == Some(password) {
            return Ok(());
        }

        tracing::warn!("Keyring unavailable, storing password in {}", self.password_file.display());
        self.file_set(password)
    }

    pub fn has_credentials(&self) -> bool {
        Self::env_password().is_some() || self.keyring_get().is_some() || self.file_get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_env(value: &str) {
        // SAFETY: guarded by ENV_MUTEX, no other thread reads this variable concurrently
        unsafe { env::set_var(ENV_PASSWORD, value) };
    }

    fn clear_env() {
        // SAFETY: see set_env
        unsafe { env::remove_var(ENV_PASSWORD) };
    }

    #[test]
    fn test_env_password() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_env("test123");
        let store = CredentialStore::new("test@example.com");
        assert!(store.has_credentials());
        assert_eq!(store.get_password().unwrap(), "test123");
        clear_env();
    }

    #[test]
    fn test_special_chars_in_email_sanitized() {
        let store = CredentialStore::new("user.name+tag@sub.domain.com");
        let filename = store.password_file.file_name().unwrap().to_string_lossy();

        assert!(!filename.contains('@'), "filename contains @: {}", filename);
        assert!(!filename.contains('/'), "filename contains /: {}", filename);
        assert!(!filename.contains(':'), "filename contains :: {}", filename);
        assert!(filename.starts_with(".password_"), "unexpected filename: {}", filename);
    }

    #[test]
    fn test_env_takes_priority_over_file() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let email = format!("priority_test_{}@example.com", std::process::id());
        let store = CredentialStore::new(&email);
        let _ = fs::remove_file(&store.password_file);

        store.file_set("file_password").unwrap();
        set_env("env_password");
        assert_eq!(store.get_password().unwrap(), "env_password");

        clear_env();
        assert_eq!(store.file_get(), Some("file_password".to_string()));
        let _ = fs::remove_file(&store.password_file);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_env("");
        assert!(CredentialStore::env_password().is_none());
        clear_env();
    }
}
