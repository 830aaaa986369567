use crate::core::providers::CredentialSource;
use keyring::Entry;
use std::error::Error;
use std::io::{self, BufRead, Write};

const KEYRING_SERVICE: &str = "drawbot";
const KEYRING_USER: &str = "openai";

/// Stores the OpenAI API key in the platform keyring.
pub struct AuthManager {
    use_keyring: bool,
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (useful for tests)
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn store_token(&self, token: &str) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<Option<String>, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Returns whether a stored key was actually removed.
    pub fn remove_token(&self) -> Result<bool, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Box::new(e)),
        }
    }

    pub fn interactive_auth(&self) -> Result<(), Box<dyn Error>> {
        let stdin = io::stdin();
        self.interactive_auth_with(&mut stdin.lock(), &mut io::stdout())
    }

    pub fn interactive_auth_with<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        out: &mut W,
    ) -> Result<(), Box<dyn Error>> {
        writeln!(out, "🔐 drawbot authentication")?;
        write!(out, "Enter your OpenAI API key: ")?;
        out.flush()?;

        let mut token = String::new();
        input.read_line(&mut token)?;
        let token = token.trim();

        if token.is_empty() {
            return Err("Token cannot be empty".into());
        }

        self.store_token(token)?;
        writeln!(out, "✓ API key stored securely in the system keyring")?;
        writeln!(out, "You can now use drawbot without setting OPENAI_API_KEY.")?;
        Ok(())
    }

    pub fn interactive_deauth(&self) -> Result<(), Box<dyn Error>> {
        let stdin = io::stdin();
        self.interactive_deauth_with(&mut stdin.lock(), &mut io::stdout())
    }

    pub fn interactive_deauth_with<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        out: &mut W,
    ) -> Result<(), Box<dyn Error>> {
        write!(out, "Remove the stored OpenAI API key? [y/N]: ")?;
        out.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            writeln!(out, "Cancelled.")?;
            return Ok(());
        }

        if self.remove_token()? {
            writeln!(out, "✓ Stored API key removed")?;
        } else {
            writeln!(out, "No stored API key was found.")?;
        }
        Ok(())
    }
}

impl CredentialSource for AuthManager {
    fn stored_api_key(&self) -> Result<Option<String>, Box<dyn Error>> {
        self.get_token()
    }
}
