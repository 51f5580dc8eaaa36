//! Replacement password generation for scrubbed accounts.
//!
//! Each scrubbed account receives a freshly generated random password that
//! nobody ever sees: only its Argon2id hash is written, and the plaintext
//! lives in a `Zeroizing` buffer that is cleared as soon as hashing is done.

use crate::error::ScrubError;
use crate::hooks::ScrubHooks;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHasher, SaltString},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Characters used for generated passwords.
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()";

/// Length of generated passwords.
pub const DEFAULT_PASSWORD_LENGTH: usize = 24;

/// Salt size in bytes (RFC 9106 minimum).
const SALT_SIZE: usize = 16;

/// Argon2id cost parameters for replacement hashes.
///
/// The defaults are the OWASP minimum for Argon2id (19 MiB, 2 passes).
/// Every scrubbed account costs one hash, so large account tables favour the
/// cheaper end of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretParams {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub password_length: usize,
}

impl Default for SecretParams {
    fn default() -> Self {
        Self {
            memory_cost_kib: 19_456,
            time_cost: 2,
            parallelism: 1,
            password_length: DEFAULT_PASSWORD_LENGTH,
        }
    }
}

impl SecretParams {
    /// Single-pass, 4 MiB preset for large account tables. Nobody knows the
    /// plaintext of a replacement password, so the hash only has to be valid.
    pub fn fast() -> Self {
        Self {
            memory_cost_kib: 4_096,
            time_cost: 1,
            ..Self::default()
        }
    }

    /// Checks the password length and the Argon2 cost ranges.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first invalid value.
    pub fn validate(&self) -> crate::Result<()> {
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> crate::Result<Params> {
        if self.password_length == 0 {
            return Err(ScrubError::configuration(
                "password length must be greater than 0",
            ));
        }

        Params::new(self.memory_cost_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| ScrubError::configuration(format!("Invalid Argon2 parameters: {}", e)))
    }
}

/// Produces replacement password hashes.
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    argon2: Argon2<'static>,
    password_length: usize,
}

impl SecretGenerator {
    /// Creates a generator with the given cost parameters.
    ///
    /// # Errors
    /// Returns `Configuration` if the Argon2 parameters are out of range or
    /// the password length is zero.
    pub fn new(params: SecretParams) -> crate::Result<Self> {
        let argon_params = params.argon2_params()?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
            password_length: params.password_length,
        })
    }

    /// Returns the value to store in the password column.
    ///
    /// The `scrubbed_password` hook wins when it returns a value; otherwise a
    /// random password is generated and hashed.
    pub fn replacement_hash(&self, hooks: &dyn ScrubHooks) -> crate::Result<String> {
        if let Some(password) = hooks.scrubbed_password() {
            return Ok(password);
        }

        let plaintext = generate_password(self.password_length);
        self.hash_password(&plaintext)
    }

    /// Hashes `plaintext` into a PHC-format Argon2id string.
    pub fn hash_password(&self, plaintext: &str) -> crate::Result<String> {
        let mut salt = [0u8; SALT_SIZE];
        rand::rng().fill(&mut salt);

        let salt_string = SaltString::encode_b64(&salt).map_err(|e| ScrubError::SecretGeneration {
            context: format!("invalid salt: {}", e),
        })?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt_string)
            .map_err(|e| ScrubError::SecretGeneration {
                context: format!("hashing failed: {}", e),
            })?;

        Ok(hash.to_string())
    }
}

/// Generates a random password from [`PASSWORD_CHARSET`].
pub fn generate_password(length: usize) -> Zeroizing<String> {
    let mut rng = rand::rng();
    let password: String = (0..length)
        .map(|_| char::from(PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())]))
        .collect();
    Zeroizing::new(password)
}
