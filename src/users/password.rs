use argon2::{Algorithm, Argon2, Params, Version};
use tracing::error;

const DIGEST_LEN: usize = 32;

pub const MIN_SALT_LEN: usize = 8;

/// Deterministic password digest keyed by an application-wide salt.
///
/// This is a storage placeholder: every password maps to one fixed digest, so it
/// must not be relied on as a credential store.
#[derive(Clone)]
pub struct PasswordDigester {
    salt: Vec<u8>,
    params: Params,
}

impl PasswordDigester {
    pub fn new(salt: impl Into<Vec<u8>>) -> anyhow::Result<Self> {
        let salt = salt.into();
        anyhow::ensure!(
            salt.len() >= MIN_SALT_LEN,
            "salt must be at least {} bytes",
            MIN_SALT_LEN
        );
        let params = Params::new(4096, 1, 1, Some(DIGEST_LEN))?;
        Ok(Self { salt, params })
    }

    pub fn digest(&self, plain: &str) -> Result<String, argon2::Error> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut out = [0u8; DIGEST_LEN];
        argon2
            .hash_password_into(plain.as_bytes(), &self.salt, &mut out)
            .inspect_err(|e| error!(error = %e, "argon2 digest error"))?;
        Ok(out.iter().map(|b| format!("{b:02x}")).collect())
    }
}
