//! Token signing key configuration.
//!
//! The HS256 secret is read from a file so it can be mounted as a secret.
//! Debug builds fall back to a random per-process key, which invalidates
//! every token on restart; release builds insist on a real key.

use std::path::PathBuf;

use mockable::Env;
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroizing;

const TOKEN_KEY_DEFAULT_PATH: &str = "/var/run/secrets/token_key";
/// Minimum key length accepted in release builds.
pub const TOKEN_KEY_MIN_LEN: usize = 32;
const EPHEMERAL_KEY_LEN: usize = 64;
const KEY_FILE_ENV: &str = "TOKEN_KEY_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "TOKEN_ALLOW_EPHEMERAL";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for key validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate a missing key file.
    Debug,
    /// Release builds require a key file of adequate length.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use critique::inbound::http::token_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Resolved signing key.
pub struct TokenSettings {
    /// Secret bytes, wiped on drop.
    pub key: Zeroizing<Vec<u8>>,
    /// Whether the key was generated for this process only.
    pub ephemeral: bool,
}

/// Errors raised while loading the signing key.
#[derive(thiserror::Error, Debug)]
pub enum TokenConfigError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Reading the key file failed.
    #[error("failed to read token key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The key file is too short for release builds.
    #[error("token key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    /// Release builds must not run on a throwaway key.
    #[error("TOKEN_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Load the signing key according to environment and build mode.
///
/// # Examples
///
/// ```rust
/// use critique::inbound::http::token_config::{BuildMode, token_settings_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("critique_token_key_example");
/// std::fs::write(&key_path, vec![b'k'; 32])?;
///
/// let key_path = key_path.to_str().expect("valid path").to_string();
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "TOKEN_KEY_FILE" => Some(key_path.clone()),
///     _ => None,
/// });
///
/// let settings = token_settings_from_env(&env, BuildMode::Release)?;
/// assert!(!settings.ephemeral);
/// assert_eq!(settings.key.len(), 32);
/// # Ok(())
/// # }
/// ```
pub fn token_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<TokenSettings, TokenConfigError> {
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| TOKEN_KEY_DEFAULT_PATH.to_owned()),
    );

    match std::fs::read(&path) {
        Ok(bytes) => {
            let key = Zeroizing::new(bytes);
            let length = key.len();
            if mode == BuildMode::Release && length < TOKEN_KEY_MIN_LEN {
                return Err(TokenConfigError::KeyTooShort {
                    path,
                    length,
                    min_len: TOKEN_KEY_MIN_LEN,
                });
            }
            Ok(TokenSettings {
                key,
                ephemeral: false,
            })
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary token key (dev only); tokens die with the process"
            );
            Ok(TokenSettings {
                key: ephemeral_key(),
                ephemeral: true,
            })
        }
        Err(error) => Err(TokenConfigError::KeyRead {
            path,
            source: error,
        }),
    }
}

fn ephemeral_key() -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0_u8; EPHEMERAL_KEY_LEN]);
    rand::thread_rng().fill_bytes(key.as_mut_slice());
    key
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, TokenConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(false);
    };
    match parse_bool(&value) {
        Some(true) if mode.is_debug() => Ok(true),
        Some(true) => Err(TokenConfigError::EphemeralNotAllowed),
        Some(false) => Ok(false),
        None if mode.is_debug() => {
            warn!(value = %value, "invalid TOKEN_ALLOW_EPHEMERAL; defaulting to disabled");
            Ok(false)
        }
        None => Err(TokenConfigError::InvalidEnv {
            name: ALLOW_EPHEMERAL_ENV,
            value,
            expected: BOOL_EXPECTED,
        }),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_with(vars: &[(&'static str, String)]) -> MockEnv {
        let vars: HashMap<&'static str, String> = vars.iter().cloned().collect();
        let mut env = MockEnv::new();
        env.expect_string()
            .returning(move |name| vars.get(name).cloned());
        env
    }

    fn key_file(dir: &TempDir, len: usize) -> String {
        let path = dir.path().join("token_key");
        std::fs::write(&path, vec![b'k'; len]).expect("write key");
        path.to_str().expect("utf-8 path").to_owned()
    }

    #[rstest]
    #[case(BuildMode::Debug)]
    #[case(BuildMode::Release)]
    fn reads_the_key_file(#[case] mode: BuildMode) {
        let dir = TempDir::new().expect("tempdir");
        let env = env_with(&[(KEY_FILE_ENV, key_file(&dir, 48))]);

        let settings = token_settings_from_env(&env, mode).expect("settings");

        assert!(!settings.ephemeral);
        assert_eq!(settings.key.as_slice(), vec![b'k'; 48].as_slice());
    }

    #[rstest]
    fn release_rejects_short_keys() {
        let dir = TempDir::new().expect("tempdir");
        let env = env_with(&[(KEY_FILE_ENV, key_file(&dir, TOKEN_KEY_MIN_LEN - 1))]);

        let err = token_settings_from_env(&env, BuildMode::Release)
            .err()
            .expect("short key");

        assert!(matches!(err, TokenConfigError::KeyTooShort { length: 31, .. }));
    }

    #[rstest]
    fn debug_accepts_short_keys() {
        let dir = TempDir::new().expect("tempdir");
        let env = env_with(&[(KEY_FILE_ENV, key_file(&dir, 8))]);

        assert!(token_settings_from_env(&env, BuildMode::Debug).is_ok());
    }

    #[rstest]
    fn debug_falls_back_to_an_ephemeral_key() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("absent").to_str().expect("path").to_owned();
        let env = env_with(&[(KEY_FILE_ENV, missing)]);

        let settings = token_settings_from_env(&env, BuildMode::Debug).expect("settings");

        assert!(settings.ephemeral);
        assert_eq!(settings.key.len(), EPHEMERAL_KEY_LEN);
    }

    #[rstest]
    fn release_requires_a_readable_key() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("absent").to_str().expect("path").to_owned();
        let env = env_with(&[(KEY_FILE_ENV, missing)]);

        let err = token_settings_from_env(&env, BuildMode::Release)
            .err()
            .expect("missing key");

        assert!(matches!(err, TokenConfigError::KeyRead { .. }));
    }

    #[rstest]
    #[case("1", true)]
    #[case("0", false)]
    #[case("maybe", false)]
    fn debug_reads_the_ephemeral_toggle(#[case] value: &str, #[case] expected: bool) {
        let env = env_with(&[(ALLOW_EPHEMERAL_ENV, value.to_owned())]);
        assert_eq!(
            allow_ephemeral_from_env(&env, BuildMode::Debug).expect("toggle"),
            expected
        );
    }

    #[rstest]
    #[case("yes")]
    #[case("maybe")]
    fn release_refuses_the_ephemeral_toggle(#[case] value: &str) {
        let env = env_with(&[(ALLOW_EPHEMERAL_ENV, value.to_owned())]);
        assert!(allow_ephemeral_from_env(&env, BuildMode::Release).is_err());
    }
}
