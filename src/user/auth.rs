//! Authentication primitives: session tokens and password hashing.

use anyhow::{bail, Result};

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::time::SystemTime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: usize,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
    pub value: AuthTokenValue,
}

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        AuthTokenValue(random_string)
    }
}

mod stats_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let argon2 = Argon2::default();
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        let hash_string = argon2
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let argon2 = Argon2::default();
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(argon2.verify_password(plain_pw, &password_hash).is_ok())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum StatsHasher {
    Argon2,
    /// Fast test-only hasher - DO NOT use in production!
    /// A single sha256 round over salt and password.
    #[cfg(feature = "test-fast-hasher")]
    TestFast,
}

#[cfg(feature = "test-fast-hasher")]
mod test_fast {
    use sha2::{Digest, Sha256};

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b64_salt.as_ref().as_bytes());
        hasher.update(plain);
        let digest = hasher.finalize();
        format!("$testfast${}${:x}", b64_salt.as_ref(), digest)
    }
}

impl FromStr for StatsHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(StatsHasher::Argon2),
            #[cfg(feature = "test-fast-hasher")]
            "test_fast" => Ok(StatsHasher::TestFast),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for StatsHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsHasher::Argon2 => write!(f, "argon2"),
            #[cfg(feature = "test-fast-hasher")]
            StatsHasher::TestFast => write!(f, "test_fast"),
        }
    }
}

impl StatsHasher {
    pub fn default_hasher() -> StatsHasher {
        #[cfg(feature = "test-fast-hasher")]
        return StatsHasher::TestFast;
        #[cfg(not(feature = "test-fast-hasher"))]
        StatsHasher::Argon2
    }

    pub fn generate_b64_salt(&self) -> String {
        match self {
            StatsHasher::Argon2 => stats_argon2::generate_b64_salt(),
            #[cfg(feature = "test-fast-hasher")]
            StatsHasher::TestFast => "test_salt".to_string(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            StatsHasher::Argon2 => stats_argon2::hash(plain, b64_salt),
            #[cfg(feature = "test-fast-hasher")]
            StatsHasher::TestFast => Ok(test_fast::hash(plain, b64_salt)),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T, salt: T) -> Result<bool> {
        match self {
            StatsHasher::Argon2 => {
                stats_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
            #[cfg(feature = "test-fast-hasher")]
            StatsHasher::TestFast => {
                let recomputed = test_fast::hash(plain_pw.as_ref().as_bytes(), salt.as_ref());
                Ok(recomputed == target_hash.as_ref())
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UsernamePasswordCredentials {
    pub user_id: usize,
    pub salt: String,
    pub hash: String,
    pub hasher: StatsHasher,

    pub created: SystemTime,
    pub last_tried: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UserAuthCredentials {
    pub user_id: usize,
    pub username_password: Option<UsernamePasswordCredentials>,
}
