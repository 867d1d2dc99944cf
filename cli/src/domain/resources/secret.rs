//! Credential secret: a fixed username plus an engine-generated password.
//!
//! The generated value never passes through this layer. Consumers get the
//! secret's locator, or a `{{resolve:secretsmanager:...}}` dynamic reference
//! the engine expands at provisioning time.

use rand_chacha::rand_core::RngCore;
use serde_json::json;
use threetier_common::{Expr, ResourceDecl, RetentionPolicy, resource_types as rt};

use crate::domain::config::SecretConfig;
use crate::domain::error::DeclarationError;
use crate::domain::topology::{Topology, logical_id};

/// Characters `ExcludePunctuation` removes from the generation alphabet.
pub const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// How the engine generates the secret's password field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub generate_string_key: String,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    pub password_length: u32,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            generate_string_key: "password".to_string(),
            exclude_punctuation: true,
            include_space: false,
            password_length: 32,
        }
    }
}

impl GenerationPolicy {
    /// The alphabet generated values are drawn from.
    #[must_use]
    pub fn charset(&self) -> Vec<char> {
        let mut chars: Vec<char> = LETTERS.chars().chain(DIGITS.chars()).collect();
        if !self.exclude_punctuation {
            chars.extend(PUNCTUATION.chars());
        }
        if self.include_space {
            chars.push(' ');
        }
        chars
    }

    /// Whether `value` could have been produced under this policy.
    #[must_use]
    pub fn admits(&self, value: &str) -> bool {
        let charset = self.charset();
        value.chars().all(|c| charset.contains(&c))
    }

    /// Draw a value of `password_length` characters from the charset.
    ///
    /// Uses rejection sampling so every character is equally likely.
    pub fn generate<R: RngCore>(&self, rng: &mut R) -> String {
        let charset = self.charset();
        #[allow(clippy::cast_possible_truncation)]
        let len = charset.len() as u32;
        let zone = u32::MAX - (u32::MAX % len);
        let mut out = String::with_capacity(self.password_length as usize);
        while out.chars().count() < self.password_length as usize {
            let r = rng.next_u32();
            if r < zone {
                out.push(charset[(r % len) as usize]);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub name: String,
    pub username: String,
    pub policy: GenerationPolicy,
}

/// Reference to a declared secret.
#[derive(Debug, Clone)]
pub struct SecretHandle {
    pub logical_id: String,
    /// `Ref` of the secret: its ARN once provisioned.
    pub locator: Expr,
    pub password_key: String,
}

impl From<&SecretConfig> for SecretSpec {
    fn from(cfg: &SecretConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            username: cfg.username.clone(),
            policy: GenerationPolicy {
                generate_string_key: cfg.generate_string_key.clone(),
                exclude_punctuation: cfg.exclude_punctuation,
                include_space: cfg.include_space,
                password_length: cfg.password_length,
            },
        }
    }
}

impl SecretSpec {
    /// Declare the secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the logical id collides.
    pub fn declare(&self, topo: &mut Topology) -> Result<SecretHandle, DeclarationError> {
        let id = logical_id(&[&self.name]);
        let template = json!({ "username": self.username }).to_string();
        let mut decl = ResourceDecl::new(rt::SECRET)
            .with_property("Name", self.name.as_str())
            .with_property(
                "GenerateSecretString",
                json!({
                    "SecretStringTemplate": template,
                    "GenerateStringKey": self.policy.generate_string_key,
                    "ExcludePunctuation": self.policy.exclude_punctuation,
                    "IncludeSpace": self.policy.include_space,
                    "PasswordLength": self.policy.password_length,
                }),
            );
        decl.deletion_policy = Some(RetentionPolicy::Delete);
        decl.update_replace_policy = Some(RetentionPolicy::Delete);
        let locator = topo.declare(&id, decl)?;

        Ok(SecretHandle {
            logical_id: id,
            locator,
            password_key: self.policy.generate_string_key.clone(),
        })
    }
}

impl SecretHandle {
    /// Dynamic reference to one JSON field of the secret value.
    #[must_use]
    pub fn field(&self, key: &str) -> Expr {
        Expr::join(
            "",
            vec![
                Expr::literal("{{resolve:secretsmanager:"),
                self.locator.clone(),
                Expr::literal(format!(":SecretString:{key}::}}}}")),
            ],
        )
    }

    #[must_use]
    pub fn username(&self) -> Expr {
        self.field("username")
    }

    #[must_use]
    pub fn password(&self) -> Expr {
        self.field(&self.password_key)
    }
}
