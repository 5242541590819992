//! External credentials, read once at startup.

use super::settings::CredentialRef;
use crate::error::{DocqueryError, Result};

/// Environment variable holding the embedding service token.
pub const EMBEDDING_TOKEN_VAR: &str = "EMBEDDING_API_TOKEN";
/// Environment variable holding the generation service key.
pub const GENERATION_KEY_VAR: &str = "GENERATION_API_KEY";
/// Environment variable holding the storage bucket name.
pub const BUCKET_VAR: &str = "STORAGE_BUCKET";

/// The three settings the service refuses to start without.
#[derive(Clone)]
pub struct Credentials {
    pub embedding_token: String,
    pub generation_key: String,
    pub bucket: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("embedding_token", &"<redacted>")
            .field("generation_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let embedding_token = read(EMBEDDING_TOKEN_VAR);
        let generation_key = read(GENERATION_KEY_VAR);
        let bucket = read(BUCKET_VAR);

        let missing: Vec<&str> = [
            (EMBEDDING_TOKEN_VAR, embedding_token.is_none()),
            (GENERATION_KEY_VAR, generation_key.is_none()),
            (BUCKET_VAR, bucket.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name)
        .collect();

        match (embedding_token, generation_key, bucket) {
            (Some(embedding_token), Some(generation_key), Some(bucket)) => Ok(Self {
                embedding_token,
                generation_key,
                bucket,
            }),
            _ => Err(DocqueryError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Resolve the key an endpoint is configured to use.
    pub fn resolve(&self, credential: CredentialRef) -> &str {
        match credential {
            CredentialRef::EmbeddingToken => &self.embedding_token,
            CredentialRef::GenerationKey => &self.generation_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_present() {
        let vars = env(&[
            (EMBEDDING_TOKEN_VAR, "hf_token"),
            (GENERATION_KEY_VAR, "g_key"),
            (BUCKET_VAR, "docs"),
        ]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.bucket, "docs");
        assert_eq!(creds.resolve(CredentialRef::GenerationKey), "g_key");
        assert_eq!(creds.resolve(CredentialRef::EmbeddingToken), "hf_token");
    }

    #[test]
    fn test_missing_and_blank_are_reported() {
        let vars = env(&[(EMBEDDING_TOKEN_VAR, "hf_token"), (BUCKET_VAR, "   ")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(GENERATION_KEY_VAR));
        assert!(message.contains(BUCKET_VAR));
        assert!(!message.contains(EMBEDDING_TOKEN_VAR));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            embedding_token: "secret-a".into(),
            generation_key: "secret-b".into(),
            bucket: "docs".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-a"));
        assert!(!debug.contains("secret-b"));
    }
}
