//! Credential loading
//!
//! Credentials are read once at startup and handed to the aggregator.
//! Sources that need no key never look at them.

use std::collections::HashMap;

/// Environment variable holding each source's credential
pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[
    ("giphy", "GIPHY_API_KEY"),
    ("pixabay", "PIXABAY_API_KEY"),
    ("wikimedia", "WIKIMEDIA_ACCESS_TOKEN"),
];

/// Immutable map from source id to credential value
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// No credentials at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every known credential from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary lookup, so tests need not touch the real environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut creds = Self::default();
        for (source, var) in CREDENTIAL_ENV_VARS {
            if let Some(value) = lookup(var) {
                creds = creds.with(source, value);
            }
        }
        creds
    }

    /// Add a credential. Blank values and `YOUR_..._HERE` placeholders are ignored.
    pub fn with(mut self, source: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() && !is_placeholder(trimmed) {
            self.values.insert(source.to_string(), trimmed.to_string());
        }
        self
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.values.get(source).map(String::as_str)
    }

    /// Name of the environment variable a source reads its credential from
    pub fn env_var_for(source: &str) -> Option<&'static str> {
        CREDENTIAL_ENV_VARS
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, var)| *var)
    }
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with("YOUR_") && value.ends_with("_HERE")
}
