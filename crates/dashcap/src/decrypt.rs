use std::{collections::BTreeMap, str::FromStr};

use crate::error::{DashcapError, DashcapResult};

/// KID to content key mapping returned by the license exchange.
///
/// Both sides are stored as 32 lowercase hex digits. KIDs written in UUID
/// form (`xxxxxxxx-xxxx-...`) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    keys: BTreeMap<String, String>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kid: &str, key: &str) -> DashcapResult<()> {
        let kid = normalize(kid);
        let key = normalize(key);
        if !is_valid_kid_key_pair(&kid, &key) {
            return Err(DashcapError::InvalidKeyPair(format!("{kid}:{key}")));
        }
        self.keys.insert(kid, key);
        Ok(())
    }

    pub fn get(&self, kid: &str) -> Option<&str> {
        self.keys.get(&normalize(kid)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `kid:key` arguments for the decryption tool, ordered by KID.
    pub fn pairs(&self) -> impl Iterator<Item = String> + '_ {
        self.keys.iter().map(|(kid, key)| format!("{kid}:{key}"))
    }

    /// Parse a JSON object mapping KIDs to keys.
    pub fn from_json(json: &str) -> DashcapResult<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        let mut keys = Self::new();
        for (kid, key) in raw {
            keys.insert(&kid, &key)?;
        }
        Ok(keys)
    }
}

/// `<kid>:<key>;<kid>:<key>;...`, whitespace and newlines are accepted as
/// separators too.
impl FromStr for KeyMap {
    type Err = DashcapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut keys = Self::new();
        for pair in s
            .split(|c: char| c == ';' || c.is_whitespace())
            .filter(|pair| !pair.is_empty())
        {
            let (kid, key) = pair
                .split_once(':')
                .ok_or_else(|| DashcapError::InvalidKeyPair(pair.to_string()))?;
            keys.insert(kid, key)?;
        }

        if keys.is_empty() {
            return Err(DashcapError::InvalidKeyPair(s.to_string()));
        }
        Ok(keys)
    }
}

fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn is_valid_kid_key_pair(kid: &str, key: &str) -> bool {
    kid.len() == 32
        && key.len() == 32
        && kid.chars().all(|c| c.is_ascii_hexdigit())
        && key.chars().all(|c| c.is_ascii_hexdigit())
}
