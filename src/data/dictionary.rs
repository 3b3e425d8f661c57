//! Drug dictionary: identity tokens to names and back.
//!
//! A drug identity usually has several synonyms; exactly one of them is
//! flagged as the representative name used for display.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::{
    data::corpus::DrugId,
    error::{Result, SignalError},
};

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// One synonym row of the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugEntry {
    pub drug_id: DrugId,
    pub drug_name: String,
    pub representative: bool,
}

/// Bidirectional lookup between names and identity tokens.
#[derive(Debug, Clone, Default)]
pub struct DrugDictionary {
    encoder: HashMap<String, BTreeSet<DrugId>>,
    decoder: HashMap<DrugId, String>,
}

impl DrugDictionary {
    pub fn new(entries: impl IntoIterator<Item = DrugEntry>) -> Self {
        let mut dict = Self::default();
        for entry in entries {
            let name = entry.drug_name.trim();
            if entry.representative {
                dict.decoder.insert(entry.drug_id.clone(), name.to_string());
            }
            dict.encoder
                .entry(name.to_lowercase())
                .or_default()
                .insert(entry.drug_id);
        }
        dict
    }

    pub fn len(&self) -> usize {
        self.decoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoder.is_empty()
    }

    /// Representative name of an identity token.
    pub fn decode(&self, drug_id: &str) -> Result<&str> {
        self.decoder
            .get(drug_id)
            .map(String::as_str)
            .ok_or_else(|| SignalError::MissingDecoding(drug_id.to_string()))
    }

    /// Identities behind every name in `names`. The first name without a
    /// dictionary entry fails the whole lookup.
    pub fn encode<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeSet<DrugId>> {
        let mut ids = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            let key = name.trim().to_lowercase();
            match self.encoder.get(&key) {
                Some(found) => ids.extend(found.iter().cloned()),
                None => {
                    return Err(SignalError::UnknownDrug {
                        name: name.to_string(),
                        suggestion: self.closest(name).map(str::to_string),
                    })
                }
            }
        }
        Ok(ids)
    }

    /// Names containing `keyword`, sorted.
    pub fn search(&self, keyword: &str) -> Vec<&str> {
        let keyword = keyword.trim().to_lowercase();
        let mut hits: Vec<&str> = self
            .encoder
            .keys()
            .filter(|name| name.contains(&keyword))
            .map(String::as_str)
            .collect();
        hits.sort_unstable();
        hits
    }

    fn closest(&self, name: &str) -> Option<&str> {
        let name = name.trim().to_lowercase();
        self.encoder
            .keys()
            .map(|candidate| (candidate, jaro_winkler(&name, candidate)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.as_str())
    }
}
