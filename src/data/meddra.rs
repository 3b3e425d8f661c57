//! MedDRA hierarchy lookup: category labels to reaction identity sets.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    data::corpus::{reaction_key, FocusSet, ReactionId},
    error::{Result, SignalError},
};

/// SOC terms excluded from drug-induced event analyses.
const IGNORED_SOCS: &[&str] = &[
    "congenital, familial and genetic disorders",
    "product issues",
];
const IGNORED_FRAGMENT: &str = "congenital";

/// Level of the MedDRA terminology, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    Soc,
    Hlgt,
    Hlt,
    Pt,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Soc, Layer::Hlgt, Layer::Hlt, Layer::Pt];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Soc => "SOC",
            Layer::Hlgt => "HLGT",
            Layer::Hlt => "HLT",
            Layer::Pt => "PT",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOC" => Ok(Layer::Soc),
            "HLGT" => Ok(Layer::Hlgt),
            "HLT" => Ok(Layer::Hlt),
            "PT" => Ok(Layer::Pt),
            _ => Err(SignalError::UnknownLayer(s.to_string())),
        }
    }
}

/// One preferred term with its ancestors. Labels are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeddraTerm {
    /// Reaction identity used in case records; defaults to the PT label.
    pub id: ReactionId,
    pub pt: String,
    pub hlt: String,
    pub hlgt: String,
    pub soc: String,
}

impl MeddraTerm {
    pub fn new(
        pt: impl AsRef<str>,
        hlt: impl AsRef<str>,
        hlgt: impl AsRef<str>,
        soc: impl AsRef<str>,
    ) -> Self {
        let pt = normalise(pt.as_ref());
        Self {
            id: pt.clone(),
            pt,
            hlt: normalise(hlt.as_ref()),
            hlgt: normalise(hlgt.as_ref()),
            soc: normalise(soc.as_ref()),
        }
    }

    /// Key the term by an explicit reaction code instead of its PT label.
    pub fn with_id(mut self, id: impl AsRef<str>) -> Self {
        self.id = reaction_key(id.as_ref());
        self
    }

    pub fn label(&self, layer: Layer) -> &str {
        match layer {
            Layer::Soc => &self.soc,
            Layer::Hlgt => &self.hlgt,
            Layer::Hlt => &self.hlt,
            Layer::Pt => &self.pt,
        }
    }

    fn is_ignored(&self) -> bool {
        IGNORED_SOCS.contains(&self.soc.as_str())
            || Layer::ALL
                .iter()
                .any(|layer| self.label(*layer).contains(IGNORED_FRAGMENT))
    }
}

fn normalise(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Analyst-specified reaction category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionCriteria {
    /// Exact labels at one layer, e.g. SOC "hepatobiliary disorders".
    Labels { layer: Layer, labels: Vec<String> },
    /// Every label at `layer` containing `keyword`.
    Keyword { layer: Layer, keyword: String },
}

impl ReactionCriteria {
    pub fn labels<S: Into<String>>(layer: Layer, labels: impl IntoIterator<Item = S>) -> Self {
        Self::Labels {
            layer,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keyword(layer: Layer, keyword: impl Into<String>) -> Self {
        Self::Keyword {
            layer,
            keyword: keyword.into(),
        }
    }
}

impl fmt::Display for ReactionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Labels { layer, labels } => write!(f, "{layer} in {labels:?}"),
            Self::Keyword { layer, keyword } => write!(f, "{layer} containing {keyword:?}"),
        }
    }
}

/// Resolves a reaction category into a concrete focus set.
pub trait ReactionResolver {
    fn resolve(&self, criteria: &ReactionCriteria) -> Result<FocusSet>;
}

/// Flattened MedDRA hierarchy, one row per preferred term.
#[derive(Debug, Clone, Default)]
pub struct MeddraHierarchy {
    terms: Vec<MeddraTerm>,
}

impl MeddraHierarchy {
    pub fn new(terms: Vec<MeddraTerm>) -> Self {
        Self { terms }
    }

    /// Drop congenital and product-issue terms, which are not drug induced.
    pub fn without_ignored(mut self) -> Self {
        let before = self.terms.len();
        self.terms.retain(|term| !term.is_ignored());
        info!(
            before,
            after = self.terms.len(),
            "removed terms unrelated to drug-induced events"
        );
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[MeddraTerm] {
        &self.terms
    }

    /// Distinct labels containing `keyword`, per requested layer.
    pub fn search(&self, keyword: &str, layers: &[Layer]) -> BTreeMap<Layer, BTreeSet<String>> {
        let keyword = normalise(keyword);
        let layers = if layers.is_empty() {
            &Layer::ALL[..]
        } else {
            layers
        };
        layers
            .iter()
            .map(|layer| {
                let hits = self
                    .terms
                    .iter()
                    .map(|term| term.label(*layer))
                    .filter(|label| label.contains(&keyword))
                    .map(str::to_string)
                    .collect();
                (*layer, hits)
            })
            .collect()
    }
}

impl ReactionResolver for MeddraHierarchy {
    fn resolve(&self, criteria: &ReactionCriteria) -> Result<FocusSet> {
        let mut ids = BTreeSet::new();
        match criteria {
            ReactionCriteria::Labels { layer, labels } => {
                for label in labels {
                    let label = normalise(label);
                    let hits: Vec<ReactionId> = self
                        .terms
                        .iter()
                        .filter(|term| term.label(*layer) == label)
                        .map(|term| term.id.clone())
                        .collect();
                    if hits.is_empty() {
                        warn!(%layer, %label, "category label matched no terms; skipped");
                    }
                    ids.extend(hits);
                }
            }
            ReactionCriteria::Keyword { layer, keyword } => {
                let keyword = normalise(keyword);
                ids.extend(
                    self.terms
                        .iter()
                        .filter(|term| term.label(*layer).contains(&keyword))
                        .map(|term| term.id.clone()),
                );
            }
        }
        if ids.is_empty() {
            return Err(SignalError::EmptyFocus {
                criteria: criteria.to_string(),
            });
        }
        info!(%criteria, terms = ids.len(), "resolved focus set");
        Ok(FocusSet::new(ids))
    }
}
