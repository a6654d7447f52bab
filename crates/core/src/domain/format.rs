use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FormatId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

/// A bookable out-of-home media format (billboard size, bus side, phone box,
/// etc.) as presented by the configurator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub id: FormatId,
    pub name: String,
    /// Creative cost tiers may be scoped to a category (e.g. "static",
    /// "digital"); items without one fall back to category-agnostic tiers.
    pub category: Option<String>,
    pub active: bool,
}
