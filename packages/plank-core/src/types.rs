use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::stores::{ContainerItemMapping, ContainerOrder, ContainerStore, ItemStore};

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

/// Badge colour used for items, containers and board tags.
/// Always a CSS hex colour, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self, InvalidColor> {
        let trimmed = value.trim();
        if HEX_COLOR_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(InvalidColor(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self("#64748b".to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid colour {0:?}, expected #rgb or #rrggbb")]
pub struct InvalidColor(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardTag {
    pub title: String,
    pub color: Color,
}

/// Whether items of a container carry a completion checkbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    #[default]
    Simple,
    Checklist,
}

/// What happens to an item's position when its completed flag toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletedItemOrder {
    /// Completed items form a contiguous run at the front.
    Start,
    /// Completed items form a contiguous run at the back.
    End,
    #[default]
    NoChange,
    /// Completing an item removes it.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub badge_color: Color,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
    /// Index among the incomplete items the item held when it last completed
    /// under a `Start`/`End` policy. Used to put it back on un-complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_slot: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ContainerKind,
    #[serde(default)]
    pub completed_item_order: CompletedItemOrder,
    #[serde(default)]
    pub badge_color: Color,
}

impl Container {
    pub fn supports_completion(&self) -> bool {
        self.kind == ContainerKind::Checklist
    }
}

/// A board: the unit of persistence. All nested collections are committed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<BoardTag>,
    #[serde(default)]
    pub items: ItemStore,
    #[serde(default)]
    pub containers: ContainerStore,
    #[serde(default)]
    pub container_order: ContainerOrder,
    #[serde(default)]
    pub container_item_mapping: ContainerItemMapping,
    /// Next value of the per-board id counter. Zero means "not yet seeded"
    /// (boards written before the counter existed).
    #[serde(default)]
    pub next_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new item. The engine assigns the id and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub badge_color: Color,
    #[serde(default)]
    pub completed: bool,
}

impl ItemDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Fields for a new container. The engine assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDraft {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ContainerKind,
    #[serde(default)]
    pub completed_item_order: CompletedItemOrder,
    #[serde(default)]
    pub badge_color: Color,
}

impl ContainerDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn checklist(title: impl Into<String>, order: CompletedItemOrder) -> Self {
        Self {
            title: title.into(),
            kind: ContainerKind::Checklist,
            completed_item_order: order,
            ..Self::default()
        }
    }
}

/// Partial update of a container's metadata. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContainerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_item_order: Option<CompletedItemOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_color: Option<Color>,
}

/// Partial update of an item. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_color: Option<Color>,
}

/// Summary info for a board in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub slug: String,
    pub title: String,
    pub tags: Vec<BoardTag>,
    pub container_count: usize,
    pub item_count: usize,
    pub completed_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
