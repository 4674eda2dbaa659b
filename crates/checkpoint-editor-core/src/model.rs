//! Chain and step types shared by the editor and the remote store.
//!
//! The shapes here mirror the stored document: a `Chain` is a titled,
//! ordered list of `Step`s. Only `title` and `checkpoints` are editable;
//! everything else is owned by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Opaque chain identifier assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(SmolStr);

impl ChainId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(SmolStr);

impl UserId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One entry in a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Step {
    /// An incomplete step with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }

    /// A step with an explicit completion flag.
    pub fn with_completed(text: impl Into<String>, completed: bool) -> Self {
        Self {
            text: text.into(),
            completed,
        }
    }

    /// Default step appended by "add step": `Step {position}`, 1-based.
    pub fn placeholder(position: usize) -> Self {
        Self::new(format!("Step {position}"))
    }
}

/// The persisted document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: ChainId,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub checkpoints: Vec<Step>,
    #[serde(default)]
    pub is_public: bool,
    pub code: SmolStr,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chain {
    /// The editable part of this chain.
    pub fn draft(&self) -> Draft {
        Draft {
            title: self.title.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }
}

/// Partial update over the top-level editable fields.
///
/// Absent fields are left untouched when applied; the two fields are
/// independently settable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<Vec<Step>>,
}

impl ChainPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            checkpoints: None,
        }
    }

    pub fn checkpoints(checkpoints: Vec<Step>) -> Self {
        Self {
            title: None,
            checkpoints: Some(checkpoints),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.checkpoints.is_none()
    }

    /// Whether this patch sets `field`.
    pub fn touches(&self, field: Field) -> bool {
        match field {
            Field::Title => self.title.is_some(),
            Field::Checkpoints => self.checkpoints.is_some(),
        }
    }

    /// Shallow merge onto `chain`. Does not stamp `updated_at`.
    pub fn apply_to(&self, chain: &mut Chain) {
        if let Some(title) = &self.title {
            chain.title = title.clone();
        }
        if let Some(checkpoints) = &self.checkpoints {
            chain.checkpoints = checkpoints.clone();
        }
    }
}

/// Locally editable state; also the undo/redo snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub checkpoints: Vec<Step>,
}

impl Draft {
    pub fn new(title: impl Into<String>, checkpoints: Vec<Step>) -> Self {
        Self {
            title: title.into(),
            checkpoints,
        }
    }
}

/// The two independently synchronized fields of a draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Checkpoints,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Title, Field::Checkpoints];

    /// Dense index for per-field arrays.
    pub const fn index(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Checkpoints => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Checkpoints => "checkpoints",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
