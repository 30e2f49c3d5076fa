use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{SubjectId, TopicId, UserId};

/// Difficulty the scorer assumes when a subject carries none.
pub const DEFAULT_DIFFICULTY: u8 = 3;
pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

pub const DEFAULT_CONFIDENCE: u8 = 5;
pub const DEFAULT_COLOR: &str = "#3B82F6";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,

    #[error("topic confidence must be between 1 and 10, got {0}")]
    InvalidConfidence(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("difficulty must be between 1 and 5, got {0}")]
    InvalidDifficulty(u8),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("topic {0} not found in syllabus")]
    TopicNotFound(TopicId),

    #[error("invalid priority: {0}")]
    InvalidPriority(String),

    #[error(transparent)]
    Topic(#[from] TopicError),
}

//
// ─── PRIORITY ──────────────────────────────────────────────────────────────────
//

/// User-assigned importance tier of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl SubjectPriority {
    /// Numeric weight used for session length: low=1, medium=3, high=5.
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            SubjectPriority::Low => 1,
            SubjectPriority::Medium => 3,
            SubjectPriority::High => 5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectPriority::Low => "low",
            SubjectPriority::Medium => "medium",
            SubjectPriority::High => "high",
        }
    }
}

impl fmt::Display for SubjectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectPriority {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(SubjectError::InvalidPriority(s.to_owned())),
        }
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// One syllabus entry of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: String,
    completed: bool,
    confidence: u8,
    notes: String,
    last_studied: Option<DateTime<Utc>>,
}

impl Topic {
    /// Creates an unfinished topic with default confidence.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if name is empty or whitespace-only.
    pub fn new(id: TopicId, name: impl Into<String>) -> Result<Self, TopicError> {
        Self::from_persisted(id, name, false, DEFAULT_CONFIDENCE, String::new(), None)
    }

    /// Rehydrate a topic from storage.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if the name is empty or confidence is outside 1..=10.
    pub fn from_persisted(
        id: TopicId,
        name: impl Into<String>,
        completed: bool,
        confidence: u8,
        notes: String,
        last_studied: Option<DateTime<Utc>>,
    ) -> Result<Self, TopicError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TopicError::EmptyName);
        }
        validate_confidence(confidence)?;

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            completed,
            confidence,
            notes,
            last_studied,
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn last_studied(&self) -> Option<DateTime<Utc>> {
        self.last_studied
    }
}

fn validate_confidence(confidence: u8) -> Result<(), TopicError> {
    if (1..=10).contains(&confidence) {
        Ok(())
    } else {
        Err(TopicError::InvalidConfidence(confidence))
    }
}

/// Input shape for a syllabus topic on a new subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDraft {
    pub name: String,
    pub completed: bool,
}

impl TopicDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }

    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Partial update applied to a single topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicUpdate {
    pub completed: Option<bool>,
    pub confidence: Option<u8>,
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// Input shape for creating a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub description: Option<String>,
    pub difficulty: u8,
    pub priority: SubjectPriority,
    pub color: Option<String>,
    pub syllabus: Vec<TopicDraft>,
}

impl SubjectDraft {
    /// Draft with medium priority, default difficulty and an empty syllabus.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            difficulty: DEFAULT_DIFFICULTY,
            priority: SubjectPriority::default(),
            color: None,
            syllabus: Vec::new(),
        }
    }
}

/// Partial update of a subject's descriptive fields.
///
/// The syllabus, study time and active flag have their own operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectEdit {
    pub name: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub difficulty: Option<u8>,
    pub priority: Option<SubjectPriority>,
    pub color: Option<String>,
}

/// A subject of study with its syllabus and progress metrics.
///
/// Completion is never stored: `completion_percentage` always derives from
/// the syllabus, so it cannot drift from topic state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    user_id: UserId,
    name: String,
    description: Option<String>,
    difficulty: Option<u8>,
    priority: SubjectPriority,
    color: String,
    syllabus: Vec<Topic>,
    total_study_minutes: u32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Subject {
    /// Creates a new active subject from a draft.
    ///
    /// Topics receive ids `1..=n` in syllabus order.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the name is empty, the difficulty is outside
    /// 1..=5, the color is not a hex color, or a topic name is empty.
    pub fn new(
        id: SubjectId,
        user_id: UserId,
        draft: SubjectDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&draft.difficulty) {
            return Err(SubjectError::InvalidDifficulty(draft.difficulty));
        }

        let mut syllabus = Vec::with_capacity(draft.syllabus.len());
        for (index, topic) in (1_u64..).zip(draft.syllabus) {
            let mut built = Topic::new(TopicId::new(index), topic.name)?;
            built.completed = topic.completed;
            syllabus.push(built);
        }

        Self::from_persisted(
            id,
            user_id,
            draft.name,
            draft.description,
            Some(draft.difficulty),
            draft.priority,
            draft.color,
            syllabus,
            0,
            true,
            created_at,
        )
    }

    /// Rehydrate a subject from storage.
    ///
    /// A difficulty outside 1..=5 is treated as missing rather than rejected;
    /// the scorer then falls back to `DEFAULT_DIFFICULTY`.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` or `SubjectError::InvalidColor`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SubjectId,
        user_id: UserId,
        name: impl Into<String>,
        description: Option<String>,
        difficulty: Option<u8>,
        priority: SubjectPriority,
        color: Option<String>,
        syllabus: Vec<Topic>,
        total_study_minutes: u32,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SubjectError::EmptyName);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let color = match color.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()) {
            Some(c) if is_hex_color(&c) => c,
            Some(c) => return Err(SubjectError::InvalidColor(c)),
            None => DEFAULT_COLOR.to_owned(),
        };

        let difficulty =
            difficulty.filter(|d| (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(d));

        Ok(Self {
            id,
            user_id,
            name: name.trim().to_owned(),
            description,
            difficulty,
            priority,
            color,
            syllabus,
            total_study_minutes,
            is_active,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Stored difficulty, `None` when missing or malformed.
    #[must_use]
    pub fn difficulty(&self) -> Option<u8> {
        self.difficulty
    }

    #[must_use]
    pub fn priority(&self) -> SubjectPriority {
        self.priority
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn syllabus(&self) -> &[Topic] {
        &self.syllabus
    }

    #[must_use]
    pub fn total_study_minutes(&self) -> u32 {
        self.total_study_minutes
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn total_topics(&self) -> usize {
        self.syllabus.len()
    }

    #[must_use]
    pub fn completed_topics(&self) -> usize {
        self.syllabus.iter().filter(|t| t.completed).count()
    }

    /// `round(completed / total * 100)`, or 0 for an empty syllabus.
    #[must_use]
    pub fn completion_percentage(&self) -> u8 {
        let total = self.total_topics();
        if total == 0 {
            return 0;
        }
        // Half-up rounding in integers: floor((200c + t) / 2t).
        let pct = (200 * self.completed_topics() + total) / (2 * total);
        u8::try_from(pct).unwrap_or(100)
    }

    /// Apply a partial update to one topic and stamp it as studied.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::TopicNotFound` if the topic is not in the syllabus,
    /// or `SubjectError::Topic` if the confidence is out of range.
    pub fn update_topic(
        &mut self,
        topic_id: TopicId,
        update: TopicUpdate,
        studied_at: DateTime<Utc>,
    ) -> Result<(), SubjectError> {
        let topic = self
            .syllabus
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or(SubjectError::TopicNotFound(topic_id))?;

        if let Some(confidence) = update.confidence {
            validate_confidence(confidence)?;
            topic.confidence = confidence;
        }
        if let Some(completed) = update.completed {
            topic.completed = completed;
        }
        topic.last_studied = Some(studied_at);
        Ok(())
    }

    /// Apply an edit. Nothing changes unless every supplied field is valid.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName`, `InvalidDifficulty` or `InvalidColor`.
    pub fn apply_edit(&mut self, edit: SubjectEdit) -> Result<(), SubjectError> {
        let name = match edit.name {
            Some(n) if n.trim().is_empty() => return Err(SubjectError::EmptyName),
            Some(n) => n.trim().to_owned(),
            None => self.name.clone(),
        };
        if let Some(d) = edit.difficulty {
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&d) {
                return Err(SubjectError::InvalidDifficulty(d));
            }
        }
        let color = match edit.color.map(|c| c.trim().to_owned()) {
            Some(c) if is_hex_color(&c) => c,
            Some(c) => return Err(SubjectError::InvalidColor(c)),
            None => self.color.clone(),
        };

        self.name = name;
        self.color = color;
        if let Some(description) = edit.description {
            self.description = Some(description.trim().to_owned()).filter(|d| !d.is_empty());
        }
        if let Some(d) = edit.difficulty {
            self.difficulty = Some(d);
        }
        if let Some(p) = edit.priority {
            self.priority = p;
        }
        Ok(())
    }

    /// Add logged study time. Accumulated time never decreases.
    pub fn add_study_minutes(&mut self, minutes: u32) {
        self.total_study_minutes = self.total_study_minutes.saturating_add(minutes);
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

fn is_hex_color(raw: &str) -> bool {
    raw.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
