//! Collapsible Manager: expansion state, focus and undo history for
//! collapsible sections, keyed by stable section id.
//!
//! Sections persist across re-renders. Every mutating operation except
//! [`CollapsibleManager::restore_from_snapshot`] and
//! [`CollapsibleManager::clear`] records a snapshot; snapshot timestamps are
//! strictly increasing and the history is bounded (oldest evicted first).

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use comply_core::config::HistoryConfig;
use thiserror::Error;
use tracing::Span;

use crate::block::CollapsibleBlock;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollapsibleError {
    #[error("Section not found: {0}")]
    NotFound(String),

    #[error("No snapshot at or before {0}")]
    NoSnapshot(DateTime<Utc>),

    #[error("No sections registered")]
    Empty,

    #[error("No section is focused")]
    NoFocus,

    #[error("Section '{0}' has no parent")]
    NoParent(String),

    #[error("Section '{0}' has no children")]
    NoChildren(String),
}

/// Per-section state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsibleState {
    pub id: String,
    pub expanded: bool,
    pub toggle_count: u32,
    pub last_toggled: Option<DateTime<Utc>>,
    pub has_children: bool,
    pub children: Vec<String>,
    pub parent: Option<String>,
    /// Position in focus order.
    pub focus_index: usize,
    pub level: u32,
}

/// What a section declares when it is first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    pub expanded: bool,
    pub level: u32,
    pub has_children: bool,
}

impl SectionInfo {
    /// Takes the declared level, or `default_level` when the block has none.
    pub fn from_block(block: &CollapsibleBlock, default_level: u32) -> Self {
        Self {
            expanded: block.expanded,
            level: block.level.unwrap_or(default_level),
            has_children: !block.content.is_empty(),
        }
    }
}

/// Immutable copy of all section state at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub timestamp: DateTime<Utc>,
    pub operation: &'static str,
    pub order: Vec<String>,
    pub sections: HashMap<String, CollapsibleState>,
    pub focus: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPreferences {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for HistoryPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl From<&HistoryConfig> for HistoryPreferences {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            enabled: config.enabled,
            capacity: config.capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    Parent,
    Child,
    First,
    Last,
}

impl Navigation {
    fn operation(self) -> &'static str {
        match self {
            Self::Next => "focus_next",
            Self::Previous => "focus_previous",
            Self::Parent => "focus_parent",
            Self::Child => "focus_child",
            Self::First => "focus_first",
            Self::Last => "focus_last",
        }
    }
}

#[derive(Debug)]
pub struct CollapsibleManager {
    sections: HashMap<String, CollapsibleState>,
    order: Vec<String>,
    focus: Option<usize>,
    history: VecDeque<StateSnapshot>,
    preferences: HistoryPreferences,
    last_timestamp: Option<DateTime<Utc>>,
    span: Span,
}

impl CollapsibleManager {
    pub fn new(preferences: HistoryPreferences) -> Self {
        Self {
            sections: HashMap::new(),
            order: Vec::new(),
            focus: None,
            history: VecDeque::new(),
            preferences,
            last_timestamp: None,
            span: tracing::debug_span!("collapsible_manager"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Registers a section the first time it is seen.
    ///
    /// Returns `false` (and changes nothing) when the id is already known.
    /// The parent is the most recently registered section one level up.
    pub fn register_section(&mut self, id: &str, info: SectionInfo) -> bool {
        if self.sections.contains_key(id) {
            return false;
        }

        let parent = match info.level.checked_sub(1) {
            Some(parent_level) => self
                .order
                .iter()
                .rev()
                .find(|other| {
                    self.sections
                        .get(other.as_str())
                        .is_some_and(|state| state.level == parent_level)
                })
                .cloned(),
            None => None,
        };

        if let Some(parent_state) = parent.as_ref().and_then(|p| self.sections.get_mut(p)) {
            parent_state.children.push(id.to_string());
            parent_state.has_children = true;
        }

        self.sections.insert(
            id.to_string(),
            CollapsibleState {
                id: id.to_string(),
                expanded: info.expanded,
                toggle_count: 0,
                last_toggled: None,
                has_children: info.has_children,
                children: Vec::new(),
                parent,
                focus_index: self.order.len(),
                level: info.level,
            },
        );
        self.order.push(id.to_string());

        self.span.in_scope(|| {
            tracing::debug!(section = id, level = info.level, "registered section");
        });
        self.record("register");
        true
    }

    /// Flips one section. Collapsing also collapses all its descendants.
    ///
    /// Returns the new expansion state.
    pub fn toggle_section(&mut self, id: &str) -> Result<bool, CollapsibleError> {
        let state = self
            .sections
            .get_mut(id)
            .ok_or_else(|| CollapsibleError::NotFound(id.to_string()))?;

        state.expanded = !state.expanded;
        state.toggle_count += 1;
        state.last_toggled = Some(Utc::now());
        let expanded = state.expanded;

        if !expanded {
            self.collapse_descendants(id);
        }

        self.span.in_scope(|| {
            tracing::debug!(section = id, expanded, "toggled section");
        });
        self.record("toggle");
        Ok(expanded)
    }

    /// Sets one section's expansion directly; collapsing cascades.
    pub fn set_expanded(&mut self, id: &str, expanded: bool) -> Result<(), CollapsibleError> {
        let state = self
            .sections
            .get_mut(id)
            .ok_or_else(|| CollapsibleError::NotFound(id.to_string()))?;
        state.expanded = expanded;
        if !expanded {
            self.collapse_descendants(id);
        }
        self.record("set_expanded");
        Ok(())
    }

    pub fn expand_all(&mut self) {
        self.sections.values_mut().for_each(|state| state.expanded = true);
        self.record("expand_all");
    }

    pub fn collapse_all(&mut self) {
        self.sections.values_mut().for_each(|state| state.expanded = false);
        self.record("collapse_all");
    }

    /// Unknown ids report collapsed.
    pub fn is_expanded(&self, id: &str) -> bool {
        self.sections.get(id).is_some_and(|state| state.expanded)
    }

    pub fn section(&self, id: &str) -> Option<&CollapsibleState> {
        self.sections.get(id)
    }

    /// Sections in focus order.
    pub fn sections(&self) -> impl Iterator<Item = &CollapsibleState> {
        self.order.iter().filter_map(|id| self.sections.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn focused(&self) -> Option<&str> {
        self.focus
            .and_then(|index| self.order.get(index))
            .map(String::as_str)
    }

    /// Moves focus and returns the newly focused id.
    ///
    /// `Next`/`Previous` wrap around; with nothing focused they start at the
    /// first/last section.
    pub fn navigate(&mut self, direction: Navigation) -> Result<String, CollapsibleError> {
        let count = self.order.len();
        if count == 0 {
            return Err(CollapsibleError::Empty);
        }

        let index = match direction {
            Navigation::Next => self.focus.map_or(0, |i| (i + 1) % count),
            Navigation::Previous => self.focus.map_or(count - 1, |i| (i + count - 1) % count),
            Navigation::First => 0,
            Navigation::Last => count - 1,
            Navigation::Parent => {
                let current = self.focused_state()?;
                let parent = current
                    .parent
                    .as_ref()
                    .ok_or_else(|| CollapsibleError::NoParent(current.id.clone()))?;
                self.index_of(parent)?
            }
            Navigation::Child => {
                let current = self.focused_state()?;
                let child = current
                    .children
                    .first()
                    .ok_or_else(|| CollapsibleError::NoChildren(current.id.clone()))?;
                self.index_of(child)?
            }
        };

        self.focus = Some(index);
        self.record(direction.operation());
        Ok(self.order[index].clone())
    }

    pub fn focus_next(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::Next)
    }

    pub fn focus_previous(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::Previous)
    }

    pub fn focus_parent(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::Parent)
    }

    pub fn focus_child(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::Child)
    }

    pub fn focus_first(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::First)
    }

    pub fn focus_last(&mut self) -> Result<String, CollapsibleError> {
        self.navigate(Navigation::Last)
    }

    /// Focuses a section by id.
    pub fn focus_section(&mut self, id: &str) -> Result<(), CollapsibleError> {
        let index = self.index_of(id)?;
        self.focus = Some(index);
        self.record("focus");
        Ok(())
    }

    /// Restores the latest snapshot taken at or before `timestamp`.
    ///
    /// Restoring does not itself record a snapshot.
    pub fn restore_from_snapshot(&mut self, timestamp: DateTime<Utc>) -> Result<(), CollapsibleError> {
        let snapshot = self
            .history
            .iter()
            .rev()
            .find(|snapshot| snapshot.timestamp <= timestamp)
            .ok_or(CollapsibleError::NoSnapshot(timestamp))?;

        self.sections = snapshot.sections.clone();
        self.order = snapshot.order.clone();
        self.focus = snapshot.focus;

        self.span.in_scope(|| {
            tracing::debug!(%timestamp, operation = snapshot.operation, "restored snapshot");
        });
        Ok(())
    }

    /// Snapshots oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &StateSnapshot> + ExactSizeIterator {
        self.history.iter()
    }

    /// Drops every section, the focus and the history.
    pub fn clear(&mut self) {
        self.sections.clear();
        self.order.clear();
        self.focus = None;
        self.history.clear();
    }

    fn focused_state(&self) -> Result<&CollapsibleState, CollapsibleError> {
        self.focused()
            .and_then(|id| self.sections.get(id))
            .ok_or(CollapsibleError::NoFocus)
    }

    fn index_of(&self, id: &str) -> Result<usize, CollapsibleError> {
        self.order
            .iter()
            .position(|other| other == id)
            .ok_or_else(|| CollapsibleError::NotFound(id.to_string()))
    }

    fn collapse_descendants(&mut self, id: &str) {
        let mut pending: Vec<String> = self
            .sections
            .get(id)
            .map(|state| state.children.clone())
            .unwrap_or_default();

        while let Some(child) = pending.pop() {
            if let Some(state) = self.sections.get_mut(&child) {
                state.expanded = false;
                pending.extend(state.children.iter().cloned());
            }
        }
    }

    fn record(&mut self, operation: &'static str) {
        if !self.preferences.enabled || self.preferences.capacity == 0 {
            return;
        }

        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        self.history.push_back(StateSnapshot {
            timestamp,
            operation,
            order: self.order.clone(),
            sections: self.sections.clone(),
            focus: self.focus,
        });
        while self.history.len() > self.preferences.capacity {
            self.history.pop_front();
        }
    }
}

impl Default for CollapsibleManager {
    fn default() -> Self {
        Self::new(HistoryPreferences::default())
    }
}
