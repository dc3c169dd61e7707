//! Filters and router (§4.6): pure predicates evaluated on the loop thread
//! at dequeue time, plus an optional router that takes over execution.

use regex::Regex;

use super::task::Priority;

/// A predicate filter. Matching *excludes* the task (§4.6).
pub struct Filter {
    pub(crate) id: u64,
    pub(crate) priority: Option<Priority>,
    predicate: Box<dyn Fn(&[String]) -> bool + Send + Sync>,
}

impl Filter {
    pub(crate) fn new(
        id: u64,
        priority: Option<Priority>,
        predicate: Box<dyn Fn(&[String]) -> bool + Send + Sync>,
    ) -> Self {
        Self {
            id,
            priority,
            predicate,
        }
    }

    /// Whether this filter excludes a task of the given priority and tags.
    pub(crate) fn excludes(&self, priority: Priority, tags: &[String]) -> bool {
        match self.priority {
            Some(p) if p != priority => false,
            _ => (self.predicate)(tags),
        }
    }
}

/// A tag-regex filter: excludes a task if any of its tags match.
pub struct TagFilter {
    pub(crate) id: u64,
    regex: Regex,
}

impl TagFilter {
    pub(crate) fn new(id: u64, regex: Regex) -> Self {
        Self { id, regex }
    }

    pub(crate) fn excludes(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.regex.is_match(tag))
    }
}

/// `(tags, thunk) -> ()`. Must invoke `thunk` exactly once (§6).
pub type Router = Box<dyn Fn(&[String], Box<dyn FnOnce() + Send>) + Send + Sync>;
