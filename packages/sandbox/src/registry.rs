// ABOUTME: Explicitly owned mapping from session ids to their sandboxes
// ABOUTME: Held by the embedding application; entries are created and removed by explicit operations only

use crate::handle::SandboxHandle;
use crate::types::Sandbox;
use std::collections::HashMap;

/// One session's sandbox plus the handle bound to it.
#[derive(Debug)]
pub struct SessionEntry {
    pub sandbox: Sandbox,
    pub handle: SandboxHandle,
}

/// Sandboxes keyed by logical session id.
///
/// Not a process-wide singleton: the orchestrating application owns an
/// instance, and the collection's lifetime is that owner's lifetime. The
/// owner also provides whatever synchronization its concurrency model
/// needs; sessions never share an entry.
#[derive(Debug, Default)]
pub struct SessionSandboxes {
    entries: HashMap<String, SessionEntry>,
}

impl SessionSandboxes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session's sandbox. Returns the displaced entry if the
    /// session already had one; the caller must destroy it.
    pub fn insert(&mut self, session_id: impl Into<String>, entry: SessionEntry) -> Option<SessionEntry> {
        self.entries.insert(session_id.into(), entry)
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionEntry> {
        self.entries.get(session_id)
    }

    /// Claim exclusive ownership of a session's entry, removing it.
    /// This is how a destroy path takes the sandbox it is about to reap.
    pub fn take(&mut self, session_id: &str) -> Option<SessionEntry> {
        self.entries.remove(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
