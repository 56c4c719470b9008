//! Sessions keyed by an owning context.

use crate::error::DbtoolResult;
use crate::session::Session;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of whatever owns a session (a window, a request, a job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// A process-unique id.
    pub fn new() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// At most one [`Session`] per context.
///
/// Owned explicitly by the application; there is no global instance.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ContextId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `ctx`, created with `make` on first use.
    pub fn get_or_create(
        &mut self,
        ctx: ContextId,
        make: impl FnOnce() -> Session,
    ) -> &mut Session {
        match self.sessions.entry(ctx) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(target: "dbtool", context = ctx.as_raw(), "creating session");
                entry.insert(make())
            }
        }
    }

    /// Like [`get_or_create`](Self::get_or_create), then points the session
    /// at `db_name`.
    pub fn session_for(
        &mut self,
        ctx: ContextId,
        db_name: &str,
        make: impl FnOnce() -> Session,
    ) -> DbtoolResult<&mut Session> {
        let session = self.get_or_create(ctx, make);
        session.set_db(db_name)?;
        Ok(session)
    }

    pub fn get(&mut self, ctx: ContextId) -> Option<&mut Session> {
        self.sessions.get_mut(&ctx)
    }

    /// Register `session` for `ctx`, returning the one it replaces.
    pub fn insert(&mut self, ctx: ContextId, session: Session) -> Option<Session> {
        self.sessions.insert(ctx, session)
    }

    pub fn remove(&mut self, ctx: ContextId) -> Option<Session> {
        self.sessions.remove(&ctx)
    }

    /// Destroy and forget the session for `ctx`. Returns whether one existed.
    pub fn teardown(&mut self, ctx: ContextId) -> bool {
        match self.sessions.remove(&ctx) {
            Some(mut session) => {
                session.destroy();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Destroy every session.
    pub fn clear(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.destroy();
        }
    }
}
