//! In-memory client registry.
//!
//! Holds every named, live session behind one mutex. Name uniqueness and the
//! capacity bound are checked and applied inside the same critical section, so
//! they hold under any interleaving of joins, renames and removals.
//!
//! Callers that need several steps to be atomic with respect to membership
//! (the broadcaster's publish and join) take the lock once with
//! [`ClientRegistry::lock`] and work through the returned [`Members`] guard.

use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex, MutexGuard, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{DisplayName, RegistryError, SessionError},
    infrastructure::codec::Outbound,
};

/// Default number of sessions allowed in the room
pub const DEFAULT_CAPACITY: usize = 10;

/// Process-unique identity of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sending side of a session's bounded outbound queue.
///
/// The receiving side belongs to the session's writer task, which is the only
/// code that touches the socket's write half.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<Outbound>,
}

impl Outbox {
    /// Create an outbox and the receiver its writer task drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Enqueue without waiting; a full queue means the client is not keeping up.
    pub fn deliver(&self, item: Outbound) -> Result<(), SessionError> {
        self.sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SessionError::QueueClosed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Cheap, cloneable reference to a live session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    outbox: Outbox,
    closer: CancellationToken,
}

impl SessionHandle {
    pub fn new(id: SessionId, outbox: Outbox, closer: CancellationToken) -> Self {
        Self { id, outbox, closer }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn deliver(&self, item: Outbound) -> Result<(), SessionError> {
        self.outbox.deliver(item)
    }

    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed() && !self.closer.is_cancelled()
    }

    /// Force the session to wind down; its handler observes this and cleans up.
    pub fn close(&self) {
        self.closer.cancel();
    }

    /// Resolves once the session has been asked to close
    pub async fn closed(&self) {
        self.closer.cancelled().await
    }
}

#[derive(Debug)]
struct Member {
    name: DisplayName,
    handle: SessionHandle,
}

/// Concurrency-safe set of named sessions
#[derive(Debug)]
pub struct ClientRegistry {
    capacity: usize,
    members: Mutex<BTreeMap<SessionId, Member>>,
}

impl ClientRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            members: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the registry lock for a multi-step operation
    pub async fn lock(&self) -> Members<'_> {
        Members {
            capacity: self.capacity,
            guard: self.members.lock().await,
        }
    }

    pub async fn register(
        &self,
        name: &DisplayName,
        handle: SessionHandle,
    ) -> Result<(), RegistryError> {
        self.lock().await.register(name, handle)
    }

    pub async fn rename(&self, id: SessionId, new_name: &DisplayName) -> Result<(), RegistryError> {
        self.lock().await.rename(id, new_name)
    }

    pub async fn remove(&self, id: SessionId) -> Option<DisplayName> {
        self.lock().await.remove(id)
    }

    pub async fn snapshot(&self) -> Vec<SessionHandle> {
        self.lock().await.snapshot()
    }

    pub async fn names(&self) -> Vec<DisplayName> {
        self.lock().await.names()
    }

    pub async fn contains_name(&self, name: &DisplayName) -> bool {
        self.lock().await.contains_name(name)
    }

    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Locked view of the registry
pub struct Members<'a> {
    capacity: usize,
    guard: MutexGuard<'a, BTreeMap<SessionId, Member>>,
}

impl Members<'_> {
    /// Insert a session under `name`.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::RoomFull`] when the registry is at capacity
    /// * [`RegistryError::NameTaken`] when a live session already uses `name`
    /// * [`RegistryError::OutboxClosed`] when the session is already gone
    pub fn register(&mut self, name: &DisplayName, handle: SessionHandle) -> Result<(), RegistryError> {
        if self.guard.len() >= self.capacity {
            return Err(RegistryError::RoomFull {
                capacity: self.capacity,
            });
        }
        if self.contains_name(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        if !handle.is_open() {
            return Err(RegistryError::OutboxClosed);
        }
        self.guard.insert(
            handle.id(),
            Member {
                name: name.clone(),
                handle,
            },
        );
        Ok(())
    }

    /// Change the name of `id`. Only other sessions count as collisions.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::NotRegistered`] when `id` was removed or never joined
    /// * [`RegistryError::NameTaken`] when another live session uses `new_name`
    pub fn rename(&mut self, id: SessionId, new_name: &DisplayName) -> Result<(), RegistryError> {
        if !self.guard.contains_key(&id) {
            return Err(RegistryError::NotRegistered);
        }
        let taken = self
            .guard
            .iter()
            .any(|(other, member)| *other != id && &member.name == new_name);
        if taken {
            return Err(RegistryError::NameTaken(new_name.to_string()));
        }
        if let Some(member) = self.guard.get_mut(&id) {
            member.name = new_name.clone();
        }
        Ok(())
    }

    /// Remove `id` if present; returns the name it had
    pub fn remove(&mut self, id: SessionId) -> Option<DisplayName> {
        self.guard.remove(&id).map(|member| member.name)
    }

    /// Copy of the current members, in join order
    pub fn snapshot(&self) -> Vec<SessionHandle> {
        self.guard.values().map(|m| m.handle.clone()).collect()
    }

    pub fn names(&self) -> Vec<DisplayName> {
        self.guard.values().map(|m| m.name.clone()).collect()
    }

    pub fn name_of(&self, id: SessionId) -> Option<&DisplayName> {
        self.guard.get(&id).map(|m| &m.name)
    }

    pub fn contains_name(&self, name: &DisplayName) -> bool {
        self.guard.values().any(|m| &m.name == name)
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}
