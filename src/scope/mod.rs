/*!
 * Resource Scopes
 *
 * A scope tracks whether a group of resources is still valid, which thread
 * may touch it, and what must run when it closes.
 *
 * ## States
 *
 * `ALIVE` (initial) → `CLOSED` (terminal), exactly once. The state word packs
 * the acquire count: `>= 0` alive with that many handles (or in-flight
 * shared accesses), [`CLOSING`] while close actions run, [`CLOSED`] after.
 *
 * ## Kinds
 *
 * - **Confined**: owned by one thread; only the owner may access or close it
 * - **Shared**: any thread may access or close it
 * - **Implicit**: shared, closes when the last reference is dropped
 * - **Global**: shared, never closes
 *
 * Dropping the last reference to a scope that was never closed runs its
 * pending close actions, so every close action runs exactly once on every
 * path.
 */

mod handle;

pub use handle::{AccessGuard, ScopeHandle};

use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::id::ScopeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

/// Close actions run while the scope is in this state
const CLOSING: i64 = -2;

/// Terminal state
const CLOSED: i64 = -1;

type CloseAction = Box<dyn FnOnce() + Send + 'static>;

/// How a scope may be shared and closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Confined,
    Shared,
    Implicit,
    Global,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Confined => write!(f, "confined"),
            ScopeKind::Shared => write!(f, "shared"),
            ScopeKind::Implicit => write!(f, "implicit"),
            ScopeKind::Global => write!(f, "global"),
        }
    }
}

/// Target ownership for a scope transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ownership {
    Confined(ThreadId),
    Shared,
}

struct ScopeInner {
    id: ScopeId,
    kind: ScopeKind,
    owner: Option<ThreadId>,
    state: AtomicI64,
    actions: Mutex<Vec<CloseAction>>,
}

impl ScopeInner {
    fn new(kind: ScopeKind, owner: Option<ThreadId>, actions: Vec<CloseAction>) -> Self {
        let id = if kind == ScopeKind::Global {
            ScopeId::GLOBAL
        } else {
            ScopeId::next()
        };
        trace!(scope = %id, kind = %kind, "scope created");
        Self {
            id,
            kind,
            owner,
            state: AtomicI64::new(0),
            actions: Mutex::new(actions),
        }
    }

    #[inline]
    fn check_owner(&self) -> MemoryResult<()> {
        match self.owner {
            Some(owner) if owner != thread::current().id() => {
                Err(MemoryError::WrongThread { scope: self.id })
            }
            _ => Ok(()),
        }
    }

    /// Increment the acquire count unless the scope is closing or closed
    fn try_increment(&self) -> MemoryResult<()> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            // CLOSING and CLOSED are both negative
            if current < 0 {
                return Err(MemoryError::ScopeClosed { scope: self.id });
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    fn decrement(&self) {
        let previous = self.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "scope {} released more than acquired", self.id);
    }

    /// Move ALIVE(0) → CLOSING, reporting why that is impossible otherwise
    fn begin_close(&self) -> MemoryResult<()> {
        // Only an unacquired scope may close
        match self
            .state
            .compare_exchange(0, CLOSING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(count) if count > 0 => Err(MemoryError::ScopeAcquired {
                scope: self.id,
                count: count as u64,
            }),
            Err(_) => Err(MemoryError::ScopeClosed { scope: self.id }),
        }
    }

    fn run_close_actions(&self) -> usize {
        // Take the list before running so actions may touch the scope without deadlocking
        let actions = std::mem::take(&mut *self.actions.lock());
        let count = actions.len();
        for action in actions.into_iter().rev() {
            action();
        }
        count
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        // Last reference gone: nothing can observe the state any more
        if *self.state.get_mut() != CLOSED {
            *self.state.get_mut() = CLOSED;
            let actions = self.run_close_actions();
            trace!(scope = %self.id, kind = %self.kind, actions, "unreachable scope released");
        }
    }
}

/// Shared handle to a resource scope
///
/// Cloning a `Scope` yields another reference to the same scope. Segments and
/// allocators hold such references, so an implicit scope stays alive exactly
/// as long as something can still reach its memory.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    fn with_inner(inner: ScopeInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// New scope confined to the calling thread
    pub fn confined() -> Self {
        Self::confined_to(thread::current().id())
    }

    /// New scope confined to `owner`
    pub fn confined_to(owner: ThreadId) -> Self {
        Self::with_inner(ScopeInner::new(ScopeKind::Confined, Some(owner), Vec::new()))
    }

    /// New scope usable and closeable from any thread
    pub fn shared() -> Self {
        Self::with_inner(ScopeInner::new(ScopeKind::Shared, None, Vec::new()))
    }

    /// New shared scope that closes when its last reference is dropped
    pub fn implicit() -> Self {
        Self::with_inner(ScopeInner::new(ScopeKind::Implicit, None, Vec::new()))
    }

    /// Implicit scope that starts out owning `release`
    pub(crate) fn implicit_with<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_inner(ScopeInner::new(
            ScopeKind::Implicit,
            None,
            vec![Box::new(release)],
        ))
    }

    /// The process-wide scope that never closes
    pub fn global() -> Self {
        static GLOBAL: OnceLock<Scope> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Self::with_inner(ScopeInner::new(ScopeKind::Global, None, Vec::new())))
            .clone()
    }

    /// Run `f` with a fresh confined scope, closing it afterwards
    ///
    /// Fails if the scope cannot be closed, e.g. because `f` leaked a handle.
    pub fn confined_with<F, R>(f: F) -> MemoryResult<R>
    where
        F: FnOnce(&Scope) -> R,
    {
        let scope = Self::confined();
        let result = f(&scope);
        scope.close()?;
        Ok(result)
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.inner.kind
    }

    /// Owner thread, `None` for shared scopes
    #[inline]
    pub fn owner(&self) -> Option<ThreadId> {
        self.inner.owner
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) >= 0
    }

    #[inline]
    pub fn is_implicit(&self) -> bool {
        self.inner.kind == ScopeKind::Implicit
    }

    /// Number of outstanding handles and in-flight shared accesses
    pub fn acquired_count(&self) -> u64 {
        self.inner.state.load(Ordering::Acquire).max(0) as u64
    }

    /// Whether two handles refer to the same scope
    #[inline]
    pub fn same_as(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Verify the scope is alive and usable from the calling thread
    #[inline]
    pub fn check_valid(&self) -> MemoryResult<()> {
        self.inner.check_owner()?;
        if self.inner.state.load(Ordering::Acquire) < 0 {
            return Err(MemoryError::ScopeClosed {
                scope: self.inner.id,
            });
        }
        Ok(())
    }

    /// Start a memory access
    ///
    /// Shared scopes take a transient acquire so a concurrent `close()` fails
    /// instead of releasing memory under the access.
    #[inline]
    pub(crate) fn begin_access(&self) -> MemoryResult<AccessGuard<'_>> {
        match self.inner.kind {
            ScopeKind::Shared => {
                // Counted so close() sees the access in flight
                self.inner.try_increment()?;
                Ok(AccessGuard::counted(self))
            }
            // Confined scopes close on the accessing thread; implicit and
            // global scopes cannot close while this handle exists
            _ => {
                self.check_valid()?;
                Ok(AccessGuard::uncounted())
            }
        }
    }

    #[inline]
    pub(crate) fn end_access(&self) {
        self.inner.decrement();
    }

    /// Register an action to run when the scope closes
    ///
    /// Actions run in reverse registration order. Actions registered on the
    /// global scope never run, and whatever they own is never released.
    pub fn add_close_action<F>(&self, action: F) -> MemoryResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_add_close_action(action).map_err(|(err, _)| err)
    }

    /// Like [`Scope::add_close_action`], handing the action back on failure
    pub(crate) fn try_add_close_action<F>(&self, action: F) -> Result<(), (MemoryError, F)>
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = self.inner.check_owner() {
            return Err((err, action));
        }
        let mut actions = self.inner.actions.lock();
        // Checked under the list lock: close() flips the state before taking the list
        if self.inner.state.load(Ordering::Acquire) < 0 {
            return Err((
                MemoryError::ScopeClosed {
                    scope: self.inner.id,
                },
                action,
            ));
        }
        match self.inner.kind {
            // The global scope never closes, so its resources are leaked on purpose
            ScopeKind::Global => std::mem::forget(action),
            _ => actions.push(Box::new(action)),
        }
        Ok(())
    }

    /// Prevent the scope from closing until the returned handle is released
    pub fn acquire(&self) -> MemoryResult<ScopeHandle> {
        self.inner.check_owner()?;
        self.inner.try_increment()?;
        Ok(ScopeHandle::new(self.clone()))
    }

    /// Keep `target` open for as long as this scope is open
    pub fn keep_alive(&self, target: &Scope) -> MemoryResult<()> {
        if self.same_as(target) {
            return Err(MemoryError::invalid_argument(format!(
                "scope {} cannot keep itself alive",
                self.id()
            )));
        }
        let handle = target.acquire()?;
        // On failure the handle is dropped here, which releases it
        self.add_close_action(move || handle.release())
    }

    /// Close the scope, running its close actions in reverse order
    ///
    /// Closing is never idempotent: a second close always fails.
    pub fn close(&self) -> MemoryResult<()> {
        let inner = &self.inner;
        match inner.kind {
            ScopeKind::Implicit => {
                return Err(MemoryError::NotCloseable {
                    scope: inner.id,
                    reason: "implicit scopes close when they become unreachable",
                })
            }
            ScopeKind::Global => {
                return Err(MemoryError::NotCloseable {
                    scope: inner.id,
                    reason: "the global scope never closes",
                })
            }
            ScopeKind::Confined | ScopeKind::Shared => {}
        }
        inner.check_owner()?;
        inner.begin_close()?;
        // CLOSING blocks new acquires and new close actions while these run
        let actions = inner.run_close_actions();
        inner.state.store(CLOSED, Ordering::Release);
        debug!(scope = %inner.id, kind = %inner.kind, actions, "scope closed");
        Ok(())
    }

    /// Invalidate this scope and move its close actions to a new one
    ///
    /// The source scope ends up CLOSED without running its actions; every
    /// view still referring to it fails from now on.
    pub(crate) fn transfer(&self, to: Ownership) -> MemoryResult<Scope> {
        let inner = &self.inner;
        if inner.kind != ScopeKind::Confined {
            return Err(MemoryError::invalid_state(format!(
                "scope {} is already {}; only confined scopes can change ownership",
                inner.id, inner.kind
            )));
        }
        inner.check_owner()?;
        inner.begin_close()?;
        // Taken, not run: the memory now belongs to the new scope
        let actions = std::mem::take(&mut *inner.actions.lock());
        inner.state.store(CLOSED, Ordering::Release);

        let transferred = match to {
            Ownership::Confined(owner) => {
                Self::with_inner(ScopeInner::new(ScopeKind::Confined, Some(owner), actions))
            }
            Ownership::Shared => Self::with_inner(ScopeInner::new(ScopeKind::Shared, None, actions)),
        };
        debug!(from = %inner.id, to = %transferred.id(), kind = %transferred.kind(), "scope ownership transferred");
        Ok(transferred)
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("owner", &self.inner.owner)
            .field("alive", &self.is_alive())
            .field("acquired", &self.acquired_count())
            .finish()
    }
}
