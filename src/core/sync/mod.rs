/*!
 * Synchronization Primitives
 *
 * The pool's bucket queues are the only structure shared by arbitrary
 * threads with hold times of a single push or pop, so they use a spin lock
 * instead of a parking mutex. Longer critical sections (arena cursors, close
 * action lists) use `parking_lot::Mutex`.
 */

mod spinlock;

pub use spinlock::{SpinLock, SpinLockGuard};
