/*!
 * Core Module
 * Fundamental types, error handling, limits and synchronization
 */

pub mod errors;
pub mod id;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use id::ScopeId;
pub use types::*;
