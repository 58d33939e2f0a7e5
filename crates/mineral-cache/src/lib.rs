//! Shared state behind the recursive function.
//!
//! - `key`: canonical encoding of a whole argument tuple
//! - `visitation`: tri-state memo table doubling as the cycle guard (DashMap)
//! - `best`: best-so-far register with compare-and-update semantics (ArcSwapOption)

pub mod best;
pub mod key;
pub mod visitation;

pub use best::*;
pub use key::*;
pub use visitation::*;
