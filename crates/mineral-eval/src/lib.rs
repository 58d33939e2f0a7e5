//! The `mr` function: a recursively invokable, memoized SPARQL function.
//!
//! A call renders its arguments into a query template, sends the query to an [`Oracle`]
//! (normally a remote endpoint) and returns the first row's result. The visitation cache turns
//! self-referential definitions into terminating computations, and the `fast` strategy prunes
//! branches against a shared best-so-far bound.

pub mod evaluator;
pub mod oracle;
pub mod outcome;
pub mod registry;
pub mod template;

pub use evaluator::*;
pub use oracle::*;
pub use outcome::*;
pub use registry::*;
pub use template::*;

pub use mineral_core::{MineralError, Result, Term};
