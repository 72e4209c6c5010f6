//! Arena and interning primitives.
//!
//! `knight-analyzer`'s symbolic-expression and memory-region pools need two
//! things the standard library doesn't give for free: bump allocation (so a
//! translation unit's tens of thousands of interned nodes don't each cost a
//! heap allocation) and a stable, `Copy` identifier for each allocated node
//! that stands in for pointer identity without borrowing the arena's
//! lifetime into every data structure that wants to refer to a node.
//!
//! This crate has no knowledge of symbols, regions, or any other
//! analyzer-specific type; it is the dependency-free foundation the
//! `knight-analyzer` crate builds its intern pools on top of.

mod arena;
mod id;
mod intern;

pub use arena::Arena;
pub use id::Id;
pub use intern::Interner;

pub use bumpalo::Bump;
