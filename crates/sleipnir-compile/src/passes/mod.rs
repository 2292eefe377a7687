//! Built-in passes.

pub mod deps;
pub mod inline;
pub mod rename;
pub mod xbit;

pub use deps::{Dependency, DependencyPass};
pub use inline::{inline_all, inline_call};
pub use rename::RenamePass;
pub use xbit::{XbitNumbering, XbitNumberingPass};
