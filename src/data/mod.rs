//! Data loading and dataset implementations
//!
//! Both loaders produce dense feature matrices and keep targets exactly as
//! written in the file.

pub mod csv;
pub mod libsvm;

pub use self::csv::*;
pub use self::libsvm::*;
