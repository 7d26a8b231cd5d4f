//! Catalog database operations

pub mod books;
pub mod history;
pub mod queue;
pub mod stats;
