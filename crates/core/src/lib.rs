//! Pure domain logic shared by every other crate in the workspace.
//!
//! No internal dependencies and no I/O: everything here is data types and
//! functions that can be exercised without a database, a broker, or a
//! compute provider.

pub mod error;
pub mod fleet;
pub mod kinds;
pub mod params;
pub mod progress;
pub mod project;
pub mod results;
pub mod types;
