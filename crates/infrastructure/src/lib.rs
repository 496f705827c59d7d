pub mod repositories;
pub mod sqlite;

pub use repositories::*;
pub use sqlite::*;
