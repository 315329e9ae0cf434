pub mod connection_pool;
pub mod mappers;
pub mod reset;
pub mod rows;
pub mod sqlite_store;

pub use connection_pool::{ConnectionPool, DbPool};
pub use reset::DeveloperReset;
pub use sqlite_store::SqliteDurableStore;
