//! SQLite persistence for order preferences: the table lifecycle
//! (install, upgrade, uninstall) and a repository over it.

pub mod schema;
pub mod sqlite_store;
