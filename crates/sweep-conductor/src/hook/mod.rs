pub mod condition;
pub mod host;
pub mod loader;
pub mod runner;
pub mod schema;
