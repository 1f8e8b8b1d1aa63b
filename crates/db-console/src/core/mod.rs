pub mod backend;
pub mod schema;
pub mod sqlite;
pub mod statement;
pub mod types;
