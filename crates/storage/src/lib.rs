#![forbid(unsafe_code)]

//! Progress store adapter: repository traits, an in-memory test double, and
//! the SQLite backend.

pub mod repository;
pub mod sqlite;
