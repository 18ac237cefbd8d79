//! API route definitions.
//!
//! This module organizes all HTTP routes for the todo API server.

mod health;
mod index;
mod todos;

pub use health::health_routes;
pub use index::index_routes;
pub use todos::{todo_routes, CreateTodo, ListParams};
