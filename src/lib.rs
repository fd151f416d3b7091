//! Sales API: validated CRUD over agents, companies, customers and orders.

pub mod config;
pub mod docs;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{EntityKind, EntitySchema, FieldDescriptor, FieldKind, Settings};
pub use error::{AppError, ConfigError, Violation};
pub use gateway::{Gateway, MemoryGateway, Outcome, PgGateway, Row};
pub use migration::{ensure_database_exists, ensure_tables};
pub use response::{success, Envelope, MutationResult};
pub use routes::{app, common_routes, docs_routes, entity_routes};
pub use service::{CrudService, RequestValidator, ValidationMode};
pub use state::AppState;
