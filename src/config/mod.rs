pub mod schema;
pub mod settings;

pub use schema::*;
pub use settings::*;
