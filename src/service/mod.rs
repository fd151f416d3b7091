//! CrudService: validation plus safe SQL, executed through a gateway.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::{escape_markup, RequestValidator, ValidationMode};
