pub mod schema;
pub mod validation;

pub use schema::*;
pub use validation::*;
