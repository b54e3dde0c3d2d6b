pub mod error;
pub mod field_value;
pub mod filter;
pub mod ids;
pub mod model;
pub mod options;
pub mod path;
pub mod validation;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::Key;
pub use model::*;
pub use path::{Collection, StorePath};
