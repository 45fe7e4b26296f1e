pub mod enums;
pub mod ordered;
pub mod case;
pub mod checklist;
pub mod pipeline;

pub use enums::*;
pub use ordered::OrderedMap;
pub use case::*;
pub use checklist::*;
pub use pipeline::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
