mod error;
mod model;
mod types;


pub use error::*;
pub use model::*;
pub use types::*;
