pub mod error;
pub mod id;
pub mod model;
pub mod patch;

pub use error::ErrorKind;
pub use id::{InvalidRecordId, RecordId};
pub use model::*;
pub use patch::Patch;
