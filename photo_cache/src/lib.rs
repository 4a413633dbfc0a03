mod cache;
pub mod errors;
pub(crate) mod memory_cache;
pub(crate) mod reference;
pub(crate) mod traits;

pub use cache::{PhotoLookup, PhotoProxy};
pub use errors::PhotoError;
