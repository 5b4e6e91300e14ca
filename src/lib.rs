mod feature_state;
mod file_store;
mod memory_store;
mod object_store;
mod repository;
mod serializer;
mod test_common;

pub use feature_state::*;
pub use file_store::*;
pub use memory_store::*;
pub use object_store::*;
pub use repository::*;
pub use serializer::*;
