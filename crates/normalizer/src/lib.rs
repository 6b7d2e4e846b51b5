pub mod models;
pub mod payloads;
pub mod transform;

pub use models::{OwnerKind, RepositoryRecord};
pub use payloads::{PageInfo, SearchPage};
pub use transform::extract_record;
