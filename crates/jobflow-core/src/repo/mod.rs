pub mod memory;
pub mod types;

pub use memory::{InMemoryBlueprintRepository, InMemoryJobRepository};
pub use types::{BlueprintRepository, JobRepository};
