// # Value Types
//
// Plain data handed into the orchestration core by its callers. The core
// owns no storage: ids and timestamps are generated here so callers can
// persist these values however they like.

pub mod address;
pub mod credentials;
pub mod moves;

pub use address::Address;
pub use credentials::ServiceCredentials;
pub use moves::{Move, MoveStatus};
