//! Database repositories.

pub mod access_key;
pub mod door;
pub mod permission;
pub mod user;

pub use access_key::AccessKeyRepository;
pub use door::DoorRepository;
pub use permission::{PermissionRepository, ReplaceOutcome};
pub use user::UserRepository;
