//! Database entities.

pub mod access_key;
pub mod door;
pub mod permission;
pub mod user;

pub use access_key::Entity as AccessKey;
pub use door::Entity as Door;
pub use permission::Entity as Permission;
pub use user::Entity as User;
