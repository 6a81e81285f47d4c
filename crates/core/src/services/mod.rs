//! Domain services layered over the repositories.

#![allow(missing_docs)]

pub mod door;
pub mod events;
pub mod key;
pub mod permission;
pub mod session;
pub mod user;

pub use door::{CreateDoorInput, DoorResponse, DoorService, UpdateDoorInput};
pub use events::{
    NoOpPermissionChangePublisher, PermissionChange, PermissionChangePublisher,
    PermissionChangePublisherService,
};
pub use key::{CreateKeyInput, KeyService, KeyWithOwner, UpdateKeyInput};
pub use permission::{PermissionService, PermissionWithDoor, ReplacePermissionsInput};
pub use session::{LoginInput, Session, SessionService, hash_password};
pub use user::UserService;
