pub mod model;

pub use model::{NewUser, User, UserId, UserPatch};
