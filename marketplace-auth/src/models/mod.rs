pub mod session;
pub mod user;

pub use session::Session;
pub use user::{IdentityProvider, NewUser, User, UserStatus, UserType};
