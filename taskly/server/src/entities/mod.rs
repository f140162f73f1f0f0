pub mod access_token;
pub mod task;
pub mod user;

pub mod prelude {
    pub use super::access_token::Entity as AccessToken;
    pub use super::task::Entity as Task;
    pub use super::user::Entity as User;
}
