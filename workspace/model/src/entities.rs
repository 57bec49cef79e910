//! Root for all SeaORM entity modules.
//!
//! Users authenticate with an email and a hashed password and hold at most
//! one bearer token. Mangos are standalone records with no relations.

pub mod auth_token;
pub mod mango;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::auth_token::Entity as AuthToken;
    pub use super::mango::Entity as Mango;
    pub use super::user::Entity as User;
}
