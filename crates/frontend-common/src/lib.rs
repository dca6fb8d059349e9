//! Front end consumers of the portal session

pub mod auth;
pub mod config;
pub mod routes;

pub use auth::context::{AuthAction, AuthContext, AuthContextData, SharedAuthContext};
pub use config::AuthConfig;
pub use routes::{Navigation, Route};
