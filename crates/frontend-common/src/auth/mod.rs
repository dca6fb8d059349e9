//! Authentication module

pub mod context;
pub mod error_handler;
pub mod error_messages;

pub use context::{
    AuthAction, AuthContext, AuthContextData, SharedAuthContext, install_auth_error_handler,
};
pub use error_handler::{AuthFailure, trigger_auth_error};
