//! Registration, log-in and the bearer-token guard for the API routes.

mod log_in;
mod middleware;
mod register;
mod token;

pub use log_in::{AuthEndpointState, AuthResponse, Credentials, post_log_in};
pub use middleware::auth_guard;
pub use register::register_user;
pub use token::{AuthConfig, decode_token, encode_token};
