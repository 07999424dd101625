//! API endpoint implementations.

mod account;
mod auth;
mod devices;

pub use account::AccountApi;
pub use auth::AuthApi;
pub use devices::DevicesApi;
