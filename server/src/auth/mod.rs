//! Request authentication.

mod middleware;

pub use middleware::{ApiClient, API_KEY_HEADER, APP_ID_HEADER};
