pub mod auth;
pub mod security_headers;

pub use auth::AdminGuard;
pub use security_headers::SecurityHeaders;
