//! Authentication utilities

mod jwt;
mod password;
mod refresh;

pub use jwt::{AccessToken, Claims, JwtService, TokenType};
pub use password::{generate_password, hash_password, verify_password};
pub use refresh::{digest_refresh_token, RefreshToken};
