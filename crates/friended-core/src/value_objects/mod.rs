//! Value objects - small immutable types shared by entities and services

mod client_version;
mod gender;
mod snowflake;

pub use client_version::ClientVersion;
pub use gender::Gender;
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
