//! 数据模型

pub mod auth;
pub mod user;

pub use auth::*;
pub use user::*;
