pub mod permission;
pub mod user;
