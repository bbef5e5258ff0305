pub mod auth;
pub mod authz;
pub mod health;
pub mod permissions;
pub mod users;
