pub mod admin;
pub mod registration;
