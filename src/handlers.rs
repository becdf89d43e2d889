pub mod auth;
pub mod cart;
pub mod catalog;
pub mod connections;
pub mod gst;
pub mod orders;
pub mod team;
