pub mod account_service;
pub mod auth;
pub mod cart_service;
pub mod catalog_service;
pub mod connection_service;
pub mod gst;
pub mod order_service;
pub mod pricing;
pub mod visibility;
