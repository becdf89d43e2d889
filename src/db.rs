pub mod user_repo;
pub use user_repo::UserRepository;
pub mod connection_repo;
pub use connection_repo::ConnectionRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod cart_repo;
pub use cart_repo::CartRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
