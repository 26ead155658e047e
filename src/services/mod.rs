pub mod analytics_service;
pub mod cart_service;
pub mod catalog_service;
pub mod order_service;
pub mod product_service;
pub mod user_service;
