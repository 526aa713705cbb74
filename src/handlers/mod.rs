pub mod list;
pub mod put;
pub mod get;
pub mod health;

pub use list::list_handler;
pub use put::put_handler;
pub use get::get_handler;
pub use health::health_handler;
