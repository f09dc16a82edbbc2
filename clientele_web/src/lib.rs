pub mod api;
pub mod error;

pub use api::create_router;
