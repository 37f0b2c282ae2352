pub mod controller;
pub mod gateway;
pub mod model;
pub mod router;
pub mod service;
pub mod signature;

pub use router::init_payments_router;
