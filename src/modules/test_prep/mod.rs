pub mod attempts;
pub mod controller;
pub mod model;
pub mod router;
pub mod scoring;
pub mod service;

pub use router::{init_admin_tests_router, init_attempts_router, init_tests_router};
