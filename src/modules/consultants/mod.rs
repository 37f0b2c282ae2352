pub mod controller;
pub mod model;
pub mod router;
pub mod service;
pub mod slots;

pub use router::{init_admin_consultants_router, init_consultants_router};
