pub mod controller;
pub mod model;
pub mod router;
pub mod service;
pub mod transitions;

pub use router::init_appointments_router;
