pub mod controller;
pub mod menu_tree;
pub mod model;
pub mod router;
pub mod service;

pub use router::{init_admin_cms_router, init_cms_router};
