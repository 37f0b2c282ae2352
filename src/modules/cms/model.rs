pub use abroadly_models::cms::*;
