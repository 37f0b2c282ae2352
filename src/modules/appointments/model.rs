pub use abroadly_models::appointments::*;
