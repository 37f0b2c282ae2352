pub use abroadly_models::courses::*;
