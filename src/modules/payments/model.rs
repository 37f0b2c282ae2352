pub use abroadly_models::payments::*;
