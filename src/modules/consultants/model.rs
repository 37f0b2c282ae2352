pub use abroadly_models::consultants::*;
