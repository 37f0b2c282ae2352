pub use abroadly_models::users::*;
