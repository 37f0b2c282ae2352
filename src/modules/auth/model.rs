pub use abroadly_models::auth::*;
