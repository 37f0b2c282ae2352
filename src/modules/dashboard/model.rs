pub use abroadly_models::dashboard::*;
