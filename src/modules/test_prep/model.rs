pub use abroadly_models::test_prep::*;
