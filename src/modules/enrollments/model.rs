pub use abroadly_models::enrollments::*;
