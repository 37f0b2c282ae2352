pub mod appointments;
pub mod auth;
pub mod cms;
pub mod consultants;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod payments;
pub mod test_prep;
pub mod users;

pub use self::auth::model::LoginRequest;
pub use self::users::model::User;
