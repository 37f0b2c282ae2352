use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::appointments::model::{
    Appointment, AppointmentMode, AppointmentStatus, AppointmentWithParties, BookAppointmentDto,
    PaginatedAppointmentsResponse, UpdateAppointmentStatusDto,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{
    AuthResponse, LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
};
use crate::modules::cms::model::{
    ContentBlock, CreateMenuDto, CreatePageDto, Menu, MenuItem, MenuItemInput, MenuNode, MenuTree,
    Page, PaginatedPagesResponse, ReplaceMenuItemsDto, UpdateMenuDto, UpdatePageDto,
    UpsertContentBlockDto,
};
use crate::modules::consultants::model::{
    AvailabilityRule, AvailabilityRuleInput, Consultant, ConsultantProfile, CreateConsultantDto,
    PaginatedConsultantsResponse, SetAvailabilityDto, Slot, SlotsResponse, UpdateConsultantDto,
};
use crate::modules::courses::model::{
    Course, CourseLevel, CourseWithStats, CreateCourseDto, PaginatedCoursesResponse,
    PaginatedCoursesWithStatsResponse, UpdateCourseDto,
};
use crate::modules::dashboard::model::{
    DashboardGrowth, DashboardStats, DashboardTotals, Growth, RecentEnrollment, StudentDashboard,
    TrendPoint, TrendsResponse, UpcomingAppointment,
};
use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentStatus, EnrollmentWithCourse,
    PaginatedEnrollmentsResponse, UpdateProgressDto,
};
use crate::modules::payments::model::{
    CheckoutRequest, CheckoutResponse, PaginatedPaymentsResponse, Payment, PaymentProvider,
    PaymentPurpose, PaymentStatus, RazorpayVerifyRequest, WebhookAck,
};
use crate::modules::test_prep::model::{
    Attempt, AttemptDetail, AttemptStatus, AttemptWithTest, CreateQuestionDto, CreateSectionDto,
    CreateTestDto, PaginatedTestsResponse, PublicTest, Question, QuestionReview, QuestionType,
    SaveAnswersDto, ScoreSummary, Section, SectionResult, SubmitAttemptDto, Test, TestDetail,
    TestSummary, TestType, UpdateQuestionDto, UpdateSectionDto, UpdateTestDto,
};
use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateProfileDto, UpdateUserDto,
    User, UserRole,
};
use abroadly_core::pagination::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::list_users,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::users::controller::update_profile,
        crate::modules::users::controller::change_password,
        crate::modules::courses::controller::list_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::admin_list_courses,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::admin_get_course,
        crate::modules::courses::controller::update_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::enrollments::controller::enroll,
        crate::modules::enrollments::controller::my_enrollments,
        crate::modules::enrollments::controller::update_progress,
        crate::modules::enrollments::controller::cancel_enrollment,
        crate::modules::enrollments::controller::list_enrollments,
        crate::modules::test_prep::controller::list_tests,
        crate::modules::test_prep::controller::get_test,
        crate::modules::test_prep::controller::start_attempt,
        crate::modules::test_prep::controller::my_attempts,
        crate::modules::test_prep::controller::get_attempt,
        crate::modules::test_prep::controller::save_answers,
        crate::modules::test_prep::controller::submit_attempt,
        crate::modules::test_prep::controller::admin_list_tests,
        crate::modules::test_prep::controller::create_test,
        crate::modules::test_prep::controller::admin_get_test,
        crate::modules::test_prep::controller::update_test,
        crate::modules::test_prep::controller::delete_test,
        crate::modules::test_prep::controller::create_section,
        crate::modules::test_prep::controller::update_section,
        crate::modules::test_prep::controller::delete_section,
        crate::modules::test_prep::controller::create_question,
        crate::modules::test_prep::controller::update_question,
        crate::modules::test_prep::controller::delete_question,
        crate::modules::consultants::controller::list_consultants,
        crate::modules::consultants::controller::get_consultant,
        crate::modules::consultants::controller::get_availability,
        crate::modules::consultants::controller::set_availability,
        crate::modules::consultants::controller::get_slots,
        crate::modules::consultants::controller::create_consultant,
        crate::modules::consultants::controller::update_consultant,
        crate::modules::appointments::controller::book_appointment,
        crate::modules::appointments::controller::my_appointments,
        crate::modules::appointments::controller::list_appointments,
        crate::modules::appointments::controller::get_appointment,
        crate::modules::appointments::controller::update_status,
        crate::modules::payments::controller::checkout,
        crate::modules::payments::controller::verify_razorpay,
        crate::modules::payments::controller::stripe_webhook,
        crate::modules::payments::controller::razorpay_webhook,
        crate::modules::payments::controller::my_payments,
        crate::modules::payments::controller::list_payments,
        crate::modules::cms::controller::get_page_by_slug,
        crate::modules::cms::controller::get_menu_by_location,
        crate::modules::cms::controller::get_block,
        crate::modules::cms::controller::list_pages,
        crate::modules::cms::controller::create_page,
        crate::modules::cms::controller::get_page,
        crate::modules::cms::controller::update_page,
        crate::modules::cms::controller::delete_page,
        crate::modules::cms::controller::list_menus,
        crate::modules::cms::controller::create_menu,
        crate::modules::cms::controller::get_menu,
        crate::modules::cms::controller::update_menu,
        crate::modules::cms::controller::delete_menu,
        crate::modules::cms::controller::replace_menu_items,
        crate::modules::cms::controller::list_blocks,
        crate::modules::cms::controller::upsert_block,
        crate::modules::cms::controller::delete_block,
        crate::modules::dashboard::controller::get_stats,
        crate::modules::dashboard::controller::get_trends,
        crate::modules::dashboard::controller::my_dashboard,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            MessageResponse,
            User,
            UserRole,
            CreateUserDto,
            UpdateUserDto,
            UpdateProfileDto,
            ChangePasswordDto,
            PaginatedUsersResponse,
            Course,
            CourseLevel,
            CourseWithStats,
            CreateCourseDto,
            UpdateCourseDto,
            PaginatedCoursesResponse,
            PaginatedCoursesWithStatsResponse,
            Enrollment,
            EnrollmentStatus,
            EnrollmentWithCourse,
            CreateEnrollmentDto,
            UpdateProgressDto,
            PaginatedEnrollmentsResponse,
            Test,
            TestType,
            TestSummary,
            TestDetail,
            PublicTest,
            Section,
            Question,
            QuestionType,
            CreateTestDto,
            UpdateTestDto,
            CreateSectionDto,
            UpdateSectionDto,
            CreateQuestionDto,
            UpdateQuestionDto,
            PaginatedTestsResponse,
            Attempt,
            AttemptStatus,
            AttemptWithTest,
            AttemptDetail,
            QuestionReview,
            ScoreSummary,
            SectionResult,
            SaveAnswersDto,
            SubmitAttemptDto,
            Consultant,
            ConsultantProfile,
            CreateConsultantDto,
            UpdateConsultantDto,
            PaginatedConsultantsResponse,
            AvailabilityRule,
            AvailabilityRuleInput,
            SetAvailabilityDto,
            Slot,
            SlotsResponse,
            Appointment,
            AppointmentMode,
            AppointmentStatus,
            AppointmentWithParties,
            BookAppointmentDto,
            UpdateAppointmentStatusDto,
            PaginatedAppointmentsResponse,
            Payment,
            PaymentPurpose,
            PaymentProvider,
            PaymentStatus,
            CheckoutRequest,
            CheckoutResponse,
            RazorpayVerifyRequest,
            WebhookAck,
            PaginatedPaymentsResponse,
            Page,
            CreatePageDto,
            UpdatePageDto,
            PaginatedPagesResponse,
            Menu,
            MenuItem,
            MenuNode,
            MenuTree,
            CreateMenuDto,
            UpdateMenuDto,
            MenuItemInput,
            ReplaceMenuItemsDto,
            ContentBlock,
            UpsertContentBlockDto,
            DashboardStats,
            DashboardTotals,
            DashboardGrowth,
            Growth,
            RecentEnrollment,
            UpcomingAppointment,
            TrendPoint,
            TrendsResponse,
            StudentDashboard,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and token refresh"),
        (name = "Users", description = "Profile and user management"),
        (name = "Courses", description = "Course catalog"),
        (name = "Enrollments", description = "Course enrollments and progress"),
        (name = "Test Prep", description = "Practice tests and attempts"),
        (name = "Test Prep Admin", description = "Test, section and question authoring"),
        (name = "Consultants", description = "Consultant profiles and availability"),
        (name = "Appointments", description = "Consultation booking"),
        (name = "Payments", description = "Checkout, verification and provider webhooks"),
        (name = "CMS", description = "Published pages, menus and content blocks"),
        (name = "CMS Admin", description = "Content management"),
        (name = "Dashboard", description = "Admin analytics and student overview")
    ),
    info(
        title = "Abroadly API",
        version = "0.1.0",
        description = "Study-abroad consultancy API: course catalog, test preparation, consultant booking and payments.",
        contact(
            name = "API Support",
            email = "support@abroadly.io"
        ),
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_tag() {
        let doc = ApiDoc::openapi();
        let tags: Vec<String> = doc
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(tags.contains(&"Payments".to_string()));
        assert!(tags.contains(&"Dashboard".to_string()));
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn test_openapi_documents_webhooks() {
        let doc = ApiDoc::openapi();
        assert!(
            doc.paths
                .paths
                .contains_key("/api/payments/webhooks/stripe")
        );
    }
}
