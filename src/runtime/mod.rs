//! API surface consumed by the external HTTP layer.

pub mod api;

pub use api::{
    apply_for_course, health, list_courses, user_admissions, ApplyRequest, CourseQuery,
    ErrorResponse, Health,
};
