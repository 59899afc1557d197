pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod problem;
pub mod request_id;
pub mod routes;

pub use middleware::Admission;
pub use problem::Problem;
pub use routes::{ApiState, router, with_tenant_routes};
