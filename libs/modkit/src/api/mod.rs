//! Problem details and JSON response helpers shared by REST modules.

pub mod problem;
pub mod response;

pub use problem::{Problem, ProblemResponse, APPLICATION_PROBLEM_JSON};
pub use response::MessageBody;
