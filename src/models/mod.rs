//! 数据模型

mod api;

pub use api::{HealthResponse, IdeaRequest, ImprovedIdea};
