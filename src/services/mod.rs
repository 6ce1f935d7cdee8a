//! 服务层模块

mod prompt_service;
mod relay_service;

pub use prompt_service::PromptTemplate;
pub use relay_service::IdeaRelay;

#[cfg(test)]
pub use relay_service::error_marker;
