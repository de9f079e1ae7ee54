//! 流程层
//!
//! - `quiz_state`：贯穿各阶段的工作状态和部分更新
//! - `quiz_flow`：阶段状态机与重试控制

pub mod quiz_flow;
pub mod quiz_state;

pub use quiz_flow::{route_after_review, route_after_validation, QuizFlow, Stage};
pub use quiz_state::{StateUpdate, WorkState};
