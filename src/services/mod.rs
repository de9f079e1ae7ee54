//! 业务能力层
//!
//! 每个服务对应流程中的一个阶段，只提供能力，不关心流程顺序：
//!
//! - `planner`：需求 → 测验规划（失败时兜底）
//! - `generator`：规划 → 题目（首次全量，重试时按 id 选择性补题）
//! - `reviewer`：题目打分 + 低分反馈
//! - `validator`：事实核查
//! - `coordinator`：按轮次组卷
//! - `quiz_writer`：写出 JSON

pub mod coordinator;
pub mod generator;
pub mod planner;
pub mod quiz_writer;
pub mod reviewer;
pub mod validator;

pub use coordinator::Coordinator;
pub use generator::{GenerationOutcome, Generator};
pub use planner::Planner;
pub use quiz_writer::QuizWriter;
pub use reviewer::{ReviewOutcome, Reviewer};
pub use validator::{ValidationOutcome, Validator};
