//! # Quiz Agent
//!
//! 多阶段的测验生成器：调用生成式模型规划、出题、审核、核查，
//! 质量不达标时只重做未通过的题目
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 唯一的外部能力：按 JSON Schema 向模型要结构化回复
//! - `StructuredLlm` - 可替换的模型接口，`OpenAiClient` 为默认实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 每个阶段一个服务，描述"我能做什么"
//! - `Planner` / `Generator` / `Reviewer` / `Validator` / `Coordinator`
//! - `QuizWriter` - 写出 JSON
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 状态机与重试控制
//! - `WorkState` / `StateUpdate` - 贯穿各阶段的状态
//! - `QuizFlow` - plan → generate → review → validate → coordinate
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 加载请求、运行流程、写出结果
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{OpenAiClient, StructuredLlm, StructuredRequest};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Question, Quiz, QuizRequest};
pub use orchestrator::App;
pub use workflow::{QuizFlow, Stage, WorkState};
