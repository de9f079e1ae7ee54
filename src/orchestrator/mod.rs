//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是整个系统的"指挥中心"：持有配置和模型客户端，
//! 负责加载输入、启动流程、写出结果和输出统计。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (加载请求 / 写出测验)
//!     ↓
//! workflow::QuizFlow (状态机：plan → generate → review → validate → coordinate)
//!     ↓
//! services (能力层：planner / generator / reviewer / validator / coordinator)
//!     ↓
//! clients (StructuredLlm：唯一的外部能力)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层创建模型客户端
//! 2. **向下依赖**：编排层 → workflow → services → clients
//! 3. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod app;

pub use app::App;
