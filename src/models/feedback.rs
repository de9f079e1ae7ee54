use serde::{Deserialize, Serialize};

/// 一条未通过审核的反馈
///
/// 按题目 id 匹配，重试时据此决定保留哪些题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// 为 None 时是不针对具体题目的反馈（例如"没有题目可审核"）
    pub question_id: Option<String>,
    pub topic: Option<String>,
    /// 总体评价
    pub issue: String,
    #[serde(default)]
    pub issues: Vec<String>,
    pub score: Option<f64>,
}

impl FeedbackItem {
    pub fn general(issue: impl Into<String>) -> Self {
        Self {
            question_id: None,
            topic: None,
            issue: issue.into(),
            issues: Vec::new(),
            score: None,
        }
    }
}

/// 核查阶段发现的问题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub question_id: String,
    /// 题目在核查输入中的位置（仅用于日志）
    pub question_index: usize,
    pub topic: String,
    pub question_text: String,
    pub issues: Vec<String>,
    pub suggested_fix: Option<String>,
    pub confidence: f64,
}

impl From<&ValidationIssue> for FeedbackItem {
    fn from(issue: &ValidationIssue) -> Self {
        let mut summary = format!("Validation failed: {}", issue.question_text);
        if let Some(fix) = &issue.suggested_fix {
            summary.push_str(&format!(" (suggested fix: {})", fix));
        }
        Self {
            question_id: Some(issue.question_id.clone()),
            topic: Some(issue.topic.clone()),
            issue: summary,
            issues: issue.issues.clone(),
            score: None,
        }
    }
}
