pub mod feedback;
pub mod loaders;
pub mod plan;
pub mod question;
pub mod quiz;
pub mod request;
pub mod responses;

pub use feedback::{FeedbackItem, ValidationIssue};
pub use loaders::load_quiz_request;
pub use plan::{QuizPlan, RoundSpec};
pub use question::{ChoiceLabel, Choices, Difficulty, Question};
pub use quiz::{Quiz, QuizMetadata, QuizRound};
pub use request::QuizRequest;
pub use responses::StructuredOutput;
