mod attempt;
mod blueprint;
mod ids;
mod question;
mod section;

pub use ids::{AttemptId, BlueprintId, ParseIdError, UserId};

pub use attempt::{
    AnswerRecord, Attempt, AttemptError, AttemptOutcome, NewAttempt, SectionResult, SubmittedAnswer,
};
pub use blueprint::{BandScore, Blueprint, BlueprintDraft, BlueprintError};
pub use question::{
    Gradable, GrammarQuestion, ListeningQuestion, PronunciationQuestion, Question,
    ReadingQuestion, VocabularyQuestion, answers_match,
};
pub use section::{Section, SectionType, SectionTypeError};
