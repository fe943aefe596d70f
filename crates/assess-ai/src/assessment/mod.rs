//! Assessment domain model and the storage seam the scoring run operates on.

pub mod domain;
pub mod repository;

pub use domain::{
    Answer, Assessment, AssessmentId, AssessmentSnapshot, AssessmentStatus, FieldType, Item,
    ItemCode, Theme, ThemeId, ThemeScore,
};
pub use repository::{AssessmentRepository, AssessmentScores, RepositoryError, ScoredAnswer};
