pub mod analysis;
pub mod workout;

pub use analysis::{
  AnalysisResult, AnalysisStatus, Category, CategoryAnalysis, GlucosePoint, GlucoseUnit,
};
pub use workout::{SessionKind, WorkoutEvent, SPORT_RUN};
