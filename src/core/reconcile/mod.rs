mod engine;
mod report;

pub use engine::{diff_project, ApplyOptions, ReconciliationEngine};
pub use report::{ApplyReport, AssetFailure, CategoryDiff, DiffReport, FreezeReport};
