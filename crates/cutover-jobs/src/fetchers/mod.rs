//! Extraction strategies, one per artifact kind.

pub mod boards;
pub mod classification;
pub mod pipelines;
pub mod process;
pub mod repositories;
pub mod test_management;
pub mod wiki;
pub mod work_items;

pub use boards::BoardColumnsFetcher;
pub use classification::{AreaPathsFetcher, IterationPathsFetcher};
pub use pipelines::{BuildPipelinesFetcher, PipelineRunsFetcher, ReleasePipelinesFetcher};
pub use process::{CustomFieldsFetcher, WorkItemTypesFetcher};
pub use repositories::{RepositoriesFetcher, RepositoryInspector};
pub use test_management::{
    TestCasesFetcher, TestPlansFetcher, TestResultsFetcher, TestSuitesFetcher,
};
pub use wiki::WikiPagesFetcher;
pub use work_items::WorkItemsFetcher;
