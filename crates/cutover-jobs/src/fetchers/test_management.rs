//! Test plan, suite, case, and result fetchers.

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use cutover_core::{defaults, ArtifactKind, ArtifactSummary};

use crate::fetcher::{ArtifactFetcher, FetchContext, FetchResult};

/// Extracts test plans.
pub struct TestPlansFetcher;

#[async_trait]
impl ArtifactFetcher for TestPlansFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::TestPlans
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let plans = ctx.source().test_plans(ctx.project_name()).await?;
        let items = plans
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "state": p.state,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(plans.len() as i64, items))
    }
}

/// Extracts test suites across all plans.
///
/// The plan listing failing fails the fetch; a single plan's suites failing
/// is logged and skipped so one bad plan does not poison the rest.
pub struct TestSuitesFetcher;

#[async_trait]
impl ArtifactFetcher for TestSuitesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::TestSuites
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let plans = ctx.source().test_plans(ctx.project_name()).await?;

        let mut suites = Vec::new();
        for plan in &plans {
            match ctx.source().test_suites(ctx.project_name(), plan.id).await {
                Ok(plan_suites) => suites.extend(plan_suites),
                Err(e) => {
                    warn!(error = %e, "Failed to list suites of test plan {}", plan.id);
                }
            }
        }

        let items = suites
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "planId": s.plan_id,
                    "name": s.name,
                    "suiteType": s.suite_type,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(suites.len() as i64, items))
    }
}

/// Extracts test cases across all plans and suites.
pub struct TestCasesFetcher;

#[async_trait]
impl ArtifactFetcher for TestCasesFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::TestCases
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let plans = ctx.source().test_plans(ctx.project_name()).await?;

        let mut cases = Vec::new();
        for plan in &plans {
            let suites = match ctx.source().test_suites(ctx.project_name(), plan.id).await {
                Ok(suites) => suites,
                Err(e) => {
                    warn!(error = %e, "Failed to list suites of test plan {}", plan.id);
                    continue;
                }
            };
            for suite in &suites {
                match ctx
                    .source()
                    .test_cases(ctx.project_name(), plan.id, suite.id)
                    .await
                {
                    Ok(suite_cases) => cases.extend(suite_cases),
                    Err(e) => {
                        warn!(error = %e, "Failed to list cases of suite {}", suite.id);
                    }
                }
            }
        }

        let items = cases
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "title": c.title,
                    "state": c.state,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(cases.len() as i64, items))
    }
}

/// Extracts recent test results.
pub struct TestResultsFetcher;

#[async_trait]
impl ArtifactFetcher for TestResultsFetcher {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::TestResults
    }

    async fn fetch(&self, ctx: &FetchContext) -> FetchResult {
        ctx.report_progress(defaults::PROGRESS_STARTED, 0, 0);
        let results = ctx.source().test_results(ctx.project_name()).await?;
        let items = results
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "title": r.test_case_title,
                    "outcome": r.outcome,
                    "run": r.run_name,
                })
            })
            .collect();
        Ok(ArtifactSummary::ok(results.len() as i64, items))
    }
}
