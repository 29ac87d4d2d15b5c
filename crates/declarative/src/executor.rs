//! Execution engine - applies resources with bounded parallelism

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::Result;
use rayon::prelude::*;

/// Execute a plan with the given options and callbacks
///
/// # Type Parameters
/// * `P` - Progress callback type
/// * `C` - Confirm callback type
///
/// # Arguments
/// * `plan` - The execution plan to run
/// * `opts` - Execution options (dry_run, jobs, verbose)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results. A failing resource is counted as failed
/// and does not stop the others.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let parallel_diffs = compute_diffs(&plan.parallel);
    let sequential_diffs = compute_diffs(&plan.sequential);
    let total_changes = parallel_diffs.len() + sequential_diffs.len();

    if total_changes == 0 {
        log::debug!("Nothing to apply");
        return Ok(ExecuteSummary::default());
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    let mut summary = ExecuteSummary::default();

    if !plan.parallel.is_empty() {
        progress.on_batch_start(plan.parallel.len(), true);
        let results = execute_batch(&plan.parallel, opts.jobs, opts.verbose, progress)?;
        for result in &results {
            summary.add_result(result);
        }
        progress.on_batch_complete();
    }

    if !plan.sequential.is_empty() {
        progress.on_batch_start(plan.sequential.len(), false);
        let results = execute_batch(&plan.sequential, 1, opts.verbose, progress)?;
        for result in &results {
            summary.add_result(result);
        }
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Execute a batch of resources
fn execute_batch<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    jobs: usize,
    verbose: bool,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    if jobs <= 1 || resources.len() == 1 {
        // Sequential execution
        let mut results = Vec::with_capacity(resources.len());
        for resource in resources {
            progress.on_resource_start(&resource.id(), &resource.description());
            let result = apply_resource(resource.as_ref(), verbose);
            progress.on_resource_complete(&resource.id(), &result);
            results.push(result);
        }
        Ok(results)
    } else {
        execute_parallel(resources, jobs, verbose, progress)
    }
}

/// Execute resources in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    jobs: usize,
    verbose: bool,
    progress: &mut P,
) -> Result<Vec<ApplyResult>> {
    // The progress callback is not shared across threads; results are
    // reported in plan order once the pool is done.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let results: Vec<(String, ApplyResult)> = pool.install(|| {
        resources
            .par_iter()
            .map(|resource| (resource.id(), apply_resource(resource.as_ref(), verbose)))
            .collect()
    });

    for (id, result) in &results {
        progress.on_resource_complete(id, result);
    }

    Ok(results.into_iter().map(|(_, r)| r).collect())
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, verbose: bool) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, verbose);

    match resource.apply(&mut ctx) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Failed to apply {}: {e:#}", resource.id());
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::types::ResourceState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct TestResource {
        id: String,
        should_change: bool,
        fail: bool,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl TestResource {
        fn new(id: &str, should_change: bool) -> Self {
            Self {
                id: id.into(),
                should_change,
                fail: false,
                active: Arc::default(),
                peak: Arc::default(),
            }
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self) -> Result<ResourceState> {
            if self.should_change {
                Ok(ResourceState::Absent)
            } else {
                Ok(ResourceState::Present { details: None })
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                anyhow::bail!("remote rejected {}", self.id);
            }
            if self.should_change {
                Ok(ApplyResult::Created)
            } else {
                Ok(ApplyResult::NoChange)
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        completed: Vec<(String, ApplyResult)>,
        batches: Vec<(usize, bool)>,
    }

    impl ProgressCallback for Recorder {
        fn on_batch_start(&mut self, count: usize, parallel: bool) {
            self.batches.push((count, parallel));
        }
        fn on_resource_start(&mut self, _id: &str, _description: &str) {}
        fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
            self.completed.push((id.to_string(), result.clone()));
        }
        fn on_batch_complete(&mut self) {}
    }

    #[test]
    fn test_execute_empty_plan() {
        let plan = ExecutionPlan::new();
        let opts = ExecuteOptions::default();
        let result = execute(plan, opts, &mut NoProgress, &mut AutoConfirm).unwrap();

        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource::new("test1", false)));

        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        // No diff means no execution
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_with_changes() {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource::new("test1", true)));

        let result = execute_simple(plan, ExecuteOptions::default()).unwrap();

        assert_eq!(result.created, 1);
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource::new("a", true)));
        plan.add_resource(Box::new(TestResource::new("b", true)));

        let result = execute(
            plan,
            ExecuteOptions::default(),
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(result.skipped, 2);
        assert_eq!(result.total_changes(), 0);
    }

    #[test]
    fn test_dry_run_applies_nothing() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource {
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
            ..TestResource::new("a", true)
        }));

        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute_simple(plan, opts).unwrap();

        assert_eq!(result.total(), 0);
        assert_eq!(peak.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parallel_batch_respects_jobs_and_order() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut plan = ExecutionPlan::new();
        for i in 0..8 {
            plan.add_resource(Box::new(TestResource {
                active: Arc::clone(&active),
                peak: Arc::clone(&peak),
                ..TestResource::new(&format!("r{i}"), true)
            }));
        }

        let opts = ExecuteOptions {
            jobs: 3,
            ..Default::default()
        };
        let mut recorder = Recorder::default();
        let result = execute(plan, opts, &mut recorder, &mut AutoConfirm).unwrap();

        assert_eq!(result.created, 8);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        let ids: Vec<_> = recorder.completed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"]);
        assert_eq!(recorder.batches, [(8, true)]);
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let mut plan = ExecutionPlan::new();
        plan.add_resource(Box::new(TestResource {
            fail: true,
            ..TestResource::new("bad", true)
        }));
        plan.add_resource(Box::new(TestResource::new("good", true)));

        let mut recorder = Recorder::default();
        let result = execute(
            plan,
            ExecuteOptions::default(),
            &mut recorder,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(result.failed, 1);
        assert_eq!(result.created, 1);
        assert!(matches!(
            &recorder.completed[0].1,
            ApplyResult::Failed { error } if error.contains("remote rejected bad")
        ));
    }

    #[test]
    fn test_default_destroy_is_skipped() {
        let resource = TestResource::new("a", false);
        let mut ctx = ApplyContext::new(false, false);
        let result = resource.destroy(&mut ctx).unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
    }
}
