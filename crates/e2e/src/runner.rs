//! Test runner that fans scenarios out over browser sessions

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use taskboard_common::{CredentialKind, FixtureOracle};

use crate::compare::FieldMismatch;
use crate::config::{OutputConfig, Selectors};
use crate::driver::{PageDriver, SessionFactory};
use crate::error::{E2eError, E2eResult};
use crate::scenarios::{Scenario, ScenarioContext};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<FieldMismatch>,
    pub screenshot: Option<PathBuf>,
}

impl TestResult {
    fn new(scenario: Scenario) -> Self {
        Self {
            name: scenario.name().to_string(),
            tags: scenario.tags().iter().map(|t| t.to_string()).collect(),
            success: false,
            skipped: false,
            duration_ms: 0,
            error: None,
            mismatches: Vec::new(),
            screenshot: None,
        }
    }

    fn skipped(scenario: Scenario) -> Self {
        Self {
            skipped: true,
            ..Self::new(scenario)
        }
    }

    fn finished(scenario: Scenario, elapsed: Duration, outcome: E2eResult<()>) -> Self {
        let mut result = Self::new(scenario);
        result.duration_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(()) => result.success = true,
            Err(e) => {
                result.error = Some(e.to_string());
                if let E2eError::CardMismatch(mismatches) = e {
                    result.mismatches = mismatches;
                }
            }
        }
        result
    }
}

/// Result of running a selection of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(
        results: Vec<TestResult>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed - skipped,
            skipped,
            duration_ms: elapsed.as_millis() as u64,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Scenarios running at once, each in its own session
    pub workers: usize,
    pub scenario_timeout: Duration,
    /// Skip scenarios not yet started once one fails
    pub fail_fast: bool,
    /// Refuse to run when the fixture has consistency issues
    pub strict_fixture: bool,
    pub results_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub screenshot_on_failure: bool,
}

impl RunnerConfig {
    pub fn from_output(output: &OutputConfig) -> Self {
        Self {
            results_dir: output.results_dir.clone(),
            screenshot_dir: output.screenshot_dir.clone(),
            screenshot_on_failure: output.screenshot_on_failure,
            ..Self::default()
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let output = OutputConfig::default();
        Self {
            workers: 2,
            scenario_timeout: Duration::from_secs(180),
            fail_fast: false,
            strict_fixture: false,
            results_dir: output.results_dir,
            screenshot_dir: output.screenshot_dir,
            screenshot_on_failure: output.screenshot_on_failure,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    sessions: Arc<dyn SessionFactory>,
    oracle: Arc<FixtureOracle>,
    selectors: Arc<Selectors>,
    config: Arc<RunnerConfig>,
}

impl TestRunner {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        oracle: Arc<FixtureOracle>,
        selectors: Selectors,
    ) -> Self {
        Self::with_config(sessions, oracle, selectors, RunnerConfig::default())
    }

    pub fn with_config(
        sessions: Arc<dyn SessionFactory>,
        oracle: Arc<FixtureOracle>,
        selectors: Selectors,
        config: RunnerConfig,
    ) -> Self {
        Self {
            sessions,
            oracle,
            selectors: Arc::new(selectors),
            config: Arc::new(config),
        }
    }

    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        self.run_scenarios(&Scenario::ALL).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let scenarios = Scenario::tagged(tag);
        if scenarios.is_empty() {
            warn!("No scenarios tagged '{}'", tag);
        }
        self.run_scenarios(&scenarios).await
    }

    /// Run a specific scenario by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestResult> {
        let scenario =
            Scenario::by_name(name).ok_or_else(|| E2eError::UnknownScenario(name.to_string()))?;
        self.preflight(&[scenario])?;
        let result = run_scenario(
            scenario,
            self.sessions.clone(),
            self.oracle.clone(),
            self.selectors.clone(),
            self.config.clone(),
        )
        .await;
        log_result(&result);
        Ok(result)
    }

    /// Run `scenarios` with at most `workers` sessions open at once.
    ///
    /// Results come back in the order given, whatever order they finish in.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        self.preflight(scenarios)?;

        let workers = self.config.workers.max(1);
        info!("Running {} test(s) on {} worker(s)...", scenarios.len(), workers);

        let permits = Arc::new(Semaphore::new(workers));
        let abort = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.iter().copied().enumerate() {
            let permits = permits.clone();
            let abort = abort.clone();
            let sessions = self.sessions.clone();
            let oracle = self.oracle.clone();
            let selectors = self.selectors.clone();
            let config = self.config.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                if abort.load(Ordering::SeqCst) {
                    return (index, TestResult::skipped(scenario));
                }
                let fail_fast = config.fail_fast;
                let result = run_scenario(scenario, sessions, oracle, selectors, config).await;
                if fail_fast && !result.success {
                    abort.store(true, Ordering::SeqCst);
                }
                (index, result)
            });
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; scenarios.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    log_result(&result);
                    slots[index] = Some(result);
                }
                Err(e) => error!("Scenario task failed to complete: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(scenarios)
            .map(|(slot, scenario)| {
                slot.unwrap_or_else(|| {
                    TestResult::finished(
                        *scenario,
                        Duration::ZERO,
                        Err(E2eError::AssertionFailed("scenario task aborted".to_string())),
                    )
                })
            })
            .collect();

        let suite = TestSuiteResult::from_results(results, started_at, start.elapsed());
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        Ok(suite)
    }

    /// Write results to `test-results.json` in the results directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.results_dir)?;

        let path = self.config.results_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Checks that must pass before any browser is opened
    fn preflight(&self, scenarios: &[Scenario]) -> E2eResult<()> {
        let issues = self.oracle.fixture().validate();
        for issue in &issues {
            warn!("Fixture issue: {}", issue);
        }
        if self.config.strict_fixture && !issues.is_empty() {
            return Err(taskboard_common::Error::InvalidFixture(format!(
                "{} consistency issue(s) found",
                issues.len()
            ))
            .into());
        }

        if scenarios.iter().any(Scenario::needs_credentials) {
            self.oracle.credentials(CredentialKind::Valid)?;
        }
        Ok(())
    }
}

async fn run_scenario(
    scenario: Scenario,
    sessions: Arc<dyn SessionFactory>,
    oracle: Arc<FixtureOracle>,
    selectors: Arc<Selectors>,
    config: Arc<RunnerConfig>,
) -> TestResult {
    let start = Instant::now();
    debug!("Running test: {}", scenario);

    let driver = match sessions.open().await {
        Ok(driver) => driver,
        Err(e) => return TestResult::finished(scenario, start.elapsed(), Err(e)),
    };

    let ctx = ScenarioContext {
        driver: driver.as_ref(),
        oracle: &oracle,
        selectors: &selectors,
    };
    let outcome = match tokio::time::timeout(config.scenario_timeout, scenario.run(&ctx)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(E2eError::Timeout(format!(
            "scenario '{}' after {:?}",
            scenario, config.scenario_timeout
        ))),
    };

    let screenshot = if outcome.is_err() && config.screenshot_on_failure {
        capture_failure(driver.as_ref(), &config.screenshot_dir, scenario).await
    } else {
        None
    };

    if let Err(e) = driver.close().await {
        debug!("Closing session for {} failed: {}", scenario, e);
    }

    let mut result = TestResult::finished(scenario, start.elapsed(), outcome);
    result.screenshot = screenshot;
    result
}

async fn capture_failure(driver: &dyn PageDriver, dir: &Path, scenario: Scenario) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("Cannot create screenshot dir {}: {}", dir.display(), e);
        return None;
    }
    let path = dir.join(format!("{}.png", scenario.name()));
    match driver.screenshot(&path).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Screenshot for {} failed: {}", scenario, e);
            None
        }
    }
}

fn log_result(result: &TestResult) {
    if result.success {
        info!("✓ {} ({} ms)", result.name, result.duration_ms);
    } else if result.skipped {
        info!("- {} (skipped)", result.name);
    } else {
        error!(
            "✗ {} - {}",
            result.name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}
