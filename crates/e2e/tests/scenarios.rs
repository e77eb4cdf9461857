//! Scenarios and the runner against the in-memory dashboard

mod common;

use std::sync::Arc;

use taskboard_common::{CredentialPolicy, Error, FixtureOracle};
use taskboard_e2e::compare::CardField;
use taskboard_e2e::runner::RunnerConfig;
use taskboard_e2e::static_page::StaticPage;
use taskboard_e2e::{E2eError, Scenario, ScenarioContext, Selectors, TestRunner, TestSuiteResult};

use common::{MockDashboard, MockSessions};

async fn run(scenario: Scenario, dashboard: MockDashboard) -> Result<(), E2eError> {
    let oracle = common::oracle();
    let selectors = Selectors::default();
    let page = StaticPage::new(dashboard);
    let ctx = ScenarioContext {
        driver: &page,
        oracle: &oracle,
        selectors: &selectors,
    };
    scenario.run(&ctx).await
}

#[tokio::test]
async fn test_every_scenario_passes_on_a_faithful_dashboard() {
    let oracle = common::oracle();
    for scenario in Scenario::ALL {
        let result = run(scenario, MockDashboard::new(&oracle)).await;
        assert!(result.is_ok(), "{}: {:?}", scenario, result);
    }
}

#[tokio::test]
async fn test_logout_returns_to_login() {
    let oracle = common::oracle();
    let selectors = Selectors::default();
    let page = StaticPage::new(MockDashboard::new(&oracle));
    let ctx = ScenarioContext {
        driver: &page,
        oracle: &oracle,
        selectors: &selectors,
    };

    Scenario::Logout.run(&ctx).await.unwrap();
    assert!(!page.inspect(|m| m.is_logged_in()));
}

#[tokio::test]
async fn test_wrong_status_column_is_a_card_mismatch() {
    let oracle = common::oracle();
    let mut dashboard = MockDashboard::new(&oracle);
    dashboard.task_mut("Fix navigation bug").status = "Done".to_string();

    let err = run(Scenario::TaskCardDetails, dashboard.clone())
        .await
        .unwrap_err();
    let mismatches = match err {
        E2eError::CardMismatch(mismatches) => mismatches,
        other => panic!("expected a card mismatch, got {:?}", other),
    };
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].title, "Fix navigation bug");
    assert_eq!(mismatches[0].field, CardField::Status);
    assert_eq!(mismatches[0].expected, "To Do");
    assert_eq!(mismatches[0].actual, "Done");

    let err = run(Scenario::StatusDistribution, dashboard).await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)));
}

#[tokio::test]
async fn test_missing_assignee_is_detected() {
    let oracle = common::oracle();
    let mut dashboard = MockDashboard::new(&oracle);
    dashboard.task_mut("Launch email sequence").assignee = None;

    let err = run(Scenario::TaskCardDetails, dashboard.clone())
        .await
        .unwrap_err();
    let mismatches = match err {
        E2eError::CardMismatch(mismatches) => mismatches,
        other => panic!("expected a card mismatch, got {:?}", other),
    };
    assert_eq!(mismatches[0].field, CardField::Assignee);

    assert!(run(Scenario::AssigneesByProject, dashboard).await.is_err());
}

#[tokio::test]
async fn test_card_outside_columns_fails_distribution() {
    let oracle = common::oracle();
    let mut dashboard = MockDashboard::new(&oracle);
    dashboard.show_badges = false;
    assert!(run(Scenario::StatusDistribution, dashboard.clone()).await.is_ok());

    // A card outside every column is missing from its status count.
    dashboard.task_mut("Biometric login").status = "Blocked".to_string();
    let err = run(Scenario::StatusDistribution, dashboard.clone())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Review"), "{}", err);
    assert!(run(Scenario::DataIntegrity, dashboard).await.is_err());
}

#[tokio::test]
async fn test_rejected_login_fails_every_signed_in_scenario() {
    let mut fixture = common::fixture();
    if let Some(credentials) = fixture.credentials.as_mut() {
        credentials.valid = None;
    }
    let oracle = common::oracle();
    let dashboard = MockDashboard::new(&oracle);
    let without_valid = common::oracle_for(fixture);
    let selectors = Selectors::default();
    let page = StaticPage::new(dashboard);
    let ctx = ScenarioContext {
        driver: &page,
        oracle: &without_valid,
        selectors: &selectors,
    };

    let result = Scenario::LoginValid.run(&ctx).await;
    assert!(result.is_err());
    assert!(Scenario::LoginInvalid.run(&ctx).await.is_ok());
}

fn runner(dashboard: MockDashboard, config: RunnerConfig) -> (TestRunner, Arc<MockSessions>) {
    let sessions = Arc::new(MockSessions::new(dashboard));
    let runner = TestRunner::with_config(
        sessions.clone(),
        Arc::new(common::oracle()),
        Selectors::default(),
        config,
    );
    (runner, sessions)
}

#[tokio::test]
async fn test_runner_reports_in_scenario_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        workers: 4,
        results_dir: dir.path().join("results"),
        screenshot_dir: dir.path().join("screenshots"),
        ..RunnerConfig::default()
    };
    let (runner, sessions) = runner(MockDashboard::new(&common::oracle()), config);

    let suite = runner.run_all().await.unwrap();
    assert_eq!(suite.total, Scenario::ALL.len());
    assert_eq!(suite.passed, suite.total);
    assert!(suite.all_passed());
    assert_eq!(sessions.opened(), Scenario::ALL.len());

    let names: Vec<&str> = suite.results.iter().map(|r| r.name.as_str()).collect();
    let expected: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(names, expected);

    let path = runner.write_results(&suite).unwrap();
    assert_eq!(path, dir.path().join("results").join("test-results.json"));
    let written: TestSuiteResult =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.passed, suite.passed);
    assert_eq!(written.results.len(), suite.results.len());
}

#[tokio::test]
async fn test_runner_screenshots_failures() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        workers: 1,
        results_dir: dir.path().join("results"),
        screenshot_dir: dir.path().join("screenshots"),
        ..RunnerConfig::default()
    };
    let mut dashboard = MockDashboard::new(&common::oracle());
    dashboard.task_mut("API integration").tags.clear();
    let (runner, _) = runner(dashboard, config);

    let suite = runner.run_tagged("cards").await.unwrap();
    assert_eq!(suite.total, Scenario::tagged("cards").len());
    assert!(!suite.all_passed());

    let details = suite
        .results
        .iter()
        .find(|r| r.name == "task-card-details")
        .unwrap();
    assert!(!details.success);
    assert_eq!(details.mismatches.len(), 1);
    assert_eq!(details.mismatches[0].field, CardField::Tags);
    let screenshot = details.screenshot.as_ref().unwrap();
    assert!(screenshot.exists());
    assert!(std::fs::read_to_string(screenshot).unwrap().contains("<nav>"));
}

#[tokio::test]
async fn test_fail_fast_skips_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        workers: 1,
        fail_fast: true,
        screenshot_on_failure: false,
        results_dir: dir.path().to_path_buf(),
        screenshot_dir: dir.path().to_path_buf(),
        ..RunnerConfig::default()
    };
    let mut dashboard = MockDashboard::new(&common::oracle());
    dashboard.projects.pop();
    let (runner, sessions) = runner(dashboard, config);

    let suite = runner
        .run_scenarios(&[
            Scenario::LoginInvalid,
            Scenario::ProjectNavigation,
            Scenario::DataIntegrity,
        ])
        .await
        .unwrap();
    assert_eq!(suite.passed, 1);
    assert_eq!(suite.failed, 1);
    assert_eq!(suite.skipped, 1);
    assert!(suite.results[2].skipped);
    assert_eq!(sessions.opened(), 2);
}

#[tokio::test]
async fn test_run_test_by_name() {
    let (runner, _) = runner(MockDashboard::new(&common::oracle()), RunnerConfig::default());

    let result = runner.run_test("header-matches-project").await.unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.tags, vec!["dashboard".to_string()]);

    let err = runner.run_test("visual-baseline").await.unwrap_err();
    assert!(matches!(err, E2eError::UnknownScenario(name) if name == "visual-baseline"));
}

#[tokio::test]
async fn test_missing_credentials_stop_the_run_before_any_session() {
    let dashboard = MockDashboard::new(&common::oracle());
    let strict = FixtureOracle::new(Arc::new(common::fixture()))
        .with_policy(CredentialPolicy::Strict)
        .with_env_lookup(|_| None);
    let sessions = Arc::new(MockSessions::new(dashboard));
    let runner = TestRunner::new(sessions.clone(), Arc::new(strict), Selectors::default());

    let err = runner.run_all().await.unwrap_err();
    assert!(matches!(err, E2eError::Fixture(Error::Configuration(_))), "{:?}", err);
    assert_eq!(sessions.opened(), 0);

    let err = runner.run_test("logout").await.unwrap_err();
    assert!(matches!(err, E2eError::Fixture(Error::Configuration(_))), "{:?}", err);
    assert_eq!(sessions.opened(), 0);

    // The rejected-login check never uses the real credentials.
    let suite = runner.run_scenarios(&[Scenario::LoginInvalid]).await.unwrap();
    assert!(suite.all_passed());
    assert_eq!(sessions.opened(), 1);
}

#[tokio::test]
async fn test_strict_fixture_rejects_inconsistent_catalogues() {
    let dashboard = MockDashboard::new(&common::oracle());
    let mut fixture = common::fixture();
    fixture.statuses[0].count += 1;
    let oracle = Arc::new(common::oracle_for(fixture));
    let sessions = Arc::new(MockSessions::new(dashboard));

    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        strict_fixture: true,
        results_dir: dir.path().to_path_buf(),
        screenshot_dir: dir.path().to_path_buf(),
        ..RunnerConfig::default()
    };
    let strict = TestRunner::with_config(
        sessions.clone(),
        oracle.clone(),
        Selectors::default(),
        config.clone(),
    );
    let err = strict.run_all().await.unwrap_err();
    assert!(matches!(err, E2eError::Fixture(Error::InvalidFixture(_))), "{:?}", err);
    assert_eq!(sessions.opened(), 0);

    // Without the flag the issue is only logged.
    let lenient = TestRunner::with_config(
        sessions.clone(),
        oracle,
        Selectors::default(),
        RunnerConfig {
            strict_fixture: false,
            ..config
        },
    );
    let suite = lenient.run_scenarios(&[Scenario::LoginValid]).await.unwrap();
    assert!(suite.all_passed());
    assert_eq!(sessions.opened(), 1);
}
