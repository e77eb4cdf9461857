//! Taskboard E2E Test Framework
//!
//! Drives the task-board dashboard in a real browser and checks what it
//! renders against the fixture the dashboard was seeded from:
//! - [`FixtureOracle`](taskboard_common::FixtureOracle) answers what the
//!   fixture says
//! - [`CardReconciler`] reads task cards back from the page
//! - scenarios compare the two and the [`TestRunner`] fans them out over
//!   browser sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── AppServer (spawn or probe the dashboard)             │
//! │    ├── SessionFactory -> Box<dyn PageDriver>                │
//! │    │     ├── PlaywrightDriver (node bridge, JSON lines)     │
//! │    │     └── StaticPage (in-memory, for tests)              │
//! │    └── Scenario::run(ctx) -> TestResult                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── LoginPage / DashboardPage                            │
//! │    ├── CardReconciler (text heuristics over the page)       │
//! │    └── compare_card(task, card) -> [FieldMismatch]          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod compare;
pub mod config;
pub mod driver;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod reconciler;
pub mod runner;
pub mod scenarios;
pub mod server;
pub mod static_page;

pub use compare::{compare_card, FieldMismatch};
pub use config::{Selectors, SuiteConfig};
pub use driver::{ElementRef, PageDriver, SessionFactory};
pub use error::{E2eError, E2eResult};
pub use reconciler::{CardReconciler, ReconciledCard};
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use scenarios::{Scenario, ScenarioContext};
