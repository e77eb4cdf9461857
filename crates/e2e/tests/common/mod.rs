//! In-memory dashboard shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use taskboard_common::{
    CredentialKind, CredentialPolicy, Credentials, Fixture, FixtureOracle, Project, Task,
};
use taskboard_e2e::static_page::{Element, PageModel, StaticPage, Target};
use taskboard_e2e::{E2eResult, PageDriver, SessionFactory};

pub const FIXTURE_JSON: &str = include_str!("../../../../fixtures/test-data.json");

pub fn fixture() -> Fixture {
    Fixture::from_json(FIXTURE_JSON).expect("bundled fixture parses")
}

/// Oracle over the bundled fixture, falling back to its credentials
pub fn oracle() -> FixtureOracle {
    oracle_for(fixture())
}

pub fn oracle_for(fixture: Fixture) -> FixtureOracle {
    FixtureOracle::new(Arc::new(fixture)).with_policy(CredentialPolicy::Fallback)
}

/// The task board as the real dashboard lays it out: a login form, then a
/// header, a project switcher and one column per status.
#[derive(Debug, Clone)]
pub struct MockDashboard {
    /// What gets rendered; tests edit this to diverge from the fixture
    pub projects: Vec<Project>,
    pub statuses: Vec<String>,
    pub show_badges: bool,
    accepted: Credentials,
    username: String,
    password: String,
    logged_in: bool,
    login_failed: bool,
    selected: usize,
}

impl MockDashboard {
    pub fn new(oracle: &FixtureOracle) -> Self {
        let fixture = oracle.fixture();
        Self {
            projects: fixture.projects.clone(),
            statuses: oracle.status_names().iter().map(|s| s.to_string()).collect(),
            show_badges: true,
            accepted: oracle
                .credentials(CredentialKind::Valid)
                .expect("valid credentials resolve"),
            username: String::new(),
            password: String::new(),
            logged_in: false,
            login_failed: false,
            selected: 0,
        }
    }

    /// Already past the login form
    pub fn signed_in(oracle: &FixtureOracle) -> Self {
        Self {
            logged_in: true,
            ..Self::new(oracle)
        }
    }

    pub fn select(&mut self, project: &str) {
        if let Some(i) = self.projects.iter().position(|p| p.name == project) {
            self.selected = i;
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn task_mut(&mut self, title: &str) -> &mut Task {
        self.projects
            .iter_mut()
            .flat_map(|p| p.tasks.iter_mut())
            .find(|t| t.title == title)
            .expect("task is rendered")
    }

    fn login_form(&self) -> Element {
        let mut error = Element::new("div")
            .attr("role", "alert")
            .text("Invalid username or password");
        if !self.login_failed {
            error = error.attr("hidden", "");
        }

        Element::new("form").children([
            Element::new("h2").text("Sign in to Taskboard"),
            Element::new("input").attr("type", "text").attr("name", "username"),
            Element::new("input").attr("type", "password").attr("name", "password"),
            error,
            Element::new("button").attr("type", "submit").text("Sign in"),
        ])
    }

    fn board(&self) -> Element {
        let project = &self.projects[self.selected];

        let nav = Element::new("nav").children(self.projects.iter().map(|p| {
            Element::new("button")
                .text(&p.name)
                .child(Element::new("span").text(&format!("({})", p.tasks.len())))
        }));

        let columns = self.statuses.iter().map(|status| {
            let tasks: Vec<&Task> = project.tasks.iter().filter(|t| &t.status == status).collect();
            let mut heading = Element::new("h2").text(status);
            if self.show_badges {
                heading = heading.child(Element::new("span").text(&format!("({})", tasks.len())));
            }
            Element::new("section")
                .attr("data-status", status)
                .child(heading)
                .child(Element::new("div").children(tasks.into_iter().map(card)))
        });

        // Tasks whose status has no column still show up, outside every column.
        let unsorted = project
            .tasks
            .iter()
            .filter(|t| !self.statuses.contains(&t.status))
            .map(card);

        Element::new("div").attr("id", "app").children([
            Element::new("header").children([
                Element::new("h1").text(&project.name),
                Element::new("button").text("Logout"),
            ]),
            nav,
            Element::new("main").children(columns),
            Element::new("aside").children(unsorted),
        ])
    }
}

fn card(task: &Task) -> Element {
    let mut card = Element::new("div")
        .attr("data-testid", "task-card")
        .child(Element::new("h3").text(&task.title))
        .child(Element::new("p").text(&task.description));
    for value in [&task.priority, &task.assignee, &task.due_date].into_iter().flatten() {
        card = card.child(Element::new("span").text(value));
    }
    card.children(
        task.tags
            .iter()
            .map(|tag| Element::new("span").attr("class", "tag").text(tag)),
    )
}

impl PageModel for MockDashboard {
    fn render(&self) -> Element {
        let body = Element::new("body");
        if self.logged_in {
            body.child(self.board())
        } else {
            body.child(self.login_form())
        }
    }

    fn navigate(&mut self, _path: &str) {
        self.login_failed = false;
    }

    fn click(&mut self, target: &Target) {
        if target.tag != "button" {
            return;
        }
        if target.attr("type") == Some("submit") {
            let ok = self.username == self.accepted.username && self.password == self.accepted.password;
            self.logged_in = ok;
            self.login_failed = !ok;
            self.selected = 0;
        } else if target.text == "Logout" {
            self.logged_in = false;
            self.username.clear();
            self.password.clear();
        } else if let Some(i) = self.projects.iter().position(|p| target.text.contains(&p.name)) {
            self.selected = i;
        }
    }

    fn fill(&mut self, target: &Target, value: &str) {
        match target.attr("type") {
            Some("text") => self.username = value.to_string(),
            Some("password") => self.password = value.to_string(),
            _ => {}
        }
    }
}

/// Opens a fresh copy of `template` for every session
pub struct MockSessions {
    template: MockDashboard,
    opened: AtomicUsize,
}

impl MockSessions {
    pub fn new(template: MockDashboard) -> Self {
        Self {
            template,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockSessions {
    async fn open(&self) -> E2eResult<Box<dyn PageDriver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticPage::new(self.template.clone())))
    }
}
