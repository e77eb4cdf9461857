//! Card reconciliation against the in-memory dashboard

mod common;

use once_cell::sync::Lazy;
use regex::Regex;

use taskboard_common::Project;
use taskboard_e2e::reconciler::{find_status_heading, UNKNOWN_STATUS};
use taskboard_e2e::static_page::StaticPage;
use taskboard_e2e::{CardReconciler, PageDriver};

use common::MockDashboard;

static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap());

#[tokio::test]
async fn test_card_details_for_authentication_task() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    let card = reconciler
        .card_details("Implement user authentication")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(card.title, "Implement user authentication");
    assert_eq!(card.status, "In Progress");
    assert_eq!(card.priority, "High Priority");
    assert_eq!(card.assignee, "Sarah Chen");
    assert_eq!(card.due_date, "1/15/2025");
    assert_eq!(card.tags, vec!["Feature".to_string()]);
}

#[tokio::test]
async fn test_card_not_rendered_is_none() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    // Belongs to a project that is not selected.
    let card = reconciler.card_details("Biometric login").await.unwrap();
    assert!(card.is_none());
    assert!(reconciler.card_details("No such card").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    let first = reconciler.all_cards().await.unwrap();
    let second = reconciler.all_cards().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn test_every_card_resolves_within_the_vocabularies() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);
    let statuses = oracle.status_names();
    let tags = oracle.tag_names();

    for project in oracle.project_names() {
        page.update(|m| m.select(project));
        for card in reconciler.all_cards().await.unwrap() {
            assert!(
                statuses.contains(&card.status.as_str()) || card.status == UNKNOWN_STATUS,
                "{:?}",
                card
            );
            assert!(card.due_date.is_empty() || DATE.is_match(&card.due_date));
            assert!(card.tags.iter().all(|t| tags.contains(&t.as_str())));
        }
    }
}

#[tokio::test]
async fn test_status_counts_match_the_fixture_per_project() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    for project in oracle.project_names() {
        page.update(|m| m.select(project));
        for status in oracle.status_names() {
            let rendered = reconciler.cards_by_status(status).await.unwrap();
            assert_eq!(
                rendered.len(),
                oracle.project_tasks_by_status(project, status).len(),
                "{} / {}",
                project,
                status
            );
        }
    }
}

#[tokio::test]
async fn test_filters_by_tag_and_assignee() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    let features: Vec<String> = reconciler
        .cards_by_tag("Feature")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.title)
        .collect();
    assert_eq!(features, vec!["Implement user authentication", "API integration"]);

    let mike = reconciler.cards_by_assignee("Mike Johnson").await.unwrap();
    assert_eq!(mike.len(), 1);
    assert_eq!(mike[0].title, "API integration");
}

#[tokio::test]
async fn test_status_outside_every_column_is_unknown() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    page.update(|m| m.task_mut("Fix navigation bug").status = "Blocked".to_string());
    let reconciler = CardReconciler::new(&page, &oracle);

    let card = reconciler.card_details("Fix navigation bug").await.unwrap().unwrap();
    assert_eq!(card.status, UNKNOWN_STATUS);
    assert_eq!(card.assignee, "John Smith");
}

#[tokio::test]
async fn test_project_without_tasks_yields_no_cards() {
    let mut fixture = common::fixture();
    fixture.projects.push(Project {
        name: "Archive".to_string(),
        description: String::new(),
        tasks: Vec::new(),
    });
    let oracle = common::oracle_for(fixture);
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    page.update(|m| m.select("Archive"));
    let reconciler = CardReconciler::new(&page, &oracle);

    assert!(reconciler.cards_for_project("Archive").await.unwrap().is_empty());
    assert!(reconciler.all_cards().await.unwrap().is_empty());
    for status in oracle.status_names() {
        assert!(reconciler.cards_by_status(status).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_project_labels_are_normalized() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle).with_project_selector("nav button");

    // Switcher buttons render "Web Application(5)" and so on.
    let labels = reconciler.project_card_titles().await.unwrap();
    assert_eq!(
        labels,
        vec!["Web Application", "Mobile Application", "Marketing Campaign"]
    );
}

#[tokio::test]
async fn test_status_read_from_headings_with_counters() {
    let oracle = common::oracle();
    let page = StaticPage::new(MockDashboard::signed_in(&oracle));
    let reconciler = CardReconciler::new(&page, &oracle);

    // Headings render as "To Do(2)", so exact text lookup cannot find them.
    assert!(page.find_first_by_text("To Do").await.unwrap().is_none());
    let heading = page.find_first_by_text("To Do(2)").await.unwrap().unwrap();
    assert_eq!(page.text_of(heading).await.unwrap(), "To Do(2)");

    assert_eq!(reconciler.status_of("Fix navigation bug").await.unwrap(), "To Do");
    assert_eq!(
        reconciler.status_of("Implement user authentication").await.unwrap(),
        "In Progress"
    );

    let (_, badge) = find_status_heading(&page, "main h2", "To Do").await.unwrap().unwrap();
    assert_eq!(badge, Some(2));
    assert!(find_status_heading(&page, "main h2", "Blocked").await.unwrap().is_none());
}
