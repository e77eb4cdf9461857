//! The page driver capability the suite is written against

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Opaque reference to an element located by a [`PageDriver`].
///
/// Only meaningful to the driver that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(pub u64);

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Browser operations consumed by the page objects and the card reconciler.
///
/// Every call completes (including any settle wait the driver applies) before
/// returning; callers never overlap calls on one session. Lookups that find
/// nothing return `None` or an empty list rather than an error.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a path relative to the app's base URL
    async fn goto(&self, path: &str) -> E2eResult<()>;

    /// First element whose whole text content, whitespace collapsed, equals
    /// `text`. Text of child elements counts, so `<h2>Done<span>(3)</span></h2>`
    /// matches `"Done(3)"` but not `"Done"`. When nested elements match, the
    /// innermost one is returned.
    async fn find_first_by_text(&self, text: &str) -> E2eResult<Option<ElementRef>>;

    /// First element matching a CSS selector
    async fn find_first(&self, selector: &str) -> E2eResult<Option<ElementRef>>;

    /// Every element matching a CSS selector, in document order
    async fn find_all(&self, selector: &str) -> E2eResult<Vec<ElementRef>>;

    /// Nearest enclosing element
    async fn container_of(&self, element: ElementRef) -> E2eResult<ElementRef>;

    /// Full text content, empty when the element has none
    async fn text_of(&self, element: ElementRef) -> E2eResult<String>;

    async fn is_visible(&self, element: ElementRef) -> E2eResult<bool>;

    async fn click(&self, element: ElementRef) -> E2eResult<()>;

    async fn fill(&self, element: ElementRef, value: &str) -> E2eResult<()>;

    /// Block until rendering and network activity settle
    async fn wait_until_idle(&self) -> E2eResult<()>;

    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    /// Release the session. Further calls are undefined.
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Opens isolated browser sessions, one per scenario.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> E2eResult<Box<dyn PageDriver>>;
}
