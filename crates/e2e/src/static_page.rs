//! In-memory page driver
//!
//! [`StaticPage`] renders a [`PageModel`] into a small element tree and
//! answers [`PageDriver`] calls against it, so page objects, the reconciler
//! and whole scenarios can run without a browser. Text content follows the
//! DOM's `textContent`: the concatenation of every descendant text with no
//! separators.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::driver::{ElementRef, PageDriver};
use crate::error::{E2eError, E2eResult};

/// Element builder used by page models to describe what they render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I: IntoIterator<Item = Element>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }
}

/// What a model sees of the element a click or fill landed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
}

impl Target {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Application state rendered by a [`StaticPage`]
pub trait PageModel: Send {
    fn render(&self) -> Element;

    fn navigate(&mut self, _path: &str) {}

    fn click(&mut self, _target: &Target) {}

    fn fill(&mut self, _target: &Target, _value: &str) {}
}

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Node {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Flattened element tree; index 0 is the root, indices follow document order.
#[derive(Debug, Default)]
struct Document {
    nodes: Vec<Node>,
}

impl Document {
    fn build(root: Element) -> Self {
        let mut doc = Document::default();
        doc.push(root, None);
        doc
    }

    fn push(&mut self, element: Element, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            tag: element.tag,
            attrs: element.attrs,
            text: element.text,
            parent,
            children: Vec::new(),
        });
        for child in element.children {
            let child_index = self.push(child, Some(index));
            self.nodes[index].children.push(child_index);
        }
        index
    }

    fn text_content(&self, index: usize) -> String {
        let mut out = String::new();
        self.collect_text(index, &mut out);
        out
    }

    fn collect_text(&self, index: usize, out: &mut String) {
        let node = &self.nodes[index];
        out.push_str(&node.text);
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    // Innermost match: an element whose child carries the same text defers to it.
    fn find_by_text(&self, wanted: &str) -> Option<usize> {
        if wanted.is_empty() {
            return None;
        }
        let has_text = |i: usize| normalize(&self.text_content(i)) == wanted;
        (0..self.nodes.len())
            .find(|&i| has_text(i) && !self.nodes[i].children.iter().any(|&c| has_text(c)))
    }

    fn is_visible(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.nodes[i].attr("hidden").is_some() {
                return false;
            }
            current = self.nodes[i].parent;
        }
        true
    }

    fn matches(&self, index: usize, selector: &Selector) -> bool {
        selector
            .alternatives
            .iter()
            .any(|chain| self.matches_chain(index, chain))
    }

    // Right-most compound must match the node itself, the rest match ancestors.
    fn matches_chain(&self, index: usize, chain: &[Compound]) -> bool {
        let Some((last, rest)) = chain.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[index]) {
            return false;
        }
        let mut remaining = rest;
        let mut current = self.nodes[index].parent;
        while let Some((next, before)) = remaining.split_last() {
            loop {
                let Some(i) = current else { return false };
                current = self.nodes[i].parent;
                if next.matches(&self.nodes[i]) {
                    break;
                }
            }
            remaining = before;
        }
        true
    }

    fn target(&self, index: usize) -> Target {
        let node = &self.nodes[index];
        Target {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            text: self.text_content(index),
        }
    }

    fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, 0, &mut out);
        out
    }

    fn write_outline(&self, index: usize, depth: usize, out: &mut String) {
        let node = &self.nodes[index];
        let _ = writeln!(out, "{}<{}> {}", "  ".repeat(depth), node.tag, node.text.trim());
        for &child in &node.children {
            self.write_outline(child, depth + 1, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    attrs: Vec<(String, AttrOp)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&node.tag) {
                return false;
            }
        }
        self.attrs.iter().all(|(name, op)| match (node.attr(name), op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals(expected)) => v == expected,
            (Some(v), AttrOp::Contains(needle)) => {
                v.to_lowercase().contains(&needle.to_lowercase())
            }
        })
    }
}

/// The CSS subset page models are queried with: type selectors, attribute
/// selectors (`[a]`, `[a="v"]`, `[a*="v"]`), descendant combinators and
/// comma-separated alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    fn parse(input: &str) -> E2eResult<Self> {
        let invalid = || E2eError::InvalidSelector(input.to_string());
        let mut alternatives = Vec::new();

        for part in input.split(',') {
            let mut chain = Vec::new();
            for token in part.split_whitespace() {
                chain.push(parse_compound(token).ok_or_else(invalid)?);
            }
            if chain.is_empty() {
                return Err(invalid());
            }
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }
}

fn parse_compound(token: &str) -> Option<Compound> {
    let (tag, mut rest) = match token.find('[') {
        Some(i) => (&token[..i], &token[i..]),
        None => (token, ""),
    };
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    let mut compound = Compound {
        tag: (!tag.is_empty()).then(|| tag.to_string()),
        attrs: Vec::new(),
    };

    while !rest.is_empty() {
        let inner_end = rest.find(']')?;
        let inner = rest.get(1..inner_end)?;
        rest = &rest[inner_end + 1..];

        let (name, op) = if let Some((name, value)) = inner.split_once("*=") {
            (name, AttrOp::Contains(unquote(value)))
        } else if let Some((name, value)) = inner.split_once('=') {
            (name, AttrOp::Equals(unquote(value)))
        } else {
            (inner, AttrOp::Exists)
        };
        if name.is_empty() {
            return None;
        }
        compound.attrs.push((name.to_string(), op));
    }

    if compound.tag.is_none() && compound.attrs.is_empty() {
        return None;
    }
    Some(compound)
}

// Values with spaces are not supported since the selector is split on whitespace.
fn unquote(value: &str) -> String {
    value.trim_matches(|c| c == '"' || c == '\'').to_string()
}

struct PageState<M> {
    model: M,
    doc: Document,
    handles: HashMap<u64, usize>,
    next_handle: u64,
}

impl<M: PageModel> PageState<M> {
    fn rerender(&mut self) {
        self.doc = Document::build(self.model.render());
        // Re-rendering replaces every element, like a full page update.
        self.handles.clear();
    }

    fn register(&mut self, index: usize) -> ElementRef {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, index);
        ElementRef(id)
    }

    fn resolve(&self, element: ElementRef) -> E2eResult<usize> {
        self.handles
            .get(&element.0)
            .copied()
            .ok_or(E2eError::StaleElement(element.0))
    }
}

/// [`PageDriver`] over an in-memory [`PageModel`]
pub struct StaticPage<M> {
    state: Mutex<PageState<M>>,
}

impl<M: PageModel> StaticPage<M> {
    pub fn new(model: M) -> Self {
        let doc = Document::build(model.render());
        Self {
            state: Mutex::new(PageState {
                model,
                doc,
                handles: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    /// Change the model outside of driver calls and re-render
    pub fn update<F: FnOnce(&mut M)>(&self, f: F) {
        let mut state = self.state.lock();
        f(&mut state.model);
        state.rerender();
    }

    /// Read the model
    pub fn inspect<R, F: FnOnce(&M) -> R>(&self, f: F) -> R {
        f(&self.state.lock().model)
    }

    /// Indented tag/text dump of the current render
    pub fn outline(&self) -> String {
        self.state.lock().doc.outline()
    }
}

#[async_trait]
impl<M: PageModel> PageDriver for StaticPage<M> {
    async fn goto(&self, path: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.model.navigate(path);
        state.rerender();
        Ok(())
    }

    async fn find_first_by_text(&self, text: &str) -> E2eResult<Option<ElementRef>> {
        let wanted = normalize(text);
        let mut state = self.state.lock();
        let found = state.doc.find_by_text(&wanted);
        Ok(found.map(|i| state.register(i)))
    }

    async fn find_first(&self, selector: &str) -> E2eResult<Option<ElementRef>> {
        let selector = Selector::parse(selector)?;
        let mut state = self.state.lock();
        let found = (0..state.doc.nodes.len()).find(|&i| state.doc.matches(i, &selector));
        Ok(found.map(|i| state.register(i)))
    }

    async fn find_all(&self, selector: &str) -> E2eResult<Vec<ElementRef>> {
        let selector = Selector::parse(selector)?;
        let mut state = self.state.lock();
        let found: Vec<usize> = (0..state.doc.nodes.len())
            .filter(|&i| state.doc.matches(i, &selector))
            .collect();
        Ok(found.into_iter().map(|i| state.register(i)).collect())
    }

    async fn container_of(&self, element: ElementRef) -> E2eResult<ElementRef> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        // The root is its own container.
        let parent = state.doc.nodes[index].parent.unwrap_or(index);
        Ok(state.register(parent))
    }

    async fn text_of(&self, element: ElementRef) -> E2eResult<String> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.doc.text_content(index))
    }

    async fn is_visible(&self, element: ElementRef) -> E2eResult<bool> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        Ok(state.doc.is_visible(index))
    }

    async fn click(&self, element: ElementRef) -> E2eResult<()> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        if !state.doc.is_visible(index) {
            return Err(E2eError::Timeout(format!("click on hidden element {}", element)));
        }
        let target = state.doc.target(index);
        state.model.click(&target);
        state.rerender();
        Ok(())
    }

    async fn fill(&self, element: ElementRef, value: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        let target = state.doc.target(index);
        state.model.fill(&target, value);
        state.rerender();
        Ok(())
    }

    async fn wait_until_idle(&self) -> E2eResult<()> {
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        let outline = self.outline();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, outline).await?;
        Ok(())
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
