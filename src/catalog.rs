//! Step catalog: the fixed, ordered lesson content fed to the pipeline

use crate::{Error, Result};
use scraper::{Html, Selector};
use std::sync::Arc;

/// An opaque renderable fragment of HTML.
///
/// The core never inspects it beyond what the readiness probe and the capture
/// backend need (image sources, text, layout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    html: String,
}

impl ContentNode {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parse the fragment. Each call yields a fresh tree, which plays the role
    /// of the off-screen clone handed to the capture backend.
    pub fn parse(&self) -> Html {
        Html::parse_fragment(&self.html)
    }

    /// `src` attributes of every `<img>` under this node, in document order.
    pub fn image_sources(&self) -> Vec<String> {
        let doc = self.parse();
        let sel = match Selector::parse("img") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        doc.select(&sel)
            .filter_map(|img| img.value().attr("src"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whitespace-normalized text content
    pub fn text(&self) -> String {
        let doc = self.parse();
        doc.root_element()
            .text()
            .flat_map(|t| t.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One lesson slide
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: ContentNode,
}

impl Step {
    pub fn new(title: impl Into<String>, content: ContentNode) -> Self {
        Self { title: title.into(), subtitle: None, content }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// Immutable ordered sequence of steps. Cloning shares the same storage.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Arc<[Step]>,
}

impl StepCatalog {
    /// Build a catalog. An empty catalog has no valid index and is rejected.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::ConfigError("step catalog must contain at least one step".into()));
        }
        Ok(Self { steps: steps.into() })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed catalog; provided for API completeness.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }
}

const CELL: &str = r#"style="padding: 10px; border: 1px solid #d1d5db""#;

/// The built-in cybersecurity lesson.
pub fn default_catalog() -> StepCatalog {
    let intro = ContentNode::new(
        r#"<div>
  <h1 style="font-size: 2rem; font-weight: 700; color: #111827">Advanced Cybersecurity Concepts</h1>
  <p style="font-size: 1.125rem; color: #374151">Welcome to this confidential instructional module. All material shown below is protected by forensic watermarking and anti-piracy controls.</p>
  <p style="font-size: 1.125rem; color: #374151">In this lesson, you'll explore encryption algorithms, secure communications, and zero-trust network design principles critical for modern enterprise defense.</p>
</div>"#,
    );

    let topics = ContentNode::new(format!(
        r#"<div>
  <h2>Lesson Topics</h2>
  <table style="border-collapse: collapse; width: 100%; color: #111827">
    <thead style="background-color: #f3f4f6">
      <tr><th {c}>Topic</th><th {c}>Description</th><th {c}>Level</th></tr>
    </thead>
    <tbody>
      <tr><td {c}>Encryption</td><td {c}>Overview of AES, RSA, and ECC algorithms.</td><td {c}>Intermediate</td></tr>
      <tr><td {c}>Zero Trust</td><td {c}>Framework for access verification at every step.</td><td {c}>Advanced</td></tr>
    </tbody>
  </table>
</div>"#,
        c = CELL
    ));

    let notice = ContentNode::new(
        r#"<div>
  <h2>Session Notice</h2>
  <p style="font-size: 1rem; color: #6b7280">Each session is uniquely watermarked and monitored. Copying or distribution is strictly prohibited.</p>
</div>"#,
    );

    let steps = vec![
        Step::new("Advanced Cybersecurity Concepts", intro).with_subtitle("Introduction"),
        Step::new("Lesson Topics", topics).with_subtitle("Encryption and Zero Trust"),
        Step::new("Session Notice", notice),
    ];

    // Non-empty by construction
    StepCatalog { steps: steps.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_is_rejected() {
        let err = StepCatalog::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn default_catalog_has_three_steps() {
        let c = default_catalog();
        assert_eq!(c.len(), 3);
        assert_eq!(c.get(0).unwrap().title, "Advanced Cybersecurity Concepts");
        assert!(c.get(1).unwrap().content.text().contains("Zero Trust"));
        assert!(c.get(3).is_none());
    }

    #[test]
    fn image_sources_are_collected_in_order() {
        let node = ContentNode::new(r#"<div><img src="/a.png"><p>x</p><img src=" b.png "><img></div>"#);
        assert_eq!(node.image_sources(), vec!["/a.png".to_string(), "b.png".to_string()]);
    }
}
