//! Observable client context for a single page load.

use std::{cell::RefCell, fmt, rc::Rc, str::FromStr};

use lol_html::{
    HandlerResult, RewriteStrSettings, Selector, element,
    html_content::{Element, EndTag},
    rewrite_str, text,
};
use tracing::debug;

/// Selector used by the blog layout for the post heading.
pub const DEFAULT_TITLE_SELECTOR: &str = ".post-title";

/// A CSS selector known to be accepted by the HTML rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSelector(String);

impl TitleSelector {
    pub fn parse(value: &str) -> Result<Self, lol_html::errors::SelectorError> {
        let trimmed = value.trim();
        Selector::from_str(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TitleSelector {
    fn default() -> Self {
        Self(DEFAULT_TITLE_SELECTOR.to_string())
    }
}

impl fmt::Display for TitleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the browsing context exposes to the beacon at DOM-ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    /// Text of the page's title element; `None` when the page has none.
    pub title: Option<String>,
    /// Address of the previous page, empty when navigated to directly.
    pub referrer: String,
    pub agent: String,
    pub language: String,
}

impl PageContext {
    pub fn new(
        referrer: impl Into<String>,
        agent: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            title: None,
            referrer: referrer.into(),
            agent: agent.into(),
            language: language.into(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Read the title element out of a rendered page.
    pub fn with_document(self, html: &str, selector: &TitleSelector) -> Self {
        let title = extract_title(html, selector);
        self.with_title(title)
    }
}

/// Text content of the first element matching `selector`, descendants included.
///
/// Matches nested inside the first one are part of its text; matches after it
/// are ignored. Missing elements and documents the rewriter rejects both yield
/// `None`.
pub fn extract_title(html: &str, selector: &TitleSelector) -> Option<String> {
    let state = Rc::new(RefCell::new(Capture::default()));

    let outcome = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(selector.as_str(), {
                    let state = Rc::clone(&state);
                    move |el: &mut Element| {
                        if state.borrow().started {
                            return Ok(());
                        }
                        {
                            let mut capture = state.borrow_mut();
                            capture.started = true;
                            capture.open = true;
                        }
                        match el.end_tag_handlers() {
                            Some(handlers) => {
                                let state = Rc::clone(&state);
                                handlers.push(Box::new(
                                    move |_end: &mut EndTag<'_>| -> HandlerResult {
                                        state.borrow_mut().open = false;
                                        Ok(())
                                    },
                                ));
                            }
                            // Void elements carry no text.
                            None => state.borrow_mut().open = false,
                        }
                        Ok(())
                    }
                }),
                text!(selector.as_str(), {
                    let state = Rc::clone(&state);
                    move |chunk| {
                        let mut capture = state.borrow_mut();
                        if capture.open {
                            capture.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    );

    if let Err(err) = outcome {
        debug!(error = %err, selector = %selector, "page could not be scanned for a title");
        return None;
    }

    let capture = state.borrow();
    capture
        .started
        .then(|| html_escape::decode_html_entities(&capture.text).into_owned())
}

#[derive(Debug, Default)]
struct Capture {
    started: bool,
    open: bool,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> TitleSelector {
        TitleSelector::default()
    }

    #[test]
    fn extracts_title_text() {
        let html = r#"<html><body><header><h1 class="post-title">Campaign Influence: Even Distribution Model</h1></header><p>Body</p></body></html>"#;
        assert_eq!(
            extract_title(html, &selector()).as_deref(),
            Some("Campaign Influence: Even Distribution Model")
        );
    }

    #[test]
    fn includes_nested_text() {
        let html = r#"<h1 class="post-title"><a href="/lwc/">Lightning <em>Web</em> Components</a></h1>"#;
        assert_eq!(
            extract_title(html, &selector()).as_deref(),
            Some("Lightning Web Components")
        );
    }

    #[test]
    fn missing_element_yields_none() {
        let html = "<html><body><h1>Archive</h1></body></html>";
        assert_eq!(extract_title(html, &selector()), None);
    }

    #[test]
    fn empty_element_yields_empty_title() {
        let html = r#"<h1 class="post-title"></h1>"#;
        assert_eq!(extract_title(html, &selector()).as_deref(), Some(""));
    }

    #[test]
    fn only_first_match_counts() {
        let html = r#"<h1 class="post-title">First</h1><h2 class="post-title">Second</h2>"#;
        assert_eq!(extract_title(html, &selector()).as_deref(), Some("First"));
    }

    #[test]
    fn character_references_are_decoded() {
        let html = r#"<h1 class="post-title">Apex &amp; SOQL &#8211; Tips &#x26; Tricks &copy;</h1>"#;
        assert_eq!(
            extract_title(html, &selector()).as_deref(),
            Some("Apex & SOQL \u{2013} Tips & Tricks \u{a9}")
        );
    }

    #[test]
    fn named_references_beyond_punctuation_are_decoded() {
        let html = r#"<h1 class="post-title">Caf&eacute; &copy; Apex&trade;</h1>"#;
        assert_eq!(
            extract_title(html, &selector()).as_deref(),
            Some("Caf\u{e9} \u{a9} Apex\u{2122}")
        );
    }

    #[test]
    fn nested_match_keeps_the_outer_title_whole() {
        let html = r#"<div class="post-title">Lightning <span class="post-title">Web</span> Components</div><h2 class="post-title">Related</h2>"#;
        assert_eq!(
            extract_title(html, &selector()).as_deref(),
            Some("Lightning Web Components")
        );
    }

    #[test]
    fn custom_selector_is_honoured() {
        let html = r#"<article><h2 id="headline">Batch Apex</h2></article>"#;
        let selector = TitleSelector::parse("article > #headline").expect("selector");
        assert_eq!(extract_title(html, &selector).as_deref(), Some("Batch Apex"));
    }

    #[test]
    fn invalid_selector_is_rejected() {
        assert!(TitleSelector::parse("h1[").is_err());
    }

    #[test]
    fn stray_ampersands_stay_literal() {
        let html = r#"<h1 class="post-title">R&D & Ops</h1>"#;
        assert_eq!(extract_title(html, &selector()).as_deref(), Some("R&D & Ops"));
    }

    #[test]
    fn with_document_sets_title() {
        let page = PageContext::new("https://www.google.com/", "Mozilla/5.0", "en-US")
            .with_document(r#"<h1 class="post-title">Flows</h1>"#, &selector());
        assert_eq!(page.title.as_deref(), Some("Flows"));
        assert_eq!(page.referrer, "https://www.google.com/");
    }
}
