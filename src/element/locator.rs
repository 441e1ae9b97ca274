//! Element locator types
//!
//! A locator names a target element either by CSS selector, by XPath
//! expression, or as an already-resolved element handle. Raw strings are
//! classified by prefix so call sites can pass plain selector literals;
//! handles skip resolution entirely and are probed directly.

use std::fmt;
use std::sync::Arc;

use crate::driver::traits::ElementHandle;

/// Element locator
#[derive(Debug, Clone)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
    /// Pre-resolved element handle
    Handle(Arc<dyn ElementHandle>),
}

impl Locator {
    /// Create a CSS locator
    pub fn css<S: Into<String>>(selector: S) -> Self {
        Locator::Css(selector.into())
    }

    /// Create an XPath locator
    pub fn xpath<S: Into<String>>(expression: S) -> Self {
        Locator::XPath(expression.into())
    }

    /// Wrap an already-resolved element handle
    pub fn handle(element: Arc<dyn ElementHandle>) -> Self {
        Locator::Handle(element)
    }

    /// Get the raw selector string without the scheme prefix
    ///
    /// For a pre-resolved handle this is the selector the handle was
    /// originally resolved from.
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) => s,
            Locator::XPath(s) => s,
            Locator::Handle(element) => element.selector(),
        }
    }

    /// Classify a raw selector string
    ///
    /// Strings prefixed with `css=` or `xpath=` are taken literally; bare
    /// strings starting with `//` or `(` are treated as XPath, anything else
    /// as CSS.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if let Some(rest) = raw.strip_prefix("css=") {
            Locator::Css(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("xpath=") {
            Locator::XPath(rest.to_string())
        } else if raw.starts_with("//") || raw.starts_with("(") {
            Locator::XPath(raw.to_string())
        } else {
            Locator::Css(raw.to_string())
        }
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Locator::Css(a), Locator::Css(b)) => a == b,
            (Locator::XPath(a), Locator::XPath(b)) => a == b,
            (Locator::Handle(a), Locator::Handle(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Locator {}

impl From<&str> for Locator {
    fn from(raw: &str) -> Self {
        Locator::parse(raw)
    }
}

impl From<String> for Locator {
    fn from(raw: String) -> Self {
        Locator::parse(&raw)
    }
}

impl From<Arc<dyn ElementHandle>> for Locator {
    fn from(element: Arc<dyn ElementHandle>) -> Self {
        Locator::Handle(element)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::Handle(element) => write!(f, "handle={}", element.selector()),
        }
    }
}
