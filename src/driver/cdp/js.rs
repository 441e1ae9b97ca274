//! JavaScript code generation for element operations
//!
//! This module generates the snippets evaluated over CDP to locate and
//! manipulate DOM elements. Every script re-resolves the element from its
//! locator, so callers always observe the current DOM state.

use crate::element::Locator;

/// JavaScript code builder for element operations
///
/// Wraps a [`Locator`] and produces self-contained IIFE scripts for the
/// operations the element handle needs. Scripts evaluate to `null` when the
/// element is not present.
#[derive(Debug, Clone)]
pub struct JsBuilder {
    locator: Locator,
}

impl JsBuilder {
    /// Create a new JavaScript builder for the given locator
    pub fn new(locator: Locator) -> Self {
        Self { locator }
    }

    /// Get the locator this builder resolves
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Escape a string for safe embedding in a single-quoted JavaScript literal
    ///
    /// Handles backslashes, quotes, and line breaks so arbitrary input text
    /// cannot break out of the generated script.
    pub fn escape_js_str(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('\'', "\\'")
            .replace('"', r#"\""#)
            .replace('\n', "\\n")
            .replace('\r', "\\r")
    }

    /// Generate the query expression for the locator
    ///
    /// Evaluates to the first matching element, or `null` when nothing
    /// matches.
    pub fn element_query(&self) -> String {
        match &self.locator {
            Locator::Css(selector) => {
                format!(
                    "document.querySelector('{}')",
                    Self::escape_js_str(selector)
                )
            }
            Locator::XPath(expression) => {
                format!(
                    "document.evaluate('{}', document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                    Self::escape_js_str(expression)
                )
            }
            // Builders are only constructed from parsed selectors; a handle
            // reaching this point degrades to element-not-found.
            Locator::Handle(_) => "null".to_string(),
        }
    }

    /// Build a script that executes code on the located element
    ///
    /// The element is available as the `el` variable. The whole script
    /// evaluates to `null` when the element is absent.
    pub fn execute_on_element(&self, js_code: &str) -> String {
        format!(
            r#"(() => {{ const el = {}; if (!el) return null; {} }})()"#,
            self.element_query(),
            js_code
        )
    }

    /// Build script that reports element presence
    pub fn exists_script(&self) -> String {
        self.execute_on_element("return true;")
    }

    /// Build script to check element visibility
    ///
    /// An element counts as visible when it has a non-empty box and neither
    /// `display: none` nor `visibility: hidden` applies. Returns a JSON
    /// object with `visible` and a `reason` naming the failing check.
    pub fn is_visible_script(&self) -> String {
        self.execute_on_element(
            r#"const style = window.getComputedStyle(el);
              const rect = el.getBoundingClientRect();

              let visible = true;
              let reason = 'visible';

              if (style.display === 'none') {
                  visible = false;
                  reason = 'display: none';
              } else if (style.visibility === 'hidden') {
                  visible = false;
                  reason = 'visibility: hidden';
              } else if (rect.width === 0 || rect.height === 0) {
                  visible = false;
                  reason = 'zero size';
              }

              return JSON.stringify({visible, reason});"#,
        )
    }

    /// Build script to check if element accepts interaction
    ///
    /// Checks the `disabled` property and disabled ancestor fieldsets.
    /// Returns a JSON object with `enabled` and a `reason`.
    pub fn is_enabled_script(&self) -> String {
        self.execute_on_element(
            r#"let enabled = true;
              let reason = 'enabled';

              if (el.disabled) {
                  enabled = false;
                  reason = 'disabled attribute';
              } else {
                  let parent = el.parentElement;
                  while (parent) {
                      if (parent.tagName === 'FIELDSET' && parent.disabled) {
                          enabled = false;
                          reason = 'parent fieldset disabled';
                          break;
                      }
                      parent = parent.parentElement;
                  }
              }

              return JSON.stringify({enabled, reason});"#,
        )
    }

    /// Build script to read the current input value
    ///
    /// Form controls report their `value` property; other elements fall back
    /// to text content, which keeps value waits usable on read-only displays.
    pub fn value_script(&self) -> String {
        self.execute_on_element(
            "return 'value' in el ? String(el.value) : (el.textContent || '');",
        )
    }

    /// Build script to get element text content
    pub fn text_script(&self) -> String {
        self.execute_on_element("return el.textContent || el.innerText || '';")
    }

    /// Build script to get an attribute value
    ///
    /// Wraps the attribute in a JSON object so a missing attribute stays
    /// distinguishable from a missing element: the bare script yields `null`
    /// for the element, the object carries `null` for the attribute.
    pub fn attribute_script(&self, name: &str) -> String {
        self.execute_on_element(&format!(
            "return JSON.stringify({{value: el.getAttribute('{}')}});",
            Self::escape_js_str(name)
        ))
    }

    /// Build script to clear an input
    ///
    /// Empties the value and dispatches input/change events so framework
    /// bindings observe the edit.
    pub fn clear_script(&self) -> String {
        self.execute_on_element(
            r#"el.focus(); el.value = '';
               el.dispatchEvent(new Event('input', {bubbles: true}));
               el.dispatchEvent(new Event('change', {bubbles: true}));
               return 'cleared';"#,
        )
    }

    /// Build script to fill an input with text
    ///
    /// Replaces the whole value and dispatches input/change events.
    pub fn fill_script(&self, text: &str) -> String {
        self.execute_on_element(&format!(
            r#"el.focus(); el.value = '{}';
               el.dispatchEvent(new Event('input', {{bubbles: true}}));
               el.dispatchEvent(new Event('change', {{bubbles: true}}));
               return 'filled';"#,
            Self::escape_js_str(text)
        ))
    }

    /// Build script to click the element
    ///
    /// Scrolls the element to the viewport center first so the click lands on
    /// something actually on screen.
    pub fn click_script(&self) -> String {
        self.execute_on_element(
            "el.scrollIntoView({behavior: 'auto', block: 'center'}); el.click(); return 'clicked';",
        )
    }

    /// Build script to scroll the element into view
    pub fn scroll_into_view_script(&self) -> String {
        self.execute_on_element(
            "el.scrollIntoView({behavior: 'auto', block: 'center'}); return 'scrolled';",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_js_str() {
        assert_eq!(JsBuilder::escape_js_str("test"), "test");
        assert_eq!(JsBuilder::escape_js_str("test's"), "test\\'s");
        assert_eq!(JsBuilder::escape_js_str("test\"s"), r#"test\"s"#);
        assert_eq!(JsBuilder::escape_js_str("test\\s"), "test\\\\s");
        assert_eq!(JsBuilder::escape_js_str("a\nb"), "a\\nb");
    }

    #[test]
    fn test_css_query() {
        let builder = JsBuilder::new(Locator::css("button.submit"));
        let query = builder.element_query();
        assert!(query.contains("querySelector"));
        assert!(query.contains("button.submit"));
    }

    #[test]
    fn test_xpath_query() {
        let builder = JsBuilder::new(Locator::xpath("//button[@type='submit']"));
        let query = builder.element_query();
        assert!(query.contains("document.evaluate"));
        assert!(query.contains("XPathResult"));
    }

    #[test]
    fn test_missing_element_short_circuits() {
        let builder = JsBuilder::new(Locator::css("#gone"));
        let script = builder.exists_script();
        assert!(script.contains("if (!el) return null;"));
    }

    #[test]
    fn test_fill_script_escapes_text() {
        let builder = JsBuilder::new(Locator::css("input"));
        let script = builder.fill_script("it's done");
        assert!(script.contains("el.value = 'it\\'s done'"));
        assert!(script.contains("dispatchEvent"));
    }

    #[test]
    fn test_click_script_scrolls_first() {
        let builder = JsBuilder::new(Locator::css("button"));
        let script = builder.click_script();
        assert!(script.contains("scrollIntoView"));
        assert!(script.contains("el.click()"));
    }
}
