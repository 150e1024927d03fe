//! JavaScript snippets evaluated in the page.
//!
//! Every user-supplied string is embedded as a JSON string literal, which is
//! also a valid JavaScript string literal.

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn element_exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

pub fn inner_text(selector: &str) -> String {
    format!(
        r#"
        (function() {{
            const element = document.querySelector({});
            if (!element) return null;
            return element.innerText || element.textContent || '';
        }})()
        "#,
        js_string(selector)
    )
}

pub fn is_visible(selector: &str) -> String {
    format!(
        r#"
        (function() {{
            const element = document.querySelector({});
            if (!element) return false;

            const rect = element.getBoundingClientRect();
            const style = window.getComputedStyle(element);

            return rect.width > 0 &&
                   rect.height > 0 &&
                   style.visibility !== 'hidden' &&
                   style.display !== 'none' &&
                   parseFloat(style.opacity) > 0;
        }})()
        "#,
        js_string(selector)
    )
}

pub fn submit_form(selector: &str) -> String {
    format!(
        r#"
        (function() {{
            const form = document.querySelector({});
            if (!form) return false;
            if (typeof form.requestSubmit === 'function') {{
                form.requestSubmit();
            }} else {{
                form.submit();
            }}
            return true;
        }})()
        "#,
        js_string(selector)
    )
}

pub const READY_STATE: &str = "document.readyState";

/// Time origin of the current document, unique per loaded document.
pub const DOCUMENT_ID: &str = "String(performance.timeOrigin)";

/// Status of the last top-level navigation, 0 when the browser does not
/// expose it.
pub const RESPONSE_STATUS: &str = r#"
    (function() {
        const entries = performance.getEntriesByType('navigation');
        if (!entries.length || !entries[0].responseStatus) return 0;
        return entries[0].responseStatus;
    })()
"#;
