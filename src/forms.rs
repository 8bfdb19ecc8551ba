//! Login-form extraction.
//!
//! The login page carries no stable markup around its form, so the form is
//! located through the one thing it must contain: a password input. The
//! extractor finds the first `<input type=password>` and walks up to its
//! nearest enclosing `<form>`.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error_handling::HtmlApiError;

// CSS selector strings
const PASSWORD_INPUT_SELECTOR_STR: &str = "input[type=password]";
const INPUT_SELECTOR_STR: &str = "input";

static PASSWORD_INPUT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(PASSWORD_INPUT_SELECTOR_STR)
        .expect("Failed to parse password input selector - this is a bug")
});

static INPUT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(INPUT_SELECTOR_STR).expect("Failed to parse input selector - this is a bug")
});

/// One `<input>` of the login form, with its DOM-resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    /// The `name` attribute, empty when absent.
    pub name: String,
    /// The `type` attribute, `text` when absent (the DOM default).
    pub input_type: String,
    /// The resolved value: the `value` attribute, `on` for a checkbox
    /// without one, empty otherwise.
    pub value: String,
}

/// The extracted login form, ready to be filled and submitted.
///
/// `action` is the raw attribute value; resolution against the page URL is
/// the submitter's job. Input names need not be unique; when converted to a
/// field mapping, later duplicates override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Raw `action` attribute, `about:blank` when absent.
    pub action: String,
    /// Lower-cased `method` attribute, `get` when absent.
    pub method: String,
    /// All descendant inputs in document order.
    pub inputs: Vec<FormInput>,
}

/// Extracts the form enclosing the document's password input.
///
/// Fails with [`HtmlApiError::FormNotFound`] when the document has no
/// password input at all, or when the password input has no enclosing form;
/// the two cases carry distinguishable messages.
pub fn extract_login_form(html: &str) -> Result<LoginForm, HtmlApiError> {
    let document = Html::parse_document(html);

    let password = document
        .select(&PASSWORD_INPUT_SELECTOR)
        .next()
        .ok_or_else(|| HtmlApiError::FormNotFound {
            reason: "input[type=password] not found".to_string(),
        })?;
    let form = enclosing_form(password).ok_or_else(|| HtmlApiError::FormNotFound {
        reason: "parent form of input[type=password] not found".to_string(),
    })?;

    let action = form
        .value()
        .attr("action")
        .unwrap_or("about:blank")
        .to_string();
    let method = form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_ascii_lowercase();
    let inputs = form
        .select(&INPUT_SELECTOR)
        .map(|input| FormInput {
            name: input.value().attr("name").unwrap_or_default().to_string(),
            input_type: input.value().attr("type").unwrap_or("text").to_string(),
            value: resolved_value(input),
        })
        .collect();

    Ok(LoginForm {
        action,
        method,
        inputs,
    })
}

fn enclosing_form<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
}

/// The DOM-resolved value of an input: checkboxes default to `on`, everything
/// else to the empty string.
fn resolved_value(input: ElementRef) -> String {
    match input.value().attr("value") {
        Some(value) => value.to_string(),
        None
            if input
                .value()
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) =>
        {
            "on".to_string()
        }
        None => String::new(),
    }
}
