//! Concrete handlers for the user lifecycle events.
//!
//! Each handler renders one HTML email per event by literal placeholder
//! substitution (`{{field}}` tokens) into a static template file, then writes
//! the result into its configured output directory.

mod user_created;
mod user_deleted;

pub use user_created::UserCreatedHandler;
pub use user_deleted::UserDeletedHandler;

use crate::event::Event;
use crate::registry::HandlerError;

/// Substitute `{{key}}` tokens in a template.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut html = template.to_string();
    for (key, value) in substitutions {
        html = html.replace(&format!("{{{{{key}}}}}"), value);
    }
    html
}

/// Read a required field as display text, surfacing its absence as a
/// [`HandlerError::MissingField`].
fn required_field(
    event: &Event,
    event_type: &'static str,
    field: &'static str,
) -> Result<String, HandlerError> {
    event
        .get_as_string(field)
        .ok_or(HandlerError::MissingField { event_type, field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_substitutes_all_tokens() {
        let html = render(
            "<p>{{name}} ({{id}}) {{name}}</p>",
            &[("name", "Ada"), ("id", "42")],
        );
        assert_eq!(html, "<p>Ada (42) Ada</p>");
    }

    #[test]
    fn render_leaves_unknown_tokens_untouched() {
        let html = render("{{name}} {{other}}", &[("name", "Ada")]);
        assert_eq!(html, "Ada {{other}}");
    }

    #[test]
    fn required_field_reports_the_missing_key() {
        let event = match json!({"id": 1}) {
            serde_json::Value::Object(fields) => Event::new(fields),
            _ => unreachable!(),
        };

        let result = required_field(&event, "UserCreated", "email");
        assert!(matches!(
            result,
            Err(HandlerError::MissingField {
                event_type: "UserCreated",
                field: "email",
            })
        ));
    }
}
