//! Handler for `UserDeleted` events: renders a goodbye email.

use super::{render, required_field};
use crate::event::Event;
use crate::registry::{EventHandler, HandlerError};
use std::fs;
use std::io;
use std::path::PathBuf;

const EVENT_TYPE: &str = "UserDeleted";
const TEMPLATE_PATH: &str = "templates/goodbye_client_template.html";

/// Fallback for the optional `type` field.
const DEFAULT_USER_TYPE: &str = "client";

const EMPLOYEE_GOODBYE: &str = "Thank you for the work you have done with our team. \
    We wish you every success in your future projects. Please keep in touch!";
const CLIENT_GOODBYE: &str = "We are deleting your account at your request. \
    Thank you for being a customer of our store. If you ever want to open a new \
    account, do not hesitate to contact us.";

/// Renders a goodbye email for each deleted user.
///
/// Requires `id`, `name`, `email` and `datetime` on the event. The optional
/// `type` field selects the goodbye wording (`"employee"` gets a farewell,
/// anything else the customer message) and defaults to `"client"`. Writes
/// `goodbye_<id>.html` into the output directory.
pub struct UserDeletedHandler {
    output_dir: PathBuf,
    template_path: PathBuf,
}

impl UserDeletedHandler {
    /// Create a handler writing into `output_dir`, creating the directory if
    /// it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            template_path: PathBuf::from(TEMPLATE_PATH),
        })
    }
}

impl EventHandler for UserDeletedHandler {
    fn event_type(&self) -> &'static str {
        EVENT_TYPE
    }

    fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let user_id = required_field(event, EVENT_TYPE, "id")?;
        let name = required_field(event, EVENT_TYPE, "name")?;
        let email = required_field(event, EVENT_TYPE, "email")?;
        let datetime = required_field(event, EVENT_TYPE, "datetime")?;
        let user_type = event
            .get_as_string("type")
            .unwrap_or_else(|| DEFAULT_USER_TYPE.to_string());

        let goodbye_message = if user_type.eq_ignore_ascii_case("employee") {
            EMPLOYEE_GOODBYE
        } else {
            CLIENT_GOODBYE
        };

        let template =
            fs::read_to_string(&self.template_path).map_err(|source| HandlerError::TemplateRead {
                path: self.template_path.clone(),
                source,
            })?;

        let html = render(
            &template,
            &[
                ("user_id", user_id.as_str()),
                ("name", name.as_str()),
                ("email", email.as_str()),
                ("deletion_date", datetime.as_str()),
                ("goodbye_message", goodbye_message),
            ],
        );

        let path = self.output_dir.join(format!("goodbye_{user_id}.html"));
        fs::write(&path, html).map_err(|source| HandlerError::OutputWrite {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            user_id = %user_id,
            name = %name,
            user_type = %user_type,
            path = %path.display(),
            "Goodbye email rendered"
        );
        Ok(())
    }
}
