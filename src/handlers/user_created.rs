//! Handler for `UserCreated` events: renders a welcome email.

use super::{render, required_field};
use crate::event::Event;
use crate::registry::{EventHandler, HandlerError};
use std::fs;
use std::io;
use std::path::PathBuf;

const EVENT_TYPE: &str = "UserCreated";
const TEMPLATE_PATH: &str = "templates/welcome_client_template.html";

/// Renders a welcome email for each newly created user.
///
/// Requires `id`, `name`, `email` and `datetime` on the event; writes
/// `welcome_<id>.html` into the output directory.
pub struct UserCreatedHandler {
    output_dir: PathBuf,
    template_path: PathBuf,
}

impl UserCreatedHandler {
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

impl EventHandler for UserCreatedHandler {
    fn event_type(&self) -> &'static str {
        EVENT_TYPE
    }

    fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        let user_id = required_field(event, EVENT_TYPE, "id")?;
        let name = required_field(event, EVENT_TYPE, "name")?;
        let email = required_field(event, EVENT_TYPE, "email")?;
        let datetime = required_field(event, EVENT_TYPE, "datetime")?;

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
                ("creation_date", datetime.as_str()),
            ],
        );

        let path = self.output_dir.join(format!("welcome_{user_id}.html"));
        fs::write(&path, html).map_err(|source| HandlerError::OutputWrite {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            user_id = %user_id,
            name = %name,
            path = %path.display(),
            "Welcome email rendered"
        );
        Ok(())
    }
}
