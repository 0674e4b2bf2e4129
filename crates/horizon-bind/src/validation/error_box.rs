//! Error display surface.

use std::sync::Arc;

use super::element::ElementId;

/// A surface that shows a validation message next to an element.
pub trait ErrorDisplay: Send + Sync {
    /// Make the display visible.
    fn show(&mut self);
    /// Hide the display.
    fn hide(&mut self);
    /// Set the message text.
    fn set_message(&mut self, message: &str);
    /// The message text.
    fn message(&self) -> String;
    /// Whether the display is visible.
    fn is_visible(&self) -> bool;
    /// The element the display is attached to.
    fn host(&self) -> Option<ElementId>;
    /// Attach the display to an element.
    fn set_host(&mut self, host: Option<ElementId>);
}

/// Creates error displays for a validation group.
pub type ErrorBoxFactory = Arc<dyn Fn() -> Box<dyn ErrorDisplay> + Send + Sync>;

/// Returns a factory producing [`ErrorBox`]es.
pub fn default_error_box_factory() -> ErrorBoxFactory {
    Arc::new(|| Box::new(ErrorBox::default()) as Box<dyn ErrorDisplay>)
}

/// Headless error display that only keeps state.
///
/// Messages of the form `title;message` are split at the first `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBox {
    message: String,
    visible: bool,
    host: Option<ElementId>,
}

impl ErrorBox {
    /// The title part of the message, if it has one.
    pub fn title(&self) -> Option<&str> {
        self.message.split_once(';').map(|(title, _)| title)
    }

    /// The message without its title.
    pub fn body(&self) -> &str {
        self.message
            .split_once(';')
            .map_or(self.message.as_str(), |(_, body)| body)
    }
}

impl ErrorDisplay for ErrorBox {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn host(&self) -> Option<ElementId> {
        self.host
    }

    fn set_host(&mut self, host: Option<ElementId>) {
        self.host = host;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_body() {
        let mut error_box = ErrorBox::default();
        error_box.set_message("Phone;Incorrect phone number entered");
        assert_eq!(error_box.title(), Some("Phone"));
        assert_eq!(error_box.body(), "Incorrect phone number entered");

        error_box.set_message("Required");
        assert_eq!(error_box.title(), None);
        assert_eq!(error_box.body(), "Required");
    }

    #[test]
    fn test_factory_creates_hidden_boxes() {
        let factory = default_error_box_factory();
        let mut display = factory();
        assert!(!display.is_visible());
        display.show();
        assert!(display.is_visible());
        assert_eq!(display.host(), None);
    }
}
