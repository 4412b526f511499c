use std::time::Duration;

/// Default delay between the pointer entering a token and the hover lookup.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Default CSS class applied to the highlighted line's code cell.
pub const DEFAULT_HIGHLIGHT_CLASS: &str = "highlighted";

/// Default gap, in pixels, kept between a token and its overlay.
pub const DEFAULT_OVERLAY_MARGIN: f64 = 8.0;

/// Options for a document view.
///
/// Use [`ViewOptions::builder()`] to construct an instance.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ViewOptions {
    pub debounce: Duration,
    pub highlight_class: String,
    pub overlay_margin: f64,
    /// Scroll a line selected from the URL into the middle of the view.
    pub scroll_on_select: bool,
    /// Strict mode: refuse to build a view whose line table does not
    /// reproduce the source text instead of logging and continuing.
    pub strict: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            highlight_class: DEFAULT_HIGHLIGHT_CLASS.to_string(),
            overlay_margin: DEFAULT_OVERLAY_MARGIN,
            scroll_on_select: true,
            strict: true,
        }
    }
}

impl ViewOptions {
    /// Create a new `ViewOptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use blobview::ViewOptions;
    ///
    /// let options = ViewOptions::builder()
    ///     .with_debounce(Duration::from_millis(100))
    ///     .with_highlight_class("selected")
    ///     .build();
    /// assert_eq!(options.highlight_class, "selected");
    /// ```
    #[must_use]
    pub fn builder() -> ViewOptionsBuilder {
        ViewOptionsBuilder::default()
    }
}

/// Builder for [`ViewOptions`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ViewOptionsBuilder {
    options: ViewOptions,
}

impl ViewOptionsBuilder {
    /// Set the hover debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.options.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_highlight_class(mut self, class: impl Into<String>) -> Self {
        self.options.highlight_class = class.into();
        self
    }

    #[must_use]
    pub fn with_overlay_margin(mut self, margin: f64) -> Self {
        self.options.overlay_margin = margin;
        self
    }

    /// Do not scroll lines selected from the URL into view.
    #[must_use]
    pub fn without_scroll(mut self) -> Self {
        self.options.scroll_on_select = false;
        self
    }

    /// Log source mismatches instead of failing the build.
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.options.strict = false;
        self
    }

    #[must_use]
    pub fn build(self) -> ViewOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(ViewOptions::builder().build(), ViewOptions::default());
    }

    #[test]
    fn builder_overrides() {
        let options = ViewOptions::builder()
            .with_debounce(Duration::ZERO)
            .with_overlay_margin(2.0)
            .without_scroll()
            .lenient()
            .build();
        assert_eq!(options.debounce, Duration::ZERO);
        assert!(!options.scroll_on_select);
        assert!(!options.strict);
        assert!((options.overlay_margin - 2.0).abs() < f64::EPSILON);
    }
}
