//! Rendering state and the targets that display it

use std::io::Write;

use serde::Serialize;

/// The two display slots refreshed on every submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderState {
    /// Response body, pretty-printed when it is JSON
    pub output: String,
    /// Validation, parse, network or HTTP status summary
    pub error: String,
}

impl RenderState {
    /// Both slots empty
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Placeholder shown while a request is in flight
    #[must_use]
    pub fn sending(endpoint: &str) -> Self {
        Self {
            output: format!("Sending request to {endpoint}..."),
            error: String::new(),
        }
    }

    /// Output only, no error
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: String::new(),
        }
    }

    /// Error only, output cleared
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            error: error.into(),
        }
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Somewhere a [`RenderState`] can be shown.
pub trait RenderTarget {
    /// Replace both slots
    fn render(&mut self, state: &RenderState);

    /// Show the in-flight placeholder. It also clears any earlier error.
    fn render_sending(&mut self, placeholder: &RenderState) {
        self.render(placeholder);
    }

    /// Rejected input: the error slot is replaced, the output slot is left
    /// as it was
    fn render_input_error(&mut self, message: &str);
}

/// Writes the output slot to stdout and the error slot to stderr
pub struct TerminalRenderer<O: Write, E: Write> {
    out: O,
    err: E,
    show_progress: bool,
}

impl TerminalRenderer<std::io::Stdout, std::io::Stderr> {
    #[must_use]
    pub fn stdio(show_progress: bool) -> Self {
        Self::new(std::io::stdout(), std::io::stderr(), show_progress)
    }
}

impl<O: Write, E: Write> TerminalRenderer<O, E> {
    /// With `show_progress` unset the "sending" placeholder is swallowed so
    /// piped output only ever contains the response.
    pub fn new(out: O, err: E, show_progress: bool) -> Self {
        Self {
            out,
            err,
            show_progress,
        }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

// Terminal writes are best effort; a closed pipe must not abort the submission
impl<O: Write, E: Write> RenderTarget for TerminalRenderer<O, E> {
    fn render(&mut self, state: &RenderState) {
        if !state.error.is_empty() {
            let _ = writeln!(self.err, "{}", state.error);
        }
        if !state.output.is_empty() {
            let _ = writeln!(self.out, "{}", state.output);
        }
    }

    fn render_sending(&mut self, placeholder: &RenderState) {
        if self.show_progress {
            let _ = writeln!(self.err, "{}", placeholder.output);
        }
    }

    fn render_input_error(&mut self, message: &str) {
        let _ = writeln!(self.err, "{message}");
    }
}

/// Keeps every state it was shown, newest last
#[derive(Debug, Default, Clone)]
pub struct RecordingTarget {
    pub history: Vec<RenderState>,
}

impl RecordingTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What a page would currently show
    #[must_use]
    pub fn current(&self) -> RenderState {
        self.history.last().cloned().unwrap_or_default()
    }
}

impl RenderTarget for RecordingTarget {
    fn render(&mut self, state: &RenderState) {
        self.history.push(state.clone());
    }

    fn render_input_error(&mut self, message: &str) {
        let state = RenderState {
            output: self.current().output,
            error: message.to_string(),
        };
        self.history.push(state);
    }
}
