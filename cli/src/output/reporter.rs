//! `TerminalSink` — presentation-layer implementation of `OutputSink`.
//!
//! Services write their transcript through the `OutputSink` port; this sink
//! forwards it to the terminal. With `--json` the transcript goes to stderr so
//! stdout carries only the JSON document.

use std::io::Write as _;

use owo_colors::OwoColorize as _;

use crate::application::ports::OutputSink;
use crate::output::OutputContext;

/// Terminal transcript sink that wraps an `OutputContext`.
///
/// Suppressed entirely when `ctx.quiet`. A leading `[host]` prefix is styled
/// with `styles.host`; everything else is written verbatim.
pub struct TerminalSink<'a> {
    ctx: &'a OutputContext,
    to_stderr: bool,
}

impl<'a> TerminalSink<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext, to_stderr: bool) -> Self {
        Self { ctx, to_stderr }
    }

    pub(crate) fn render(&self, text: &str) -> String {
        if let Some(rest) = text.strip_prefix('[')
            && let Some((host, tail)) = rest.split_once(']')
        {
            let prefix = format!("[{host}]");
            return format!("{}{tail}", prefix.style(self.ctx.styles.host));
        }
        text.to_owned()
    }
}

impl OutputSink for TerminalSink<'_> {
    fn write_output(&self, text: &str) {
        if self.ctx.quiet {
            return;
        }
        let rendered = self.render(text);
        if self.to_stderr {
            let mut err = std::io::stderr().lock();
            let _ = err.write_all(rendered.as_bytes());
            let _ = err.flush();
        } else {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(rendered.as_bytes());
            let _ = out.flush();
        }
    }
}
