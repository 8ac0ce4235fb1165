//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`], which handles format
//! switching so command handlers stay format-agnostic.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Writes command payloads as text or JSON.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to `w`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        phase: String,
        count: u32,
    }

    impl Render for Payload {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "Phase: {}", self.phase)?;
            writeln!(w, "Count: {}", self.count)
        }
    }

    fn payload() -> Payload {
        Payload {
            phase: "enable-dr".to_owned(),
            count: 3,
        }
    }

    #[test]
    fn text_format_uses_render() {
        let mut buf = Vec::new();
        OutputWriter::new(OutputFormat::Text)
            .render_to(&payload(), &mut buf)
            .expect("text rendering should succeed");
        let out = String::from_utf8(buf).expect("valid UTF-8");
        assert_eq!(out, "Phase: enable-dr\nCount: 3\n");
    }

    #[test]
    fn json_format_is_pretty_and_newline_terminated() {
        let mut buf = Vec::new();
        OutputWriter::new(OutputFormat::Json)
            .render_to(&payload(), &mut buf)
            .expect("json rendering should succeed");
        let out = String::from_utf8(buf).expect("valid UTF-8");
        assert!(out.ends_with("}\n"));
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
        assert_eq!(parsed["phase"], "enable-dr");
        assert_eq!(parsed["count"], 3);
    }
}
