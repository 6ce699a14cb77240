pub mod autodoc;
pub mod deprecation;
pub mod stubs;

pub use autodoc::{AutodocBuilder, BuildResult};
pub use deprecation::{DeprecationCandidate, DeprecationManager, DeprecationPlan};
pub use stubs::StubGenerator;

/// Footer appended to every generated markdown page.
pub(crate) const GENERATED_FOOTER: &str = "*Generated by Ultrathink Documentation System";

/// Line-oriented markdown buffer.
#[derive(Default)]
pub(crate) struct Markdown {
    buf: String,
}

impl Markdown {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
        self
    }

    pub(crate) fn blank(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    /// `## title` followed by a blank line.
    pub(crate) fn heading(&mut self, level: usize, title: impl AsRef<str>) -> &mut Self {
        self.line(format!("{} {}", "#".repeat(level), title.as_ref()))
            .blank()
    }

    /// Paragraph followed by a blank line.
    pub(crate) fn para(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text).blank()
    }

    pub(crate) fn code(&mut self, lang: &str, body: impl AsRef<str>) -> &mut Self {
        self.line(format!("```{lang}"))
            .line(body)
            .line("```")
            .blank()
    }

    pub(crate) fn footer(&mut self, timestamp: Option<&str>) -> &mut Self {
        self.line("---");
        match timestamp {
            Some(ts) => self.line(format!("{GENERATED_FOOTER} on {ts}*")),
            None => self.line(format!("{GENERATED_FOOTER}*")),
        }
    }

    pub(crate) fn finish(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_builder_layout() {
        let mut md = Markdown::new();
        md.heading(1, "Title").para("Body").code("python", "x = 1").footer(None);
        assert_eq!(
            md.finish(),
            concat!(
                "# Title\n\nBody\n\n```python\nx = 1\n```\n\n",
                "---\n*Generated by Ultrathink Documentation System*\n",
            )
        );
    }
}
