/// Line-oriented source writer with four-space indentation.
#[derive(Debug, Default)]
pub(crate) struct Emitter {
    code: String,
    indent: usize,
}

impl Emitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        if line.is_empty() {
            self.code.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.code.push_str("    ");
        }
        self.code.push_str(line);
        self.code.push('\n');
    }

    /// Writes `line` and indents what follows.
    pub(crate) fn open(&mut self, line: &str) {
        self.push_line(line);
        self.indent += 1;
    }

    /// Dedents and writes `line`.
    pub(crate) fn close(&mut self, line: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.push_line(line);
    }

    pub(crate) fn blank(&mut self) {
        if !self.code.is_empty() && !self.code.ends_with("\n\n") && !self.code.ends_with("{\n") {
            self.code.push('\n');
        }
    }

    pub(crate) fn finish(mut self) -> String {
        while self.code.ends_with("\n\n") {
            self.code.pop();
        }
        if !self.code.ends_with('\n') {
            self.code.push('\n');
        }
        self.code
    }
}
