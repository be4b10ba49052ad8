/// Tab stops used when measuring indentation.
pub const TAB_WIDTH: u32 = 8;

/// Maps byte offsets to line/column positions within source text.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { line_starts }
    }

    /// Returns (line, col), both 1-based. Columns count bytes.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = self.line_index(offset);
        let col = offset.saturating_sub(self.line_starts[line]);
        (line + 1, col + 1)
    }

    /// 0-based display column of `offset`, with tabs advancing to the next multiple of [`TAB_WIDTH`].
    /// Block structure is decided on this column.
    pub fn expanded_column(&self, source: &str, offset: usize) -> u32 {
        let start = self.line_starts[self.line_index(offset)];
        let end = offset.min(source.len());
        let mut column = 0u32;
        for ch in source[start..end].chars() {
            if ch == '\t' {
                column = (column / TAB_WIDTH + 1) * TAB_WIDTH;
            } else {
                column += 1;
            }
        }
        column
    }

    /// Returns the full text of the given 1-based line number.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = if line < self.line_starts.len() {
            self.line_starts[line]
        } else {
            source.len()
        };
        let text = &source[start..end];
        text.trim_end_matches('\n').trim_end_matches('\r')
    }

    fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }
}
