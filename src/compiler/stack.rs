use tracing::trace;

/// Operand stack of the constant evaluator.
///
/// Besides values it carries the evaluation's `resolved` flag: once an operand turns
/// out not to be a compile-time constant the flag drops, and it stays down until the
/// evaluation that owns it restores it.
#[derive(Debug)]
pub(crate) struct ValueStack {
    values: Vec<u32>,
    resolved: bool,
}

impl Default for ValueStack {
    fn default() -> Self {
        ValueStack { values: Vec::new(), resolved: true }
    }
}

impl ValueStack {
    pub fn push(&mut self, value: u32) {
        trace!(value, depth = self.values.len(), "push");
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<u32> {
        self.values.pop()
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.values.truncate(depth);
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn mark_unresolved(&mut self) {
        self.resolved = false;
    }

    /// Start a fresh evaluation, returning the flag it replaces.
    pub fn begin(&mut self) -> bool {
        std::mem::replace(&mut self.resolved, true)
    }

    pub fn restore(&mut self, resolved: bool) {
        self.resolved = resolved;
    }
}
