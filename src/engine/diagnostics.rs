//! The scoped parse log.
//!
//! Resolving one line drives dozens of candidate patterns, almost all of which
//! fail; their messages must not reach the script author. Every candidate
//! attempt therefore runs inside a *scope*:
//!
//! - messages emitted inside a scope stay pending;
//! - a failing scope is discarded — pending messages are dropped, and only its
//!   best error survives as a *candidate*, and only if it outranks the best
//!   candidate already recorded for the enclosing attempt;
//! - a succeeding scope is committed — its pending messages become part of the
//!   enclosing region and its error candidate is dropped.
//!
//! When nothing succeeds, the caller surfaces exactly one error: the highest
//! [`ErrorQuality`] seen anywhere in the attempt, attributed to the line.

/// Message level. Errors additionally carry an [`ErrorQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// How specific an error is. When several candidates fail, only the
/// highest-quality message is shown; ties keep the earliest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorQuality {
    /// No information beyond "did not match".
    None,
    /// The text is not an expression of the wanted kind.
    NotAnExpression,
    /// The statement as a whole was not understood.
    CannotUnderstand,
    /// The structure matched but the meaning is wrong; most specific.
    Semantic,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: Severity,
    pub quality: ErrorQuality,
    pub message: String,
    pub line: Option<usize>,
}

impl LogEntry {
    pub fn error(message: impl Into<String>, quality: ErrorQuality) -> Self {
        LogEntry { severity: Severity::Error, quality, message: message.into(), line: None }
    }
}

#[derive(Debug, Default)]
struct Frame {
    start: usize,
    best: Option<LogEntry>,
}

/// The parse log for one resolution call. Owned by the caller and passed down
/// explicitly; the engine never logs through shared state.
#[derive(Debug, Default)]
pub struct ParseLog {
    entries: Vec<LogEntry>,
    frames: Vec<Frame>,
    line: Option<usize>,
}

impl ParseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the line number stamped onto subsequent entries.
    pub fn set_line(&mut self, line: Option<usize>) {
        self.line = line;
    }

    pub fn open_scope(&mut self) {
        self.frames.push(Frame { start: self.entries.len(), best: None });
    }

    /// Number of open scopes. Zero once a resolution call has fully unwound.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, ErrorQuality::None, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, ErrorQuality::None, message.into());
    }

    /// Records an error candidate for the innermost scope. Outside any scope
    /// the error is committed directly.
    pub fn error(&mut self, message: impl Into<String>, quality: ErrorQuality) {
        let entry = LogEntry { severity: Severity::Error, quality, message: message.into(), line: self.line };
        match self.frames.last_mut() {
            Some(frame) => Self::offer(&mut frame.best, entry),
            None => self.entries.push(entry),
        }
    }

    /// Drops the innermost scope's pending messages while keeping its error
    /// candidate. Used between sibling attempts that share one scope.
    pub fn clear(&mut self) {
        let start = self.frames.last().map_or(0, |f| f.start);
        self.entries.truncate(start);
    }

    /// Closes the innermost scope as successful: pending messages survive into
    /// the enclosing region, the error candidate is dropped.
    pub fn commit(&mut self) {
        debug_assert!(!self.frames.is_empty(), "commit without open scope");
        self.frames.pop();
    }

    /// Closes the innermost scope as failed without surfacing anything.
    pub fn discard(&mut self) {
        debug_assert!(!self.frames.is_empty(), "discard without open scope");
        if let Some(frame) = self.frames.pop() {
            self.entries.truncate(frame.start);
        }
    }

    /// Closes the innermost scope as failed, surfacing its best error (or the
    /// given fallback) to the enclosing scope — or to the committed log when
    /// this was the outermost scope.
    pub fn discard_error(&mut self, fallback: Option<LogEntry>) {
        debug_assert!(!self.frames.is_empty(), "discard_error without open scope");
        let Some(frame) = self.frames.pop() else { return };
        self.entries.truncate(frame.start);
        let mut best = frame.best;
        if let Some(mut entry) = fallback {
            entry.line = entry.line.or(self.line);
            Self::offer(&mut best, entry);
        }
        let Some(best) = best else { return };
        match self.frames.last_mut() {
            Some(parent) => Self::offer(&mut parent.best, best),
            None => self.entries.push(best),
        }
    }

    /// The innermost scope's current error candidate.
    pub fn current_error(&self) -> Option<&LogEntry> {
        self.frames.last().and_then(|f| f.best.as_ref())
    }

    pub fn has_error(&self) -> bool {
        self.current_error().is_some()
    }

    /// Committed entries so far.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Drains the committed entries; call once all scopes are closed.
    pub fn take_entries(&mut self) -> Vec<LogEntry> {
        debug_assert!(self.frames.is_empty(), "taking entries with open scopes");
        std::mem::take(&mut self.entries)
    }

    fn push(&mut self, severity: Severity, quality: ErrorQuality, message: String) {
        self.entries.push(LogEntry { severity, quality, message, line: self.line });
    }

    /// Keeps the better of the held and offered entries; ties keep the held
    /// one, so the earliest message of a given quality wins.
    fn offer(held: &mut Option<LogEntry>, entry: LogEntry) {
        let replace = match held {
            Some(current) => entry.quality > current.quality,
            None => true,
        };
        if replace {
            *held = Some(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_scope_keeps_only_best_error() {
        let mut log = ParseLog::new();
        log.open_scope();
        for i in 0..4 {
            log.open_scope();
            log.warning(format!("noise {i}"));
            log.error(format!("shallow {i}"), ErrorQuality::NotAnExpression);
            log.discard_error(None);
        }
        log.open_scope();
        log.error("the deep one", ErrorQuality::Semantic);
        log.discard_error(None);
        log.discard_error(Some(LogEntry::error("fallback", ErrorQuality::CannotUnderstand)));

        assert_eq!(log.depth(), 0);
        let entries = log.take_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "the deep one");
        assert_eq!(entries[0].quality, ErrorQuality::Semantic);
    }

    #[test]
    fn quality_selection_ignores_attempt_order() {
        // The high-quality candidate arrives in the middle; order must not matter.
        let mut log = ParseLog::new();
        log.open_scope();
        let qualities = [
            ErrorQuality::None,
            ErrorQuality::NotAnExpression,
            ErrorQuality::Semantic,
            ErrorQuality::NotAnExpression,
            ErrorQuality::None,
        ];
        for (i, q) in qualities.into_iter().enumerate() {
            log.open_scope();
            log.error(format!("candidate {i}"), q);
            log.discard_error(None);
        }
        log.discard_error(None);
        let entries = log.take_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "candidate 2");
    }

    #[test]
    fn committed_scope_surfaces_warnings_and_drops_error_candidate() {
        let mut log = ParseLog::new();
        log.open_scope();
        log.error("rejected attempt", ErrorQuality::Semantic);
        log.clear();
        log.warning("kept warning");
        log.commit();

        let entries = log.take_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[0].message, "kept warning");
    }

    #[test]
    fn clear_drops_pending_but_keeps_candidate() {
        let mut log = ParseLog::new();
        log.open_scope();
        log.warning("pending");
        log.error("candidate", ErrorQuality::CannotUnderstand);
        log.clear();
        assert!(log.has_error());
        log.discard_error(None);
        let entries = log.take_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "candidate");
    }

    #[test]
    fn line_attribution() {
        let mut log = ParseLog::new();
        log.set_line(Some(7));
        log.open_scope();
        log.error("boom", ErrorQuality::Semantic);
        log.discard_error(None);
        let entries = log.take_entries();
        assert_eq!(entries[0].line, Some(7));
    }
}
