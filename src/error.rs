// Error types raised across the pipeline, plus the diagnostic
// formatter the outermost driver uses to render them.
//
// Kept as plain enums with hand-written `Display`, the way the
// teacher's `vm::Error`/`typechecker::TypeError` are, rather than
// reaching for a derive-macro error crate.

use std::fmt;

use crate::tree::TreeId;

/// Raised during parsing, analysis, or compilation. Carries the tree
/// node responsible, when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileException {
    pub message: String,
    pub tree: Option<TreeId>,
}

impl CompileException {
    pub fn new(message: impl Into<String>) -> CompileException {
        CompileException {
            message: message.into(),
            tree: None,
        }
    }

    pub fn at(message: impl Into<String>, tree: TreeId) -> CompileException {
        CompileException {
            message: message.into(),
            tree: Some(tree),
        }
    }
}

impl fmt::Display for CompileException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree {
            Some(id) => write!(f, "compile error at tree #{}: {}", id, self.message),
            None => write!(f, "compile error: {}", self.message),
        }
    }
}
impl std::error::Error for CompileException {}

/// Raised while executing an instruction tree. Carries the offending
/// instruction's source tree, when one was attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionException {
    pub message: String,
    pub tree: Option<TreeId>,
}

impl ExecutionException {
    pub fn new(message: impl Into<String>) -> ExecutionException {
        ExecutionException {
            message: message.into(),
            tree: None,
        }
    }

    pub fn at(message: impl Into<String>, tree: TreeId) -> ExecutionException {
        ExecutionException {
            message: message.into(),
            tree: Some(tree),
        }
    }
}

impl fmt::Display for ExecutionException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree {
            Some(id) => write!(f, "execution error at tree #{}: {}", id, self.message),
            None => write!(f, "execution error: {}", self.message),
        }
    }
}
impl std::error::Error for ExecutionException {}

/// Raised by document I/O. Carries no source position: the failure
/// happens before any tree exists.
#[derive(Debug, Clone, PartialEq)]
pub struct IOError(pub String);

impl fmt::Display for IOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I/O error: {}", self.0)
    }
}
impl std::error::Error for IOError {}

/// Render a batch of accumulated parse/analyze errors the way the
/// outermost driver's `diagnostic()` would. Rendering destinations
/// (terminal, file, structured log) are a caller concern; this only
/// produces the text.
pub fn diagnostic(errors: &[CompileException]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}: {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_every_error() {
        let errors = vec![
            CompileException::new("missing components"),
            CompileException::at("unclosed if context", 3),
        ];
        let rendered = diagnostic(&errors);
        assert!(rendered.contains("missing components"));
        assert!(rendered.contains("tree #3"));
    }

    #[test]
    fn diagnostic_of_no_errors_is_empty() {
        assert_eq!(diagnostic(&[]), "");
    }
}
