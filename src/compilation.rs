// The per-document working state threaded through parsing, analysis,
// and compilation: the document itself, its tree overlay, and any
// errors accumulated along the way.

use std::rc::Rc;

use crate::document::Document;
use crate::error::CompileException;
use crate::tree::{Forest, TreeId};

pub struct Compilation {
    pub document: Rc<Document>,
    pub forest: Forest,
    pub root: TreeId,
    pub errors: Vec<CompileException>,
}

impl Compilation {
    pub fn new(document: Rc<Document>) -> Compilation {
        let mut forest = Forest::new();
        let length = document.length().unwrap_or(0);
        let root = forest.root(document.clone(), length);
        Compilation {
            document,
            forest,
            root,
            errors: Vec::new(),
        }
    }

    pub fn fail(&mut self, error: CompileException) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
