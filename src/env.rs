// Compilation-scoped bindings: which document's compiled instruction
// tree backs which name, for `Instruction::Import` to resolve against.
//
// Mutated only between phases -- never while an instruction tree is
// mid-execution -- matching the single-threaded, synchronous
// scheduling model the rest of the pipeline assumes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::vm::Instruction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    compilations: HashMap<String, Instruction>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            compilations: HashMap::new(),
        }
    }

    /// Bind `name` (a document name) to its compiled root instruction.
    pub fn register(&mut self, name: impl Into<String>, instruction: Instruction) {
        self.compilations.insert(name.into(), instruction);
    }

    pub fn get(&self, name: &str) -> Option<&Instruction> {
        self.compilations.get(name)
    }
}
