// The extension surface. A `Spec` bundles whichever of
// `{parser, analyzer, compiler, processor}` a dialect contributes;
// a `Registry` folds an ordered list of them into the combined chains
// the rest of the pipeline drives. This is the *only* way new syntax
// is added -- the crate ships no catalog of concrete dialects beyond
// the minimal bundle assembled under test configuration.

use crate::analyzer::Analyzer;
use crate::compilation::Compilation;
use crate::compiler::Compiler;
use crate::parser::Parser;
use crate::tree::TreeId;

/// A post-execution hook a spec may contribute, e.g. to post-process a
/// memory's console text before it is handed back to the caller.
pub trait Processor {
    fn process(&self, console: String) -> String;
}

/// Zero or more of the four collaborator roles. `None` in a slot means
/// this spec does not participate in that phase.
pub struct Spec {
    pub name: String,
    pub parser: Option<Box<dyn Parser>>,
    pub analyzer: Option<Box<dyn Analyzer>>,
    pub compiler: Option<Box<dyn Compiler>>,
    pub processor: Option<Box<dyn Processor>>,
}

impl Spec {
    pub fn named(name: impl Into<String>) -> Spec {
        Spec {
            name: name.into(),
            parser: None,
            analyzer: None,
            compiler: None,
            processor: None,
        }
    }

    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Spec {
        self.parser = Some(Box::new(parser));
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Spec {
        self.analyzer = Some(Box::new(analyzer));
        self
    }

    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Spec {
        self.compiler = Some(Box::new(compiler));
        self
    }

    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Spec {
        self.processor = Some(Box::new(processor));
        self
    }
}

/// An ordered collection of specs. Order matters for compiler fallback:
/// specs registered earlier get first refusal on every tree.
#[derive(Default)]
pub struct Registry {
    specs: Vec<Spec>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry { specs: Vec::new() }
    }

    pub fn add(&mut self, spec: Spec) -> &mut Registry {
        self.specs.push(spec);
        self
    }

    /// Run every registered parser across the whole subtree once. A
    /// caller typically wraps this in `parser::parse_to_fixed_point`.
    pub fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for spec in &self.specs {
            if let Some(parser) = &spec.parser {
                if parser.parse(compilation, tree) {
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for spec in &self.specs {
            if let Some(analyzer) = &spec.analyzer {
                if analyzer.analyze(compilation, tree) {
                    changed = true;
                }
            }
        }
        changed
    }

    /// First registered spec whose compiler accepts `tree` wins.
    pub fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<crate::vm::Instruction> {
        for spec in &self.specs {
            if let Some(compiler) = &spec.compiler {
                if let Some(instruction) = compiler.compile(compilation, tree) {
                    return Some(instruction);
                }
            }
        }
        None
    }

    pub fn process(&self, mut console: String) -> String {
        for spec in &self.specs {
            if let Some(processor) = &spec.processor {
                console = processor.process(console);
            }
        }
        console
    }
}
