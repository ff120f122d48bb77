// The compiler framework: a single, non-iterated traversal from the
// tree overlay down into an `Instruction` tree. Unlike parsers and
// analyzers this runs exactly once per node, root to leaves.

use crate::compilation::Compilation;
use crate::error::CompileException;
use crate::parser::free_gaps;
use crate::tree::TreeId;
use crate::value::Tag;
use crate::vm::Instruction;

/// `(compilation, tree) -> Some(instruction)` if this compiler knows
/// how to handle `tree`'s kind, `None` otherwise so a fallback chain
/// can try the next one.
pub trait Compiler {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction>;
}

/// Only defers to `inner` when `tree`'s kind is exactly `kind`.
pub struct KindFilter<C> {
    pub kind: String,
    pub inner: C,
}

impl<C> KindFilter<C> {
    pub fn new(kind: impl Into<String>, inner: C) -> KindFilter<C> {
        KindFilter {
            kind: kind.into(),
            inner,
        }
    }
}

impl<C: Compiler> Compiler for KindFilter<C> {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        if compilation.forest.get(tree).kind() == self.kind {
            self.inner.compile(compilation, tree)
        } else {
            None
        }
    }
}

/// Try each sub-compiler in order, returning the first non-`None`
/// result.
pub struct Fallback(pub Vec<Box<dyn Compiler>>);

impl Compiler for Fallback {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        for compiler in &self.0 {
            if let Some(instruction) = compiler.compile(compilation, tree) {
                return Some(instruction);
            }
        }
        None
    }
}

/// Compile every child with `inner` and wrap the results in a `Block`,
/// skipping children `inner` declines (there is nothing more specific
/// to fall back to at this level).
pub struct FirstCompile<C> {
    pub inner: C,
}

impl<C> FirstCompile<C> {
    pub fn new(inner: C) -> FirstCompile<C> {
        FirstCompile { inner }
    }
}

impl<C: Compiler> Compiler for FirstCompile<C> {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let mut instructions = Vec::new();
        for child in compilation.forest.children(tree) {
            if let Some(instruction) = self.inner.compile(compilation, child) {
                instructions.push(instruction);
            }
        }
        Some(Instruction::Block(instructions))
    }
}

/// Compile `tree` itself with `outer`, and every child with `inner`,
/// splicing the children's instructions into `outer`'s result if it is
/// a `Block`, or wrapping both into one otherwise.
pub struct Flatten<Outer, Inner> {
    pub outer: Outer,
    pub inner: Inner,
}

impl<Outer: Compiler, Inner: Compiler> Compiler for Flatten<Outer, Inner> {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let head = self.outer.compile(compilation, tree)?;
        let mut body = Vec::new();
        for child in compilation.forest.children(tree) {
            if let Some(instruction) = self.inner.compile(compilation, child) {
                body.push(instruction);
            }
        }
        if body.is_empty() {
            return Some(head);
        }
        let mut flattened = match head {
            Instruction::Block(items) => items,
            other => vec![other],
        };
        flattened.extend(body);
        Some(Instruction::Block(flattened))
    }
}

/// Wraps a compiler that must succeed; a `None` result becomes a
/// `CompileException` recorded against `tree` and an `Idle` stand-in
/// so the rest of the traversal can proceed.
pub struct Mandatory<C> {
    pub inner: C,
    pub message: String,
}

impl<C> Mandatory<C> {
    pub fn new(inner: C, message: impl Into<String>) -> Mandatory<C> {
        Mandatory {
            inner,
            message: message.into(),
        }
    }
}

impl<C: Compiler> Compiler for Mandatory<C> {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        self.inner.compile(compilation, tree)
    }
}

impl<C: Compiler> Mandatory<C> {
    /// Run with a mutable compilation so a failure can be recorded.
    pub fn compile_mut(&self, compilation: &mut Compilation, tree: TreeId) -> Instruction {
        match self.inner.compile(compilation, tree) {
            Some(instruction) => instruction,
            None => {
                compilation.fail(CompileException::at(self.message.clone(), tree));
                Instruction::Idle
            }
        }
    }
}

/// Compiles any matched node into `Idle`, discarding its text. Used for
/// purely structural nodes (anchors, whitespace-only scopes) that carry
/// no runtime effect.
pub struct ToIdle;

impl Compiler for ToIdle {
    fn compile(&self, _compilation: &Compilation, _tree: TreeId) -> Option<Instruction> {
        Some(Instruction::Idle)
    }
}

/// Compiles any matched node into a `PushConst` of its own source text,
/// unevaluated. The usual leaf compiler for literal text runs.
pub struct ToPushConst;

impl Compiler for ToPushConst {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let text = compilation.forest.get(tree).reference().text().ok()?;
        Some(Instruction::PushConst(Tag::Text(text.to_string())))
    }
}

/// Reconstructs a node's span in document order: the literal text
/// falling in the gaps between recognized children (via `free_gaps`)
/// interleaved with whatever `inner` compiles those children into.
/// This is how a template body -- ordinary text threaded with
/// interpolations and directives -- becomes the sequence of `PushConst`
/// and `Emit` instructions that reproduce it at render time.
pub struct TemplateBody<C> {
    pub inner: C,
}

impl<C> TemplateBody<C> {
    pub fn new(inner: C) -> TemplateBody<C> {
        TemplateBody { inner }
    }
}

impl<C: Compiler> Compiler for TemplateBody<C> {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let document = compilation.forest.get(tree).reference().document().clone();
        let mut pieces: Vec<(usize, Instruction)> = Vec::new();

        for (start, end) in free_gaps(&compilation.forest, tree) {
            if start == end {
                continue;
            }
            let gap_text = document.slice(start, end - start).ok()?;
            if gap_text.is_empty() {
                continue;
            }
            pieces.push((start, Instruction::PushConst(Tag::Text(gap_text.to_string()))));
        }

        for child in compilation.forest.children(tree) {
            if let Some(instruction) = self.inner.compile(compilation, child) {
                let position = compilation.forest.get(child).reference().position();
                pieces.push((position, instruction));
            }
        }

        pieces.sort_by_key(|(position, _)| *position);
        Some(Instruction::Block(pieces.into_iter().map(|(_, instruction)| instruction).collect()))
    }
}

/// Always declines; useful as the last rung of a `Fallback` chain that
/// otherwise could compile an empty or reserved node.
pub struct Empty;

impl Compiler for Empty {
    fn compile(&self, _compilation: &Compilation, _tree: TreeId) -> Option<Instruction> {
        None
    }
}
