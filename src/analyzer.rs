// The analyzer framework: restructuring passes that rewrite the tree
// in place (wrapping an operator and its operands, folding an
// enclosure's body, ...) without introducing new source text.

use crate::compilation::Compilation;
use crate::tree::{Sketch, TreeId};

/// `(compilation, tree) -> did this pass change anything?`
pub trait Analyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool;
}

/// Apply `inner` to `tree` and every descendant, snapshotted up front
/// for the same reason `parser::Hierarchy` snapshots: nodes rewritten
/// mid-pass are revisited on the next fixed-point iteration.
pub struct Hierarchy<A> {
    pub inner: A,
}

impl<A> Hierarchy<A> {
    pub fn new(inner: A) -> Hierarchy<A> {
        Hierarchy { inner }
    }
}

impl<A: Analyzer> Analyzer for Hierarchy<A> {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for id in compilation.forest.collect(tree) {
            if self.inner.analyze(compilation, id) {
                changed = true;
            }
        }
        changed
    }
}

/// A predicate over a single tree node, composable with `and`/`not`.
pub trait Query {
    fn matches(&self, compilation: &Compilation, tree: TreeId) -> bool;
}

pub struct Is(pub String);

impl Query for Is {
    fn matches(&self, compilation: &Compilation, tree: TreeId) -> bool {
        compilation.forest.get(tree).kind() == self.0
    }
}

pub fn is(kind: impl Into<String>) -> Is {
    Is(kind.into())
}

/// Matches when `tree`'s parent matches `inner`.
pub struct Parent<Q>(pub Q);

impl<Q: Query> Query for Parent<Q> {
    fn matches(&self, compilation: &Compilation, tree: TreeId) -> bool {
        match compilation.forest.get(tree).parent() {
            Some(parent) => self.0.matches(compilation, parent),
            None => false,
        }
    }
}

pub fn parent<Q: Query>(q: Q) -> Parent<Q> {
    Parent(q)
}

pub struct Not<Q>(pub Q);

impl<Q: Query> Query for Not<Q> {
    fn matches(&self, compilation: &Compilation, tree: TreeId) -> bool {
        !self.0.matches(compilation, tree)
    }
}

pub fn not<Q: Query>(q: Q) -> Not<Q> {
    Not(q)
}

pub struct And<Q>(pub Vec<Q>);

impl<Q: Query> Query for And<Q> {
    fn matches(&self, compilation: &Compilation, tree: TreeId) -> bool {
        self.0.iter().all(|q| q.matches(compilation, tree))
    }
}

/// Locate an operator sketch's nearest preceding and following sibling
/// and wrap `[left.start, right.end)` as a new sketch with `sign`,
/// `left`, and `right` sub-components. Skips when either neighbor is
/// missing -- a trailing or leading operator is left for a later pass
/// (or ultimately a compile error) rather than guessed at.
pub struct BinaryOperator {
    /// Matches the operator symbol's own sketch.
    pub operator: Box<dyn Query>,
    pub wrapper_kind: String,
    pub weight: i64,
}

impl BinaryOperator {
    /// Weight 1: strictly above the ambient weight (0) that an
    /// unclaimed root or enclosure body carries, so a wrap can
    /// interpose the first time it exactly fills its parent's span,
    /// while a second pass over the same (now re-parented) operator
    /// compares against the wrapper's own weight and is correctly
    /// turned away.
    pub fn new(operator: impl Query + 'static, wrapper_kind: impl Into<String>) -> BinaryOperator {
        BinaryOperator {
            operator: Box::new(operator),
            wrapper_kind: wrapper_kind.into(),
            weight: 1,
        }
    }
}

impl Analyzer for BinaryOperator {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        if !self.operator.matches(compilation, tree) {
            return false;
        }
        let node = compilation.forest.get(tree);
        let parent = match node.parent() {
            Some(p) => p,
            None => return false,
        };
        let left = match node.previous_sibling() {
            Some(l) => l,
            None => return false,
        };
        let right = match node.next_sibling() {
            Some(r) => r,
            None => return false,
        };

        let document = compilation.forest.get(parent).document().clone();
        let start = compilation.forest.get(left).reference().position();
        let end = compilation.forest.get(right).reference().end();
        let reference = crate::reference::Reference::new(document.clone(), start, end - start);
        let sketch = Sketch::with_weight(self.wrapper_kind.clone(), self.weight);

        match compilation.forest.offer(parent, document, reference, sketch, self.weight) {
            Ok(wrapper) => {
                let sketch = compilation.forest.get_mut(wrapper).sketch_mut();
                sketch.put("left", left);
                sketch.put("sign", tree);
                sketch.put("right", right);
                true
            }
            Err(_) => false,
        }
    }
}

/// Iteration cap for fixed-point passes; mirrors `parser::MAX_PASSES`.
pub const MAX_PASSES: usize = 4096;

pub fn analyze_to_fixed_point(
    analyzer: &dyn Analyzer,
    compilation: &mut Compilation,
) -> Result<(), crate::error::CompileException> {
    for _ in 0..MAX_PASSES {
        crate::trace!("analyze pass over {:?}", compilation.document.name());
        if !analyzer.analyze(compilation, compilation.root) {
            return Ok(());
        }
    }
    Err(crate::error::CompileException::new(
        "analyzer did not reach a fixed point",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::parser::{Hierarchy as ParseHierarchy, Pattern};
    use regex::Regex;
    use std::rc::Rc;

    fn parse_terms_and_signs(text: &str) -> Compilation {
        let document = Rc::new(Document::new("a.jam", text));
        let mut compilation = Compilation::new(document);
        let terms = Pattern::new(Regex::new(r"\d+").unwrap(), "number");
        let signs = Pattern::new(Regex::new(r"\+").unwrap(), "plus");
        crate::parser::parse_to_fixed_point(&ParseHierarchy::new(terms), &mut compilation).unwrap();
        crate::parser::parse_to_fixed_point(&ParseHierarchy::new(signs), &mut compilation).unwrap();
        compilation
    }

    #[test]
    fn wraps_operator_and_both_neighbors() {
        let mut compilation = parse_terms_and_signs("1+2");
        let plus_op = BinaryOperator::new(is("plus"), "sum");
        analyze_to_fixed_point(&Hierarchy::new(plus_op), &mut compilation).unwrap();
        let children = compilation.forest.children(compilation.root);
        assert_eq!(children.len(), 1);
        let wrapper = children[0];
        assert_eq!(compilation.forest.get(wrapper).kind(), "sum");
        assert_eq!(compilation.forest.get(wrapper).reference().text().unwrap(), "1+2");
        let sketch = compilation.forest.get(wrapper).sketch();
        assert!(sketch.get("left").is_some());
        assert!(sketch.get("sign").is_some());
        assert!(sketch.get("right").is_some());
    }

    #[test]
    fn leading_operator_with_no_left_neighbor_is_left_alone() {
        let mut compilation = parse_terms_and_signs("+2");
        let plus_op = BinaryOperator::new(is("plus"), "sum");
        analyze_to_fixed_point(&Hierarchy::new(plus_op), &mut compilation).unwrap();
        assert_eq!(compilation.forest.children(compilation.root).len(), 2);
    }

    #[test]
    fn parent_query_matches_the_wrapping_sketch() {
        let mut compilation = parse_terms_and_signs("1+2");
        let plus_op = BinaryOperator::new(is("plus"), "sum");
        analyze_to_fixed_point(&Hierarchy::new(plus_op), &mut compilation).unwrap();
        let wrapper = compilation.forest.children(compilation.root)[0];
        let left = compilation.forest.get(wrapper).sketch().get("left").unwrap();
        assert!(parent(is("sum")).matches(&compilation, left));
        assert!(not(is("number")).matches(&compilation, wrapper));
    }
}
