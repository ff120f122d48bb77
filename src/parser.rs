// The parser framework: pattern-driven extraction of new sub-trees,
// plus the drivers that apply a parser across a hierarchy and run a
// parser to a fixed point.

use regex::Regex;
use std::rc::Rc;

use crate::compilation::Compilation;
use crate::document::Document;
use crate::error::CompileException;
use crate::reference::Reference;
use crate::tree::{Forest, Sketch, TreeId};

/// `(compilation, tree) -> did this pass attach anything new?`
///
/// The original engine has a parser *propose* trees for the caller to
/// offer; here a parser commits its own offers directly and reports
/// whether any stuck, which keeps the trait symmetric with `Analyzer`
/// and avoids a throwaway collection type.
pub trait Parser {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool;
}

/// Apply `inner` to `tree` and every descendant, snapshotted before the
/// pass starts so nodes attached mid-pass are picked up on the next
/// fixed-point iteration rather than re-entrantly.
pub struct Hierarchy<P> {
    pub inner: P,
}

impl<P> Hierarchy<P> {
    pub fn new(inner: P) -> Hierarchy<P> {
        Hierarchy { inner }
    }
}

impl<P: Parser> Parser for Hierarchy<P> {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for id in compilation.forest.collect(tree) {
            if self.inner.parse(compilation, id) {
                changed = true;
            }
        }
        changed
    }
}

/// Run every parser against the same tree; they extract disjoint
/// sub-trees, so (unlike compiler fallback) all of them run.
pub struct All(pub Vec<Box<dyn Parser>>);

impl Parser for All {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let mut changed = false;
        for parser in &self.0 {
            if parser.parse(compilation, tree) {
                changed = true;
            }
        }
        changed
    }
}

/// The character ranges within `tree`'s span not yet covered by any of
/// its direct children -- where a pattern is still free to match, or
/// where a template-reconstruction compiler still owes literal output.
pub fn free_gaps(forest: &Forest, tree: TreeId) -> Vec<(usize, usize)> {
    let node = forest.get(tree);
    let start = node.reference().position();
    let end = node.reference().end();
    let mut gaps = Vec::new();
    let mut cursor = start;
    for child in forest.children(tree) {
        let child_ref = forest.get(child).reference();
        if child_ref.position() > cursor {
            gaps.push((cursor, child_ref.position()));
        }
        cursor = cursor.max(child_ref.end());
    }
    if cursor < end {
        gaps.push((cursor, end));
    }
    gaps
}

/// Byte offset -> character offset, for translating regex match
/// positions (byte-indexed) back into the engine's character-indexed
/// reference space.
pub fn char_offset(s: &str, byte_offset: usize) -> usize {
    s[..byte_offset].chars().count()
}

/// Extract every non-overlapping match of a single regex within
/// `tree`'s unparsed regions as a single-node sub-tree of `kind`.
pub struct Pattern {
    pub regex: Regex,
    pub kind: String,
    pub weight: i64,
}

impl Pattern {
    pub fn new(regex: Regex, kind: impl Into<String>) -> Pattern {
        Pattern {
            regex,
            kind: kind.into(),
            weight: 0,
        }
    }

    pub fn with_weight(regex: Regex, kind: impl Into<String>, weight: i64) -> Pattern {
        Pattern {
            regex,
            kind: kind.into(),
            weight,
        }
    }
}

impl Parser for Pattern {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let document = compilation.document.clone();
        let mut changed = false;
        for (gap_start, gap_end) in free_gaps(&compilation.forest, tree) {
            let gap_text = match document.slice(gap_start, gap_end - gap_start) {
                Ok(t) => t,
                Err(_) => continue,
            };
            for m in self.regex.find_iter(gap_text) {
                if m.start() == m.end() {
                    continue;
                }
                let start = gap_start + char_offset(gap_text, m.start());
                let end = gap_start + char_offset(gap_text, m.end());
                let reference = Reference::new(document.clone(), start, end - start);
                let sketch = Sketch::with_weight(self.kind.clone(), self.weight);
                if compilation
                    .forest
                    .offer(tree, document.clone(), reference, sketch, self.weight)
                    .is_ok()
                {
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Scan for matching `open`/`close` pairs, tracking nesting depth only
/// within this parser's own language (no balancing against enclosures
/// from a different parser). Each closed pair emits an enclosure node
/// with `open`/`close` anchor children and, unless this is a `Scope`
/// (no body kind), a `body` child spanning the interior.
pub struct Enclosure {
    pub open: Regex,
    pub close: Regex,
    pub enclosure_kind: String,
    pub open_kind: String,
    pub close_kind: String,
    pub body_kind: Option<String>,
    pub weight: i64,
}

impl Enclosure {
    pub fn new(open: Regex, close: Regex, enclosure_kind: impl Into<String>) -> Enclosure {
        Enclosure {
            open,
            close,
            enclosure_kind: enclosure_kind.into(),
            open_kind: "open".to_string(),
            close_kind: "close".to_string(),
            body_kind: Some("body".to_string()),
            weight: 0,
        }
    }

    /// An enclosure with fixed `open`/`close` child kinds and no
    /// synthesized `body` node -- later passes attach directly under it.
    pub fn scope(open: Regex, close: Regex, enclosure_kind: impl Into<String>) -> Enclosure {
        Enclosure {
            body_kind: None,
            ..Enclosure::new(open, close, enclosure_kind)
        }
    }
}

enum Event {
    Open(usize, usize),
    Close(usize, usize),
}

impl Parser for Enclosure {
    fn parse(&self, compilation: &mut Compilation, tree: TreeId) -> bool {
        let document = compilation.document.clone();
        let mut changed = false;

        for (gap_start, gap_end) in free_gaps(&compilation.forest, tree) {
            let gap_text = match document.slice(gap_start, gap_end - gap_start) {
                Ok(t) => t,
                Err(_) => continue,
            };

            let mut events: Vec<Event> = Vec::new();
            for m in self.open.find_iter(gap_text) {
                events.push(Event::Open(m.start(), m.end()));
            }
            for m in self.close.find_iter(gap_text) {
                events.push(Event::Close(m.start(), m.end()));
            }
            events.sort_by_key(|e| match e {
                Event::Open(s, _) | Event::Close(s, _) => *s,
            });

            let mut stack: Vec<(usize, usize)> = Vec::new();
            for event in events {
                match event {
                    Event::Open(s, e) => stack.push((s, e)),
                    Event::Close(close_s, close_e) => {
                        if let Some((open_s, open_e)) = stack.pop() {
                            if stack.is_empty()
                                && self.emit(
                                    compilation,
                                    tree,
                                    &document,
                                    gap_start,
                                    gap_text,
                                    open_s,
                                    open_e,
                                    close_s,
                                    close_e,
                                )
                            {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }
        changed
    }
}

impl Enclosure {
    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        compilation: &mut Compilation,
        tree: TreeId,
        document: &Rc<Document>,
        gap_start: usize,
        gap_text: &str,
        open_s: usize,
        open_e: usize,
        close_s: usize,
        close_e: usize,
    ) -> bool {
        let at = |byte_offset: usize| gap_start + char_offset(gap_text, byte_offset);
        let enclosure_start = at(open_s);
        let enclosure_end = at(close_e);
        let open_start = enclosure_start;
        let open_end = at(open_e);
        let close_start = at(close_s);
        let close_end = enclosure_end;

        let enclosure_ref = Reference::new(document.clone(), enclosure_start, enclosure_end - enclosure_start);
        let enclosure_sketch = Sketch::with_weight(self.enclosure_kind.clone(), self.weight);
        let enclosure_id = match compilation.forest.offer(
            tree,
            document.clone(),
            enclosure_ref,
            enclosure_sketch,
            self.weight,
        ) {
            Ok(id) => id,
            Err(_) => return false,
        };

        let open_ref = Reference::new(document.clone(), open_start, open_end - open_start);
        if let Ok(open_id) = compilation.forest.offer(
            enclosure_id,
            document.clone(),
            open_ref,
            Sketch::with_weight(self.open_kind.clone(), self.weight),
            self.weight,
        ) {
            compilation.forest.get_mut(enclosure_id).sketch_mut().put("open", open_id);
        }

        let close_ref = Reference::new(document.clone(), close_start, close_end - close_start);
        if let Ok(close_id) = compilation.forest.offer(
            enclosure_id,
            document.clone(),
            close_ref,
            Sketch::with_weight(self.close_kind.clone(), self.weight),
            self.weight,
        ) {
            compilation.forest.get_mut(enclosure_id).sketch_mut().put("close", close_id);
        }

        if let Some(body_kind) = &self.body_kind {
            let body_start = open_end;
            let body_end = close_start;
            if body_end > body_start {
                let body_ref = Reference::new(document.clone(), body_start, body_end - body_start);
                if let Ok(body_id) = compilation.forest.offer(
                    enclosure_id,
                    document.clone(),
                    body_ref,
                    Sketch::with_weight(body_kind.clone(), self.weight),
                    self.weight,
                ) {
                    compilation.forest.get_mut(enclosure_id).sketch_mut().put("body", body_id);
                }
            }
        }

        true
    }
}

/// Iteration cap for fixed-point passes; a parser that never stabilizes
/// within this many passes is treated as a pipeline bug, not patience.
pub const MAX_PASSES: usize = 4096;

/// Run `parser` against `compilation`'s root repeatedly until one full
/// pass makes no further change.
pub fn parse_to_fixed_point(
    parser: &dyn Parser,
    compilation: &mut Compilation,
) -> Result<(), CompileException> {
    for _ in 0..MAX_PASSES {
        crate::trace!("parse pass over {:?}", compilation.document.name());
        if !parser.parse(compilation, compilation.root) {
            return Ok(());
        }
    }
    Err(CompileException::new("parser did not reach a fixed point"))
}
