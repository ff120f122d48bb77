// The sketch/tree overlay: a typed, hierarchical labelling of
// half-open intervals over a single document.
//
// Trees live in a `Forest`, an arena addressed by stable `TreeId`s
// rather than through `Rc`-cycles, since `Sketch` and `Tree` would
// otherwise need mutual back-references.

use std::rc::Rc;

use crate::document::Document;
use crate::interval::Dominance;
use crate::reference::Reference;

pub type TreeId = usize;

/// The typed label attached to a tree node: a free-form dotted `kind`
/// string, an integer `weight` used to break ties between sketches
/// that share the same interval, and a named sub-component map that
/// records which child plays which role (`left`, `right`, `sign`,
/// `open`, `close`, `body`, ...).
///
/// The sub-component map has no uniqueness requirement and preserves
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct Sketch {
    kind: String,
    weight: i64,
    components: Vec<(String, TreeId)>,
}

impl Sketch {
    pub fn new(kind: impl Into<String>) -> Sketch {
        Sketch {
            kind: kind.into(),
            weight: 0,
            components: Vec::new(),
        }
    }

    pub fn with_weight(kind: impl Into<String>, weight: i64) -> Sketch {
        Sketch {
            kind: kind.into(),
            weight,
            components: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    pub fn put(&mut self, role: impl Into<String>, child: TreeId) {
        self.components.push((role.into(), child));
    }

    pub fn get(&self, role: &str) -> Option<TreeId> {
        self.components.iter().find(|(r, _)| r == role).map(|(_, id)| *id)
    }

    pub fn get_all(&self, role: &str) -> Vec<TreeId> {
        self.components
            .iter()
            .filter(|(r, _)| r == role)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn components(&self) -> &[(String, TreeId)] {
        &self.components
    }
}

#[derive(Debug)]
pub struct Tree {
    document: Rc<Document>,
    reference: Reference,
    sketch: Sketch,
    weight: i64,
    parent: Option<TreeId>,
    first_child: Option<TreeId>,
    next_sibling: Option<TreeId>,
    previous_sibling: Option<TreeId>,
}

impl Tree {
    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn sketch_mut(&mut self) -> &mut Sketch {
        &mut self.sketch
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn kind(&self) -> &str {
        self.sketch.kind()
    }

    pub fn parent(&self) -> Option<TreeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<TreeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<TreeId> {
        self.next_sibling
    }

    pub fn previous_sibling(&self) -> Option<TreeId> {
        self.previous_sibling
    }
}

/// Errors raised while offering a new node into the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The new reference overlaps an existing sketch without either
    /// containing it (`Dominance::Share`).
    Overlap,
    /// An `Exact` offer whose weight does not exceed the existing
    /// node's weight; rejected rather than silently replacing it.
    Rejected,
    /// `offer` was called with a reference that is `Contain`s or
    /// `None` relative to the target -- a programming error at the
    /// call site, not a data problem.
    InvalidCallSite,
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::Overlap => write!(f, "overlapping sketch"),
            TreeError::Rejected => write!(f, "offer rejected: insufficient weight"),
            TreeError::InvalidCallSite => write!(f, "offer called on a non-containing reference"),
        }
    }
}
impl std::error::Error for TreeError {}

/// An arena of `Tree` nodes, addressed by stable `TreeId`s.
#[derive(Debug, Default)]
pub struct Forest {
    nodes: Vec<Tree>,
}

impl Forest {
    pub fn new() -> Forest {
        Forest { nodes: Vec::new() }
    }

    /// Build the root tree, exactly spanning the whole document. Its
    /// weight starts below any real sketch's so the first parser or
    /// analyzer to claim the whole document exactly is never rejected
    /// for merely tying a weight nothing has asserted yet.
    pub fn root(&mut self, document: Rc<Document>, length: usize) -> TreeId {
        let reference = Reference::whole(document.clone(), length);
        self.alloc(document, reference, Sketch::new("root"), i64::MIN)
    }

    pub fn get(&self, id: TreeId) -> &Tree {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: TreeId) -> &mut Tree {
        &mut self.nodes[id]
    }

    fn alloc(&mut self, document: Rc<Document>, reference: Reference, sketch: Sketch, weight: i64) -> TreeId {
        let id = self.nodes.len();
        self.nodes.push(Tree {
            document,
            reference,
            sketch,
            weight,
            parent: None,
            first_child: None,
            next_sibling: None,
            previous_sibling: None,
        });
        id
    }

    /// Immediate children of `id`, in document order.
    pub fn children(&self, id: TreeId) -> Vec<TreeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes[id].first_child;
        while let Some(cid) = cursor {
            out.push(cid);
            cursor = self.nodes[cid].next_sibling;
        }
        out
    }

    /// Depth-first pre-order enumeration of `id` and its descendants.
    pub fn collect(&self, id: TreeId) -> Vec<TreeId> {
        let mut out = vec![id];
        for child in self.children(id) {
            out.extend(self.collect(child));
        }
        out
    }

    /// Insert a new labelled reference into the subtree rooted at `parent`,
    /// re-parenting existing descendants as needed. See module docs for
    /// the placement policy.
    pub fn offer(
        &mut self,
        parent: TreeId,
        document: Rc<Document>,
        reference: Reference,
        sketch: Sketch,
        weight: i64,
    ) -> Result<TreeId, TreeError> {
        let dominance = self.nodes[parent]
            .reference
            .dominance(&reference)
            .map_err(|_| TreeError::InvalidCallSite)?;

        match dominance {
            Dominance::Exact => {
                if weight > self.nodes[parent].weight {
                    let new_id = self.alloc(document, reference, sketch, weight);
                    let old_first = self.nodes[parent].first_child.take();
                    let mut cursor = old_first;
                    while let Some(cid) = cursor {
                        self.nodes[cid].parent = Some(new_id);
                        cursor = self.nodes[cid].next_sibling;
                    }
                    self.nodes[new_id].first_child = old_first;
                    self.nodes[new_id].parent = Some(parent);
                    self.nodes[parent].first_child = Some(new_id);
                    // `parent`'s weight now tracks this interposed claim, so a
                    // later offer at the same exact span is judged against the
                    // current occupant, not the position's original weight.
                    self.nodes[parent].weight = weight;
                    Ok(new_id)
                } else {
                    Err(TreeError::Rejected)
                }
            }
            Dominance::Part => {
                let mut cursor = self.nodes[parent].first_child;
                while let Some(cid) = cursor {
                    let child_dominance = self.nodes[cid].reference.dominance(&reference);
                    if matches!(child_dominance, Ok(Dominance::Part) | Ok(Dominance::Exact)) {
                        return self.offer(cid, document, reference, sketch, weight);
                    }
                    cursor = self.nodes[cid].next_sibling;
                }
                Ok(self.insert_child(parent, document, reference, sketch, weight))
            }
            Dominance::Share => Err(TreeError::Overlap),
            Dominance::Contain | Dominance::None => Err(TreeError::InvalidCallSite),
        }
    }

    /// Attach `reference` as a new, direct child of `parent`. Any existing
    /// children that fall inside `reference` are re-parented under the new
    /// node; the rest keep their place, and the new node is spliced into
    /// document order among them (ties broken by ascending weight).
    fn insert_child(
        &mut self,
        parent: TreeId,
        document: Rc<Document>,
        reference: Reference,
        sketch: Sketch,
        weight: i64,
    ) -> TreeId {
        let new_id = self.alloc(document, reference, sketch, weight);

        let mut engulfed = Vec::new();
        let mut remaining = Vec::new();
        for cid in self.children(parent) {
            let new_ref = &self.nodes[new_id].reference;
            if new_ref.dominance(&self.nodes[cid].reference) == Ok(Dominance::Part) {
                engulfed.push(cid);
            } else {
                remaining.push(cid);
            }
        }

        for &cid in &engulfed {
            self.nodes[cid].parent = Some(new_id);
        }
        self.relink(&engulfed);
        self.nodes[new_id].first_child = engulfed.first().copied();
        self.nodes[new_id].parent = Some(parent);

        let new_position = self.nodes[new_id].reference.position();
        let new_weight = self.nodes[new_id].weight;
        let insert_at = remaining
            .iter()
            .position(|&cid| {
                let r = &self.nodes[cid].reference;
                r.position() > new_position || (r.position() == new_position && self.nodes[cid].weight > new_weight)
            })
            .unwrap_or(remaining.len());
        remaining.insert(insert_at, new_id);

        for &cid in &remaining {
            self.nodes[cid].parent = Some(parent);
        }
        self.relink(&remaining);
        self.nodes[parent].first_child = remaining.first().copied();

        new_id
    }

    /// Rewire `next_sibling`/`previous_sibling` so that `order` (already a
    /// document-ordered list of sibling ids) forms a correct linked chain.
    fn relink(&mut self, order: &[TreeId]) {
        for (idx, &cid) in order.iter().enumerate() {
            self.nodes[cid].previous_sibling = if idx == 0 { None } else { Some(order[idx - 1]) };
            self.nodes[cid].next_sibling = order.get(idx + 1).copied();
        }
    }
}
