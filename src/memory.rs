// Runtime state the stack machine executes against: a push-down
// frame stack, a keyed heap (with a JSON-mirrored `DEFINE` address),
// and an append-only console.

use std::collections::HashMap;

use crate::value::{text, Rt, Tag};

/// The reserved heap address holding a JSON mirror of every
/// user-defined symbol. Kept in sync with individual heap entries as
/// a side effect of `alloc`/`free_addr`.
pub const DEFINE_ADDRESS: &str = "DEFINE";

#[derive(Debug)]
pub struct Memory {
    frames: Vec<Vec<Rt>>,
    heap: HashMap<String, Rt>,
    console: String,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            frames: vec![Vec::new()],
            heap: HashMap::new(),
            console: String::new(),
        }
    }

    /// A throwaway memory with no heap state, useful for unit tests
    /// that only exercise pure value arithmetic.
    pub fn scratch() -> Memory {
        Memory::new()
    }

    // -- stack --------------------------------------------------------

    pub fn push(&mut self, value: Rt) {
        self.frames.last_mut().expect("no active frame").push(value);
    }

    pub fn pop(&mut self) -> Option<Rt> {
        self.frames.last_mut().expect("no active frame").pop()
    }

    pub fn peek(&self) -> Option<&Rt> {
        self.frames.last().expect("no active frame").last()
    }

    pub fn depth(&self) -> usize {
        self.frames.last().expect("no active frame").len()
    }

    // -- frames ---------------------------------------------------------

    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Close the top frame, discarding its contents.
    pub fn dump_frame(&mut self) {
        self.frames.pop().expect("no active frame to dump");
    }

    /// Close the top frame, returning its contents in order.
    pub fn pop_frame(&mut self) -> Vec<Rt> {
        self.frames.pop().expect("no active frame to pop")
    }

    /// Close the top frame, concatenate its values (in order) into a
    /// single text value, and leave it on the new top.
    pub fn join_frame(&mut self) -> Rt {
        let frame = self.pop_frame();
        let joined: String = frame.iter().map(|v| v.evaluate(&*self)).collect();
        let value = text(joined);
        self.push(value.clone());
        value
    }

    /// Close the top frame, cast its values into a single homogeneous
    /// array value, and leave it on the new top.
    pub fn glue_frame(&mut self) -> Rt {
        let frame = self.pop_frame();
        let resolved: Vec<Rt> = frame
            .iter()
            .map(|v| Rt::new(v.resolve(&*self)))
            .collect();
        let value = Rt::new(Tag::Array(resolved));
        self.push(value.clone());
        value
    }

    // -- heap -----------------------------------------------------------

    pub fn set(&mut self, addr: &str, value: Rt) {
        self.heap.insert(addr.to_string(), value);
    }

    pub fn get(&self, addr: &str) -> Option<&Rt> {
        self.heap.get(addr)
    }

    /// Atomic read-modify-write: `f` sees the current value (or `None`)
    /// and returns the value to store.
    pub fn compute(&mut self, addr: &str, f: impl FnOnce(Option<&Rt>) -> Rt) {
        let next = f(self.heap.get(addr));
        self.heap.insert(addr.to_string(), next);
    }

    /// Store `value` at `addr` and mirror it into the `DEFINE` JSON object.
    pub fn alloc(&mut self, addr: &str, value: Rt) {
        self.heap.insert(addr.to_string(), value.clone());
        self.mirror_define_insert(addr, &value);
    }

    /// Remove `addr` from the heap and from the `DEFINE` mirror.
    pub fn free_addr(&mut self, addr: &str) -> Option<Rt> {
        let previous = self.heap.remove(addr);
        self.mirror_define_remove(addr);
        previous
    }

    /// Remove `addr` from the `DEFINE` mirror only, leaving the heap entry.
    pub fn repree_addr(&mut self, addr: &str) {
        self.mirror_define_remove(addr);
    }

    pub fn is_defined(&self, addr: &str) -> bool {
        self.define_object().contains_key(addr)
    }

    fn define_object(&self) -> serde_json::Map<String, serde_json::Value> {
        match self.heap.get(DEFINE_ADDRESS) {
            Some(v) => {
                let rendered = v.evaluate(self);
                serde_json::from_str::<serde_json::Value>(&rendered)
                    .ok()
                    .and_then(|parsed| parsed.as_object().cloned())
                    .unwrap_or_default()
            }
            None => serde_json::Map::new(),
        }
    }

    fn mirror_define_insert(&mut self, addr: &str, value: &Rt) {
        let mut obj = self.define_object();
        let rendered = value.evaluate(self);
        obj.insert(addr.to_string(), serde_json::Value::String(rendered));
        self.heap
            .insert(DEFINE_ADDRESS.to_string(), text(serde_json::Value::Object(obj).to_string()));
    }

    fn mirror_define_remove(&mut self, addr: &str) {
        let mut obj = self.define_object();
        obj.remove(addr);
        self.heap
            .insert(DEFINE_ADDRESS.to_string(), text(serde_json::Value::Object(obj).to_string()));
    }

    // -- console ----------------------------------------------------------

    pub fn print(&mut self, s: &str) {
        self.console.push_str(s);
    }

    pub fn console(&self) -> &str {
        &self.console
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}
