// The instruction set: a tree of opcodes, `Block` plus a fixed set of
// leaves, executed against an `Environment` and a `Memory`. One
// traversal equals one execution; nothing here loops except `ForEach`,
// whose iteration count comes from the data, not the instruction tree.

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::ExecutionException;
use crate::memory::Memory;
use crate::value::{number, parse_number, text, Rt, Tag};

fn is_falsy(s: &str) -> bool {
    matches!(s, "" | "0" | "false")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instruction {
    /// An ordered sequence of instructions, executed in order.
    Block(Vec<Instruction>),
    /// No-op; used for structural nodes that carry no runtime effect.
    Idle,

    // -- stack & frames ---------------------------------------------------
    PushConst(Tag),
    Pop,
    Dup,
    PushFrame,
    DumpFrame,
    JoinFrame,
    GlueFrame,

    // -- heap ---------------------------------------------------------------
    Access(String),
    Alloc(String, Box<Instruction>),
    /// Executes its instruction in a fresh frame, joins the frame into
    /// one text value, and stores that at the address -- unlike
    /// `Alloc`, whose instruction must leave exactly one value behind.
    ComputeAlloc(String, Box<Instruction>),
    FreeAddr(String),
    /// Removes an address from the `DEFINE` mirror only, leaving the
    /// heap entry itself untouched.
    Undefine(String),
    IsDefined(String),
    IsUndefined(String),

    // -- arithmetic & text --------------------------------------------------
    Sum,
    Product,
    Sub,
    Div,
    Mod,
    /// Pops one value and pushes "1"/"0" for whether it is truthy.
    Truthy,
    /// Pops one value and pushes the logical negation of its truthiness.
    Negate,

    // -- control flow ---------------------------------------------------------
    Branch(Box<Instruction>, Box<Instruction>, Option<Box<Instruction>>),
    ForEach(String, Box<Instruction>, Box<Instruction>),
    Import(Box<Instruction>),

    // -- I/O ------------------------------------------------------------------
    Print,
    /// Executes its instruction in a fresh frame, joins it to text, and
    /// prints that text to the console.
    ConsolePrint(Box<Instruction>),
    /// Executes its instruction in a fresh frame and joins it to text,
    /// leaving the joined value on the enclosing frame -- the usual way
    /// an embedded expression's result is spliced back into surrounding
    /// literal text.
    Emit(Box<Instruction>),
}

impl Instruction {
    pub fn exec(&self, env: &Environment, memory: &mut Memory) -> Result<(), ExecutionException> {
        match self {
            Instruction::Block(children) => {
                for child in children {
                    child.exec(env, memory)?;
                }
                Ok(())
            }
            Instruction::Idle => Ok(()),

            Instruction::PushConst(tag) => {
                memory.push(Rt::new(tag.clone()));
                Ok(())
            }
            Instruction::Pop => {
                memory.pop();
                Ok(())
            }
            Instruction::Dup => {
                let top = memory
                    .peek()
                    .cloned()
                    .ok_or_else(|| ExecutionException::new("dup on an empty frame"))?;
                memory.push(top);
                Ok(())
            }
            Instruction::PushFrame => {
                memory.push_frame();
                Ok(())
            }
            Instruction::DumpFrame => {
                memory.dump_frame();
                Ok(())
            }
            Instruction::JoinFrame => {
                memory.join_frame();
                Ok(())
            }
            Instruction::GlueFrame => {
                memory.glue_frame();
                Ok(())
            }

            Instruction::Access(addr) => {
                let value = memory
                    .get(addr)
                    .cloned()
                    .ok_or_else(|| ExecutionException::new(format!("undefined address {:?}", addr)))?;
                memory.push(value);
                Ok(())
            }
            Instruction::Alloc(addr, instr) => {
                memory.push_frame();
                instr.exec(env, memory)?;
                let values = memory.pop_frame();
                let value = match values.len() {
                    1 => values.into_iter().next().unwrap(),
                    n => {
                        return Err(ExecutionException::new(format!(
                            "alloc expected exactly one value, got {}",
                            n
                        )))
                    }
                };
                memory.alloc(addr, value);
                Ok(())
            }
            Instruction::ComputeAlloc(addr, instr) => {
                memory.push_frame();
                instr.exec(env, memory)?;
                let joined = memory.join_frame();
                memory.pop();
                memory.alloc(addr, joined);
                Ok(())
            }
            Instruction::FreeAddr(addr) => {
                memory.free_addr(addr);
                Ok(())
            }
            Instruction::Undefine(addr) => {
                memory.repree_addr(addr);
                Ok(())
            }
            Instruction::IsDefined(addr) => {
                memory.push(text(if memory.is_defined(addr) { "1" } else { "0" }));
                Ok(())
            }
            Instruction::IsUndefined(addr) => {
                memory.push(text(if memory.is_defined(addr) { "0" } else { "1" }));
                Ok(())
            }

            Instruction::Sum => {
                let (left, right) = pop_pair(memory)?;
                let left_text = left.evaluate(memory);
                let right_text = right.evaluate(memory);
                match (parse_number(&left_text), parse_number(&right_text)) {
                    (Some(a), Some(b)) => memory.push(number(a + b)),
                    _ => memory.push(text(format!("{}{}", left_text, right_text))),
                }
                Ok(())
            }
            Instruction::Product => {
                let (left, right) = numeric_pair(memory, "product")?;
                memory.push(number(left * right));
                Ok(())
            }
            Instruction::Sub => {
                let (left, right) = numeric_pair(memory, "subtraction")?;
                memory.push(number(left - right));
                Ok(())
            }
            Instruction::Div => {
                let (left, right) = numeric_pair(memory, "division")?;
                memory.push(number(left / right));
                Ok(())
            }
            Instruction::Mod => {
                let (left, right) = numeric_pair(memory, "modulus")?;
                memory.push(number(left % right));
                Ok(())
            }
            Instruction::Truthy => {
                let value = pop_one(memory)?;
                let truthy = !is_falsy(&value.evaluate(memory));
                memory.push(text(if truthy { "1" } else { "0" }));
                Ok(())
            }
            Instruction::Negate => {
                let value = pop_one(memory)?;
                let falsy = is_falsy(&value.evaluate(memory));
                memory.push(text(if falsy { "1" } else { "0" }));
                Ok(())
            }

            Instruction::Branch(cond, then_branch, else_branch) => {
                memory.push_frame();
                cond.exec(env, memory)?;
                let joined = memory.join_frame();
                let condition_text = joined.evaluate(memory);
                memory.pop();
                if is_falsy(&condition_text) {
                    match else_branch {
                        Some(instr) => instr.exec(env, memory),
                        None => Ok(()),
                    }
                } else {
                    then_branch.exec(env, memory)
                }
            }
            Instruction::ForEach(addr, iterable, body) => {
                memory.push_frame();
                iterable.exec(env, memory)?;
                let glued = memory.glue_frame();
                memory.pop();
                let resolved = glued.resolve(memory);
                let items = resolved
                    .as_array()
                    .ok_or_else(|| ExecutionException::new("for-each requires an array"))?
                    .to_vec();
                for item in items {
                    memory.set(addr, item);
                    body.exec(env, memory)?;
                }
                Ok(())
            }
            Instruction::Import(name_instr) => {
                memory.push_frame();
                name_instr.exec(env, memory)?;
                let joined = memory.join_frame();
                let name = joined.evaluate(memory);
                memory.pop();
                let imported = env
                    .get(&name)
                    .ok_or_else(|| ExecutionException::new(format!("no compilation registered for {:?}", name)))?
                    .clone();
                memory.push_frame();
                imported.exec(env, memory)?;
                memory.join_frame();
                Ok(())
            }

            Instruction::Print => {
                let value = pop_one(memory)?;
                let rendered = value.evaluate(memory);
                memory.print(&rendered);
                Ok(())
            }
            Instruction::ConsolePrint(instr) => {
                memory.push_frame();
                instr.exec(env, memory)?;
                let joined = memory.join_frame();
                let rendered = joined.evaluate(memory);
                memory.pop();
                memory.print(&rendered);
                Ok(())
            }
            Instruction::Emit(instr) => {
                memory.push_frame();
                instr.exec(env, memory)?;
                memory.join_frame();
                Ok(())
            }
        }
    }
}

fn pop_one(memory: &mut Memory) -> Result<Rt, ExecutionException> {
    memory.pop().ok_or_else(|| ExecutionException::new("pop on an empty frame"))
}

fn pop_pair(memory: &mut Memory) -> Result<(Rt, Rt), ExecutionException> {
    let right = pop_one(memory)?;
    let left = pop_one(memory)?;
    Ok((left, right))
}

fn numeric_pair(memory: &mut Memory, op: &str) -> Result<(f64, f64), ExecutionException> {
    let (left, right) = pop_pair(memory)?;
    let left_text = left.evaluate(memory);
    let right_text = right.evaluate(memory);
    let left_n = parse_number(&left_text)
        .ok_or_else(|| ExecutionException::new(format!("{} requires numeric operands, got {:?}", op, left_text)))?;
    let right_n = parse_number(&right_text)
        .ok_or_else(|| ExecutionException::new(format!("{} requires numeric operands, got {:?}", op, right_text)))?;
    Ok((left_n, right_n))
}
