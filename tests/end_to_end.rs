// Exercises the full pipeline -- parse to a fixed point, analyze to a
// fixed point, compile, execute -- against small documents covering
// arithmetic precedence, conditionals, loops, and object literals.

use std::rc::Rc;

use regex::Regex;

use jamplate::analyzer::{analyze_to_fixed_point, is, BinaryOperator, Hierarchy as AnalyzeHierarchy};
use jamplate::compilation::Compilation;
use jamplate::compiler::{Compiler, Fallback, KindFilter, TemplateBody, ToPushConst};
use jamplate::document::Document;
use jamplate::env::Environment;
use jamplate::memory::Memory;
use jamplate::parser::{parse_to_fixed_point, All, Enclosure, Hierarchy as ParseHierarchy, Pattern};
use jamplate::tree::TreeId;
use jamplate::value::{text, Tag};
use jamplate::vm::Instruction;

/// Compiles `left op right`, op being `+` or `*`, with the usual
/// precedence and parenthesized grouping, into an `Instruction` that
/// leaves one value on the stack when run.
///
/// Shared by the bare arithmetic scenario and the `#declare` scenario,
/// both of which evaluate the same little expression grammar.
fn compile_arithmetic(text_source: &str) -> Instruction {
    let document = Rc::new(Document::new("expr.jam", text_source));
    let mut compilation = Compilation::new(document);

    let grammar = ParseHierarchy::new(All(vec![
        Box::new(Enclosure::new(Regex::new(r"\(").unwrap(), Regex::new(r"\)").unwrap(), "paren")),
        Box::new(Pattern::new(Regex::new(r"\d+").unwrap(), "number")),
        Box::new(Pattern::new(Regex::new(r"\*").unwrap(), "times")),
        Box::new(Pattern::new(Regex::new(r"\+").unwrap(), "plus")),
    ]));
    parse_to_fixed_point(&grammar, &mut compilation).unwrap();

    analyze_to_fixed_point(
        &AnalyzeHierarchy::new(BinaryOperator::new(is("times"), "product")),
        &mut compilation,
    )
    .unwrap();
    analyze_to_fixed_point(
        &AnalyzeHierarchy::new(BinaryOperator::new(is("plus"), "sum")),
        &mut compilation,
    )
    .unwrap();

    let top = compilation.forest.children(compilation.root)[0];
    ArithmeticExpr.compile(&compilation, top).unwrap()
}

/// Compiles a `number`, `sum`, `product`, or `paren` node recursively.
/// `sum`/`product` delegate to their `left`/`right` sub-components and
/// emit the matching `Instruction`; `paren` just compiles through to
/// its single body child.
struct ArithmeticExpr;

impl ArithmeticExpr {
    fn binary(&self, compilation: &Compilation, tree: TreeId, op: Instruction) -> Option<Instruction> {
        let sketch = compilation.forest.get(tree).sketch();
        let left = sketch.get("left")?;
        let right = sketch.get("right")?;
        let left_instr = self.compile(compilation, left)?;
        let right_instr = self.compile(compilation, right)?;
        Some(Instruction::Block(vec![left_instr, right_instr, op]))
    }
}

impl Compiler for ArithmeticExpr {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        match compilation.forest.get(tree).kind() {
            "number" => ToPushConst.compile(compilation, tree),
            "sum" => self.binary(compilation, tree, Instruction::Sum),
            "product" => self.binary(compilation, tree, Instruction::Product),
            "paren" => {
                let body = compilation.forest.get(tree).sketch().get("body")?;
                let child = compilation.forest.children(body).into_iter().next()?;
                self.compile(compilation, child)
            }
            _ => None,
        }
    }
}

#[test]
fn arithmetic_respects_precedence_and_parentheses() {
    let instruction = compile_arithmetic("1 + 2 * (3 + 5)");
    let env = Environment::new();
    let mut memory = Memory::new();
    instruction.exec(&env, &mut memory).unwrap();
    assert_eq!(memory.peek().unwrap().evaluate(&memory), "17");
}

/// `[name]` -- splices a heap value into the surrounding template text.
struct InterpRef;

impl Compiler for InterpRef {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let source = compilation.forest.get(tree).reference().text().ok()?;
        let name = source.trim_start_matches('[').trim_end_matches(']').to_string();
        Some(Instruction::Emit(Box::new(Instruction::Access(name))))
    }
}

/// `#define NAME VALUE` -- allocates `NAME` on the heap.
struct DefineStmt;

impl Compiler for DefineStmt {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let source = compilation.forest.get(tree).reference().text().ok()?;
        let captures = Regex::new(r"#define\s+(\w+)\s+(\d+)").unwrap().captures(source)?;
        let name = captures.get(1)?.as_str().to_string();
        let value = captures.get(2)?.as_str().to_string();
        Some(Instruction::Alloc(name, Box::new(Instruction::PushConst(Tag::Text(value)))))
    }
}

/// Bare `#if NAME\n...\n#endif` -- no `#else`. A truthy heap value at
/// `NAME` emits the body with exactly one trailing newline trimmed (the
/// newline that sits between the body and `#endif` belongs to the
/// directive's own formatting, not the emitted content).
struct BareIf;

impl Compiler for BareIf {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let sketch = compilation.forest.get(tree).sketch();
        let open = sketch.get("open")?;
        let open_source = compilation.forest.get(open).reference().text().ok()?;
        let name = Regex::new(r"#if\s+(\w+)").unwrap().captures(open_source)?.get(1)?.as_str().to_string();

        let body_text = match sketch.get("body") {
            Some(body) => compilation.forest.get(body).reference().text().ok()?.to_string(),
            None => String::new(),
        };
        let trimmed = body_text.strip_suffix('\n').unwrap_or(&body_text).to_string();

        Some(Instruction::Branch(
            Box::new(Instruction::Access(name)),
            Box::new(Instruction::PushConst(Tag::Text(trimmed))),
            None,
        ))
    }
}

#[test]
fn bare_if_directive_suppresses_its_trailing_newline() {
    let document = Rc::new(Document::new("a.jam", "#define X 5\n#if X\nok\n#endif"));
    let mut compilation = Compilation::new(document);

    let define = Pattern::new(Regex::new(r"#define\s+\w+\s+\d+\n").unwrap(), "define_stmt");
    parse_to_fixed_point(&ParseHierarchy::new(define), &mut compilation).unwrap();

    let if_stmt = Enclosure::new(Regex::new(r"#if\s+\w+\n").unwrap(), Regex::new(r"#endif").unwrap(), "if_stmt");
    parse_to_fixed_point(&ParseHierarchy::new(if_stmt), &mut compilation).unwrap();

    let directives = Fallback(vec![
        Box::new(KindFilter::new("define_stmt", DefineStmt)),
        Box::new(KindFilter::new("if_stmt", BareIf)),
    ]);
    let program = TemplateBody::new(directives).compile(&compilation, compilation.root).unwrap();

    let env = Environment::new();
    let mut memory = Memory::new();
    Instruction::ConsolePrint(Box::new(program)).exec(&env, &mut memory).unwrap();
    assert_eq!(memory.console(), "ok");
}

/// `#for NAME [a,b,c]\n...\n#endfor` -- iterates the bracketed list,
/// binding `NAME` and re-running the body once per element.
struct ForStmt;

impl Compiler for ForStmt {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let sketch = compilation.forest.get(tree).sketch();
        let open = sketch.get("open")?;
        let open_source = compilation.forest.get(open).reference().text().ok()?;
        let captures = Regex::new(r"#for\s+(\w+)\s+\[([^\]]*)\]").unwrap().captures(open_source)?;
        let name = captures.get(1)?.as_str().to_string();
        let items: Vec<Instruction> = captures
            .get(2)?
            .as_str()
            .split(',')
            .map(|item| Instruction::PushConst(Tag::Number(item.trim().parse().unwrap())))
            .collect();

        let body = sketch.get("body")?;
        let body_instruction = TemplateBody::new(KindFilter::new("interp_ref", InterpRef)).compile(compilation, body)?;

        Some(Instruction::ForEach(name, Box::new(Instruction::Block(items)), Box::new(body_instruction)))
    }
}

#[test]
fn for_directive_iterates_and_interpolates_each_element() {
    let document = Rc::new(Document::new("a.jam", "#for I [1,2,3]\n[I]\n#endfor"));
    let mut compilation = Compilation::new(document);

    let for_stmt = Enclosure::new(
        Regex::new(r"#for\s+\w+\s+\[[^\]]*\]\n").unwrap(),
        Regex::new(r"#endfor").unwrap(),
        "for_stmt",
    );
    parse_to_fixed_point(&ParseHierarchy::new(for_stmt), &mut compilation).unwrap();

    let interp = Pattern::new(Regex::new(r"\[\w+\]").unwrap(), "interp_ref");
    parse_to_fixed_point(&ParseHierarchy::new(interp), &mut compilation).unwrap();

    let program = TemplateBody::new(KindFilter::new("for_stmt", ForStmt))
        .compile(&compilation, compilation.root)
        .unwrap();

    let env = Environment::new();
    let mut memory = Memory::new();
    Instruction::ConsolePrint(Box::new(program)).exec(&env, &mut memory).unwrap();
    assert_eq!(memory.console(), "1\n2\n3\n");
}

/// `#ifdef NAME\n...\n#else\n...\n#endif` -- unlike bare `#if`, both
/// branches keep their trailing newline; the separator newlines around
/// `#else`/`#endif` are consumed by the match itself and re-appended.
struct IfDefElse;

impl IfDefElse {
    fn regex() -> Regex {
        Regex::new(r"(?s)#ifdef\s+(\w+)\n(.*)\n#else\n(.*)\n#endif").unwrap()
    }
}

impl Compiler for IfDefElse {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let source = compilation.forest.get(tree).reference().text().ok()?;
        let captures = Self::regex().captures(source)?;
        let name = captures.get(1)?.as_str().to_string();
        let then_body = format!("{}\n", captures.get(2)?.as_str());
        let else_body = format!("{}\n", captures.get(3)?.as_str());

        Some(Instruction::Branch(
            Box::new(Instruction::IsDefined(name)),
            Box::new(Instruction::PushConst(Tag::Text(then_body))),
            Some(Box::new(Instruction::PushConst(Tag::Text(else_body)))),
        ))
    }
}

#[test]
fn ifdef_else_directive_keeps_its_trailing_newline() {
    let document = Rc::new(Document::new("a.jam", "#ifdef Y\nA\n#else\nB\n#endif"));
    let mut compilation = Compilation::new(document);

    let ifdef_stmt = Pattern::new(IfDefElse::regex(), "ifdef_stmt");
    parse_to_fixed_point(&ParseHierarchy::new(ifdef_stmt), &mut compilation).unwrap();

    let program = TemplateBody::new(KindFilter::new("ifdef_stmt", IfDefElse))
        .compile(&compilation, compilation.root)
        .unwrap();

    let env = Environment::new();
    let mut memory = Memory::new();
    Instruction::ConsolePrint(Box::new(program)).exec(&env, &mut memory).unwrap();
    assert_eq!(memory.console(), "B\n");
}

/// `{k:v,k:v}` -- a flat object literal, compiled straight into a
/// `Tag::Object` constant.
struct ObjectLiteral;

impl Compiler for ObjectLiteral {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let source = compilation.forest.get(tree).reference().text().ok()?;
        let inner = source.strip_prefix('{')?.strip_suffix('}')?;
        let entries = inner
            .split(',')
            .map(|pair| {
                let mut parts = pair.splitn(2, ':');
                let key = parts.next().unwrap_or("").to_string();
                let value = parts.next().unwrap_or("").to_string();
                (text(key), text(value))
            })
            .collect();
        Some(Instruction::PushConst(Tag::Object(entries)))
    }
}

#[test]
fn object_literal_prints_as_canonical_json() {
    let document = Rc::new(Document::new("a.jam", "{a:1,b:2}"));
    let mut compilation = Compilation::new(document);

    let object = Pattern::new(Regex::new(r"\{[^{}]*\}").unwrap(), "object");
    parse_to_fixed_point(&ParseHierarchy::new(object), &mut compilation).unwrap();

    let top = compilation.forest.children(compilation.root)[0];
    let instruction = ObjectLiteral.compile(&compilation, top).unwrap();

    let env = Environment::new();
    let mut memory = Memory::new();
    instruction.exec(&env, &mut memory).unwrap();
    assert_eq!(memory.peek().unwrap().evaluate(&memory), r#"{"a":"1","b":"2"}"#);
}

/// `#declare NAME EXPR` -- evaluates `EXPR` through the arithmetic
/// grammar and stores the joined result at `NAME`.
struct DeclareStmt;

impl Compiler for DeclareStmt {
    fn compile(&self, compilation: &Compilation, tree: TreeId) -> Option<Instruction> {
        let source = compilation.forest.get(tree).reference().text().ok()?;
        let captures = Regex::new(r"#declare\s+(\w+)\s+([^\n]+)\n").unwrap().captures(source)?;
        let name = captures.get(1)?.as_str().to_string();
        let expr = compile_arithmetic(captures.get(2)?.as_str());
        Some(Instruction::ComputeAlloc(name, Box::new(expr)))
    }
}

#[test]
fn declare_directive_evaluates_then_interpolates() {
    let document = Rc::new(Document::new("a.jam", "#declare X 2+3\n[X]"));
    let mut compilation = Compilation::new(document);

    let declare = Pattern::new(Regex::new(r"#declare\s+\w+\s+[^\n]+\n").unwrap(), "declare_stmt");
    parse_to_fixed_point(&ParseHierarchy::new(declare), &mut compilation).unwrap();

    let interp = Pattern::new(Regex::new(r"\[\w+\]").unwrap(), "interp_ref");
    parse_to_fixed_point(&ParseHierarchy::new(interp), &mut compilation).unwrap();

    let directives = Fallback(vec![
        Box::new(KindFilter::new("declare_stmt", DeclareStmt)),
        Box::new(KindFilter::new("interp_ref", InterpRef)),
    ]);
    let program = TemplateBody::new(directives).compile(&compilation, compilation.root).unwrap();

    let env = Environment::new();
    let mut memory = Memory::new();
    Instruction::ConsolePrint(Box::new(program)).exec(&env, &mut memory).unwrap();
    assert_eq!(memory.console(), "5");
}
