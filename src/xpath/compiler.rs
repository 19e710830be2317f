//! XPath Expression Compiler
//!
//! Flattens a parsed expression into a postfix op sequence for the
//! stack-based evaluator.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Replace the node-set on top of the stack with the nodes reached along
    /// an axis. Step predicates run per context node, in axis order.
    Navigate(Axis, CompiledNodeTest, Vec<CompiledExpr>),
    /// Filter the node-set on top of the stack in document order
    Predicate(Box<CompiledExpr>),
    Union,
    Number(f64),
    String(String),
    /// Function name and argument count
    Call(String, usize),
    Binary(BinaryOp),
    Negate,
    Variable(String),
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    /// Qualified name as written, `prefix:local`
    QName(String),
    /// Prefix followed by `:`
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                ops.push(Self::compile_step(step));
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Self::compile_step(step));
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step) -> Op {
        let node_test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(prefix, local) => CompiledNodeTest::QName(format!("{}:{}", prefix, local)),
            NodeTest::NamespaceWildcard(prefix) => CompiledNodeTest::NamespaceWildcard(format!("{}:", prefix)),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(target) => CompiledNodeTest::ProcessingInstruction(target.clone()),
        };
        let predicates = step.predicates.iter().map(CompiledExpr::compile).collect();
        Op::Navigate(step.axis, node_test, predicates)
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_absolute_path() {
        let compiled = compile("/root").unwrap();
        assert_eq!(
            compiled.ops,
            [
                Op::Root,
                Op::Navigate(Axis::Child, CompiledNodeTest::Name("root".into()), vec![]),
            ]
        );
    }

    #[test]
    fn test_compile_descendant() {
        let compiled = compile("//item").unwrap();
        assert_eq!(compiled.ops.len(), 3);
        assert!(matches!(compiled.ops[1], Op::Navigate(Axis::DescendantOrSelf, CompiledNodeTest::Node, _)));
    }

    #[test]
    fn test_step_predicates_stay_on_the_step() {
        let compiled = compile("item[2]").unwrap();
        match &compiled.ops[1] {
            Op::Navigate(Axis::Child, _, predicates) => {
                assert_eq!(predicates.len(), 1);
                assert_eq!(predicates[0].ops, [Op::Number(2.0)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compile_qualified_tests() {
        let compiled = compile("ns:a/ns:*").unwrap();
        assert!(compiled.ops.contains(&Op::Navigate(Axis::Child, CompiledNodeTest::QName("ns:a".into()), vec![])));
        assert!(compiled
            .ops
            .contains(&Op::Navigate(Axis::Child, CompiledNodeTest::NamespaceWildcard("ns:".into()), vec![])));
    }
}
