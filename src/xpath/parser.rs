//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Location step applied to the result of an expression
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    Function(String, Vec<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Negate(Box<Expr>),
    Number(f64),
    String(String),
    Variable(String),
    /// Location step relative to the context node
    Step(Box<Step>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn abbreviated(axis: Axis) -> Self {
        Step {
            axis,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number their proximity positions nearest-first
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`: any node of the axis' principal type
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:local
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// XPath parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, String> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let expr = self.parse_or_expr()?;
        match self.current() {
            Token::Eof => Ok(expr),
            token => Err(format!("Unexpected token after expression: {:?}", token)),
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), String> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(format!("Expected {}, got {:?}", what, self.current()))
        }
    }

    fn parse_or_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and_expr()?;

        while *self.current() == Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality_expr()?;

        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }

        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match self.current() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive_expr()?;

        loop {
            let op = match self.current() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative_expr()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary_expr()?;

        loop {
            let op = match self.current() {
                Token::Multiply => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        if *self.current() == Token::Minus {
            self.advance();
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;

        while *self.current() == Token::Pipe {
            self.advance();
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// True if the current token can begin a location step
    fn at_step_start(&self) -> bool {
        matches!(
            self.current(),
            Token::Name(_)
                | Token::NameTest(_)
                | Token::Star
                | Token::NodeType(_)
                | Token::Axis(_)
                | Token::At
                | Token::Dot
                | Token::DoubleDot
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        match self.current() {
            Token::Slash => {
                self.advance();
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                self.parse_path_continuation(Expr::Path(Box::new(Expr::Root), Box::new(step)))
            }
            Token::DoubleSlash => {
                self.advance();
                let base = descendant_or_self(Expr::Root);
                let step = self.parse_step()?;
                self.parse_path_continuation(Expr::Path(Box::new(base), Box::new(step)))
            }
            _ if self.at_step_start() => {
                let step = self.parse_step()?;
                self.parse_path_continuation(Expr::Step(Box::new(step)))
            }
            _ => {
                let mut expr = self.parse_primary_expr()?;
                while *self.current() == Token::LeftBracket {
                    let pred = self.parse_predicate()?;
                    expr = Expr::Filter(Box::new(expr), Box::new(pred));
                }
                self.parse_path_continuation(expr)
            }
        }
    }

    /// Parse any `/step` and `//step` that follow an expression
    fn parse_path_continuation(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            match self.current() {
                Token::Slash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance();
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(descendant_or_self(expr)), Box::new(step));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_predicate(&mut self) -> Result<Expr, String> {
        self.expect(Token::LeftBracket, "[")?;
        let pred = self.parse_or_expr()?;
        self.expect(Token::RightBracket, "]")?;
        Ok(pred)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, String> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance();
                match self.current().clone() {
                    Token::Name(name) | Token::NameTest(name) => {
                        self.advance();
                        Ok(Expr::Variable(name))
                    }
                    _ => Err("Expected variable name".to_string()),
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or_expr()?;
                self.expect(Token::RightParen, ")")?;
                Ok(expr)
            }
            Token::FunctionName(name) => {
                self.advance();
                self.expect(Token::LeftParen, "(")?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            Token::Eof => Err("Unexpected end of expression".to_string()),
            token => Err(format!("Unexpected token: {:?}", token)),
        }
    }

    fn parse_step(&mut self) -> Result<Step, String> {
        let axis = match self.current().clone() {
            Token::Dot => {
                self.advance();
                return Ok(Step::abbreviated(Axis::Self_));
            }
            Token::DoubleDot => {
                self.advance();
                return Ok(Step::abbreviated(Axis::Parent));
            }
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(&name).ok_or_else(|| format!("Unknown axis: {}", name))?;
                self.advance();
                self.expect(Token::DoubleColon, "::")?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while *self.current() == Token::LeftBracket {
            predicates.push(self.parse_predicate()?);
        }
        if axis == Axis::Attribute && !predicates.is_empty() {
            return Err("Predicates on attribute steps are not supported".to_string());
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, String> {
        match self.current().clone() {
            Token::Star => {
                self.advance();
                Ok(NodeTest::Any)
            }
            Token::Name(name) => {
                self.advance();
                Ok(NodeTest::Name(name))
            }
            Token::NameTest(qname) => {
                self.advance();
                match qname.split_once(':') {
                    Some((prefix, "*")) => Ok(NodeTest::NamespaceWildcard(prefix.to_string())),
                    Some((prefix, local)) => Ok(NodeTest::QName(prefix.to_string(), local.to_string())),
                    None => Ok(NodeTest::Name(qname)),
                }
            }
            Token::NodeType(name) => {
                self.advance();
                self.expect(Token::LeftParen, "(")?;
                let target = match (name.as_str(), self.current().clone()) {
                    ("processing-instruction", Token::String(s)) => {
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(Token::RightParen, ")")?;

                match name.as_str() {
                    "node" => Ok(NodeTest::Node),
                    "text" => Ok(NodeTest::Text),
                    "comment" => Ok(NodeTest::Comment),
                    "processing-instruction" => Ok(NodeTest::ProcessingInstruction(target)),
                    _ => Err(format!("Unknown node type: {}", name)),
                }
            }
            Token::Eof => Err("Expected node test, got end of expression".to_string()),
            token => Err(format!("Expected node test, got {:?}", token)),
        }
    }

    /// Parse function arguments after the opening parenthesis
    fn parse_function_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();

        if *self.current() != Token::RightParen {
            args.push(self.parse_or_expr()?);

            while *self.current() == Token::Comma {
                self.advance();
                args.push(self.parse_or_expr()?);
            }
        }

        self.expect(Token::RightParen, ")")?;
        Ok(args)
    }
}

/// `base//step` is shorthand for `base/descendant-or-self::node()/step`
fn descendant_or_self(base: Expr) -> Expr {
    Expr::Path(Box::new(base), Box::new(Step::abbreviated(Axis::DescendantOrSelf)))
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, String> {
    Parser::new(input)?.parse()
}
