//! XPath Lexer
//!
//! Tokenizes XPath expressions. Operator names (`and`, `or`, `div`, `mod`)
//! and `*` are disambiguated by the preceding token: they are operators only
//! when something that ends an operand comes right before them.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * as a name test
    Multiply,    // * as an operator
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),         // NCName
    FunctionName(String), // name followed by (
    NameTest(String),     // prefix:* or prefix:local
    NodeType(String),     // node, text, comment, processing-instruction

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

impl Token {
    /// True when the token can end an operand, which makes a following
    /// `*` or operator name an operator
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::RightParen
                | Token::RightBracket
                | Token::Name(_)
                | Token::NameTest(_)
                | Token::Number(_)
                | Token::String(_)
                | Token::Dot
                | Token::DoubleDot
                | Token::Star
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    previous: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            previous: None,
        }
    }

    fn remaining(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if is_xml_whitespace(c) {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    fn operator_expected(&self) -> bool {
        self.previous.as_ref().is_some_and(Token::ends_operand)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, String> {
        let token = self.scan()?;
        self.previous = Some(token.clone());
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Token::DoubleDot
                } else if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else {
                    self.advance(1);
                    Token::Dot
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' if self.operator_expected() => self.single(Token::Multiply),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '!' => {
                if self.peek_at(1) != Some('=') {
                    return Err(format!("Unexpected '!' at position {}", self.pos));
                }
                self.advance(2);
                Token::NotEq
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            ':' => {
                if self.peek_at(1) != Some(':') {
                    return Err(format!("Unexpected ':' at position {}", self.pos));
                }
                self.advance(2);
                Token::DoubleColon
            }
            '"' | '\'' => self.read_string(c)?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => return Err(format!("Unexpected character '{}' at position {}", c, self.pos)),
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance(1);
        token
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let text = self.input.get(start..self.pos).unwrap_or("");
        Token::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let open = self.pos;
        self.advance(1);
        let rest = self.remaining();
        let end = rest
            .find(quote)
            .ok_or_else(|| format!("Unterminated string literal at position {}", open))?;
        let value = rest[..end].to_string();
        self.advance(end + 1);
        Ok(Token::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        self.input.get(start..self.pos).unwrap_or("")
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.operator_expected() {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::NameTest(format!("{}:*", name));
            }
            if self.peek_at(1).is_some_and(is_name_start_char) {
                self.advance(1);
                let local = self.read_ncname();
                let qname = format!("{}:{}", name, local);
                return match self.lookahead_non_space() {
                    Some('(') => Token::FunctionName(qname),
                    _ => Token::NameTest(qname),
                };
            }
        }

        let rest = self.remaining().trim_start_matches(is_xml_whitespace);
        if rest.starts_with("::") {
            Token::Axis(name.to_string())
        } else if rest.starts_with('(') {
            match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::FunctionName(name.to_string()),
            }
        } else {
            Token::Name(name.to_string())
        }
    }

    fn lookahead_non_space(&self) -> Option<char> {
        self.remaining().trim_start_matches(is_xml_whitespace).chars().next()
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
