//! CSS Selector Parser
//!
//! Parses selector groups (`a > b.c, d:first-child`) into compound selectors
//! joined by combinators. Pseudo-elements are rejected since no XPath node
//! corresponds to them.

/// Combinator between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub namespace: Option<String>,
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Includes(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
    /// [attr!=value] - absent or different
    NotEqual(String),
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse "odd", "even", "n", "3", "2n+1", "-n+3" (whitespace ignored)
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();

        match s.as_str() {
            "odd" => return Some(Self::new(2, 1)),
            "even" => return Some(Self::new(2, 0)),
            "n" => return Some(Self::new(1, 0)),
            _ => {}
        }

        let Some((a_str, b_str)) = s.split_once('n') else {
            return s.parse().ok().map(|b| Self::new(0, b));
        };

        let a = match a_str {
            "" | "+" => 1,
            "-" => -1,
            _ => a_str.parse().ok()?,
        };
        let b = if b_str.is_empty() { 0 } else { b_str.parse().ok()? };
        Some(Self::new(a, b))
    }
}

/// Pseudo-class
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    // Tree-structural pseudo-classes
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    NthOfType(NthExpression),
    NthLastOfType(NthExpression),

    // Logical and content pseudo-classes
    Not(Box<CompoundSelector>),
    Contains(String),
    Lang(String),

    // HTML pseudo-classes
    Checked,
    Link,
    Disabled,
    Enabled,
    Selected,
    Invalid,
    Hover,
    Visited,
}

/// A simple selector following the type selector of a compound
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :first-child, :nth-child(), etc.
    PseudoClass(PseudoClass),
}

/// Type selector plus the simple selectors attached to it, e.g. `ns|a.b[c]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSelector {
    pub namespace: Option<String>,
    /// `None` for `*` or an omitted type selector
    pub element: Option<String>,
    pub components: Vec<SelectorComponent>,
}

/// Compound selectors joined by combinators, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// Parse a comma-separated selector group
pub fn parse_selector_group(input: &str) -> Result<Vec<ComplexSelector>, String> {
    let mut parser = CssParser { input, pos: 0 };
    let mut selectors = Vec::new();

    loop {
        parser.skip_whitespace();
        selectors.push(parser.parse_complex()?);
        parser.skip_whitespace();
        match parser.peek() {
            None => return Ok(selectors),
            Some(',') => parser.advance(1),
            Some(c) => return Err(parser.unexpected(c)),
        }
    }
}

struct CssParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> CssParser<'a> {
    fn remaining(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, chars: usize) {
        for _ in 0..chars {
            if let Some(c) = self.peek() {
                self.pos += c.len_utf8();
            }
        }
    }

    /// Skip whitespace, reporting whether any was present
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance(1);
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance(1);
                Ok(())
            }
            Some(c) => Err(format!("Expected '{}', got '{}' at position {}", expected, c, self.pos)),
            None => Err(format!("Expected '{}', got end of selector", expected)),
        }
    }

    fn unexpected(&self, c: char) -> String {
        format!("Unexpected '{}' at position {}", c, self.pos)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, String> {
        let first = self.parse_compound(false)?;
        let mut rest = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            };
            if combinator != Combinator::Descendant {
                self.advance(1);
                self.skip_whitespace();
            }
            rest.push((combinator, self.parse_compound(false)?));
        }

        Ok(ComplexSelector { first, rest })
    }

    fn parse_compound(&mut self, inside_negation: bool) -> Result<CompoundSelector, String> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();

        if self.at_type_selector() {
            let first = self.parse_name_or_star()?;
            if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
                self.advance(1);
                compound.namespace = first;
                compound.element = self.parse_name_or_star()?;
            } else {
                compound.element = first;
            }
        }

        loop {
            let component = match self.peek() {
                Some('#') => {
                    self.advance(1);
                    SelectorComponent::Id(self.parse_hash_name()?)
                }
                Some('.') => {
                    self.advance(1);
                    SelectorComponent::Class(self.parse_identifier()?)
                }
                Some('[') => SelectorComponent::Attribute(self.parse_attribute()?),
                Some(':') => SelectorComponent::PseudoClass(self.parse_pseudo(inside_negation)?),
                _ => break,
            };
            compound.components.push(component);
        }

        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => format!("Expected selector, got '{}' at position {}", c, self.pos),
                None => "Expected selector, got end of selector".to_string(),
            });
        }
        Ok(compound)
    }

    fn at_type_selector(&self) -> bool {
        match self.peek() {
            Some('*') | Some('|') => true,
            Some('-') => self.peek_at(1).is_some_and(|c| is_name_start(c) || c == '\\'),
            Some('\\') => true,
            Some(c) => is_name_start(c),
            None => false,
        }
    }

    /// `*` yields `None`; an empty name (as in `|a`) also yields `None`
    fn parse_name_or_star(&mut self) -> Result<Option<String>, String> {
        match self.peek() {
            Some('*') => {
                self.advance(1);
                Ok(None)
            }
            Some('|') => Ok(None),
            _ => self.parse_identifier().map(Some),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, String> {
        let mut ident = String::new();
        if self.peek() == Some('-') {
            ident.push('-');
            self.advance(1);
        }
        match self.peek() {
            Some('\\') => ident.push(self.parse_escape()?),
            Some(c) if is_name_start(c) => {
                ident.push(c);
                self.advance(1);
            }
            Some(c) => return Err(format!("Expected identifier, got '{}' at position {}", c, self.pos)),
            None => return Err("Expected identifier, got end of selector".to_string()),
        }
        self.parse_name_chars(&mut ident)?;
        Ok(ident)
    }

    /// Hash names may start with a digit
    fn parse_hash_name(&mut self) -> Result<String, String> {
        let mut name = String::new();
        self.parse_name_chars(&mut name)?;
        if name.is_empty() {
            return Err(format!("Expected id after '#' at position {}", self.pos));
        }
        Ok(name)
    }

    fn parse_name_chars(&mut self, out: &mut String) -> Result<(), String> {
        while let Some(c) = self.peek() {
            if c == '\\' {
                out.push(self.parse_escape()?);
            } else if is_name_char(c) {
                out.push(c);
                self.advance(1);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// `\` followed by up to six hex digits (and one optional space), or any
    /// other character taken literally
    fn parse_escape(&mut self) -> Result<char, String> {
        self.advance(1);
        let hex: String = self
            .remaining()
            .chars()
            .take_while(char::is_ascii_hexdigit)
            .take(6)
            .collect();
        if !hex.is_empty() {
            self.advance(hex.len());
            if self.peek().is_some_and(char::is_whitespace) {
                self.advance(1);
            }
            let code = u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
            return Ok(char::from_u32(code).filter(|&c| c != '\0').unwrap_or('\u{FFFD}'));
        }
        match self.peek() {
            Some(c) => {
                self.advance(1);
                Ok(c)
            }
            None => Err("Incomplete escape at end of selector".to_string()),
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(format!("Expected string at position {}", self.pos)),
        };
        let open = self.pos;
        self.advance(1);

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(format!("Unterminated string starting at position {}", open)),
                Some(c) if c == quote => {
                    self.advance(1);
                    return Ok(value);
                }
                Some('\\') if self.peek_at(1) == Some('\n') => self.advance(2),
                Some('\\') => value.push(self.parse_escape()?),
                Some(c) => {
                    value.push(c);
                    self.advance(1);
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, String> {
        self.expect('[')?;
        self.skip_whitespace();

        let mut namespace = None;
        let mut name = if self.peek() == Some('|') {
            String::new()
        } else if self.peek() == Some('*') && self.peek_at(1) == Some('|') {
            self.advance(1);
            String::new()
        } else {
            self.parse_identifier()?
        };
        if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.advance(1);
            namespace = Some(name).filter(|n| !n.is_empty());
            name = self.parse_identifier()?;
        }
        if name.is_empty() {
            return Err(format!("Expected attribute name at position {}", self.pos));
        }

        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.advance(1);
            return Ok(AttributeSelector {
                namespace,
                name,
                matcher: None,
            });
        }

        let op: String = match (self.peek(), self.peek_at(1)) {
            (Some('='), _) => "=".to_string(),
            (Some(c @ ('~' | '|' | '^' | '$' | '*' | '!')), Some('=')) => format!("{}=", c),
            (Some(c), _) => return Err(format!("Operator expected, got '{}' at position {}", c, self.pos)),
            (None, _) => return Err("Operator expected, got end of selector".to_string()),
        };
        self.advance(op.chars().count());
        self.skip_whitespace();

        let value = match self.peek() {
            Some('"' | '\'') => self.parse_string()?,
            Some(c) if c.is_ascii_digit() || c == '+' || c == '.' => self.parse_number_text(),
            _ => self.parse_identifier()?,
        };
        self.skip_whitespace();
        self.expect(']')?;

        let matcher = match op.as_str() {
            "=" => AttributeMatcher::Exact(value),
            "~=" => AttributeMatcher::Includes(value),
            "|=" => AttributeMatcher::DashMatch(value),
            "^=" => AttributeMatcher::Prefix(value),
            "$=" => AttributeMatcher::Suffix(value),
            "*=" => AttributeMatcher::Substring(value),
            _ => AttributeMatcher::NotEqual(value),
        };
        Ok(AttributeSelector {
            namespace,
            name,
            matcher: Some(matcher),
        })
    }

    fn parse_number_text(&mut self) -> String {
        let mut text = String::new();
        if let Some(c @ ('+' | '-')) = self.peek() {
            text.push(c);
            self.advance(1);
        }
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit() || *c == '.') {
            text.push(c);
            self.advance(1);
        }
        text
    }

    fn parse_pseudo(&mut self, inside_negation: bool) -> Result<PseudoClass, String> {
        self.expect(':')?;
        if self.peek() == Some(':') {
            return Err("Pseudo-elements are not supported".to_string());
        }
        let name = self.parse_identifier()?.to_lowercase();

        if self.peek() != Some('(') {
            return match name.as_str() {
                "root" => Ok(PseudoClass::Root),
                "empty" => Ok(PseudoClass::Empty),
                "first-child" => Ok(PseudoClass::FirstChild),
                "last-child" => Ok(PseudoClass::LastChild),
                "only-child" => Ok(PseudoClass::OnlyChild),
                "first-of-type" => Ok(PseudoClass::FirstOfType),
                "last-of-type" => Ok(PseudoClass::LastOfType),
                "only-of-type" => Ok(PseudoClass::OnlyOfType),
                "checked" => Ok(PseudoClass::Checked),
                "link" => Ok(PseudoClass::Link),
                "disabled" => Ok(PseudoClass::Disabled),
                "enabled" => Ok(PseudoClass::Enabled),
                "selected" => Ok(PseudoClass::Selected),
                "invalid" => Ok(PseudoClass::Invalid),
                "hover" => Ok(PseudoClass::Hover),
                "visited" => Ok(PseudoClass::Visited),
                "first-line" | "first-letter" | "before" | "after" => {
                    Err("Pseudo-elements are not supported".to_string())
                }
                _ => Err(format!("The pseudo-class \":{}\" is not supported", name)),
            };
        }

        self.advance(1);
        self.skip_whitespace();

        let pseudo = match name.as_str() {
            "not" => {
                if inside_negation {
                    return Err("Got nested :not()".to_string());
                }
                PseudoClass::Not(Box::new(self.parse_compound(true)?))
            }
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                let raw = self.take_until_close_paren()?;
                if raw.contains(['"', '\'']) {
                    return Err(format!("Expected an An+B expression for :{}(), got a string", name));
                }
                let nth = NthExpression::parse(&raw)
                    .ok_or_else(|| format!("Invalid An+B expression \"{}\" for :{}()", raw.trim(), name))?;
                match name.as_str() {
                    "nth-child" => PseudoClass::NthChild(nth),
                    "nth-last-child" => PseudoClass::NthLastChild(nth),
                    "nth-of-type" => PseudoClass::NthOfType(nth),
                    _ => PseudoClass::NthLastOfType(nth),
                }
            }
            "contains" => PseudoClass::Contains(self.parse_text_argument(&name)?),
            "lang" => PseudoClass::Lang(self.parse_text_argument(&name)?),
            _ => return Err(format!("The pseudo-class \":{}()\" is not supported", name)),
        };

        self.skip_whitespace();
        self.expect(')')?;
        Ok(pseudo)
    }

    fn take_until_close_paren(&mut self) -> Result<String, String> {
        let rest = self.remaining();
        let end = rest
            .find(')')
            .ok_or_else(|| "Expected ')', got end of selector".to_string())?;
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    /// Single string or identifier argument
    fn parse_text_argument(&mut self, function: &str) -> Result<String, String> {
        match self.peek() {
            Some('"' | '\'') => self.parse_string(),
            Some(c) if is_name_start(c) || c == '-' || c == '\\' => self.parse_identifier(),
            _ => Err(format!("Expected a single string or identifier for :{}()", function)),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> ComplexSelector {
        let mut group = parse_selector_group(input).unwrap();
        assert_eq!(group.len(), 1);
        group.remove(0)
    }

    #[test]
    fn test_nth_expression_parse() {
        assert_eq!(NthExpression::parse("odd"), Some(NthExpression::new(2, 1)));
        assert_eq!(NthExpression::parse("even"), Some(NthExpression::new(2, 0)));
        assert_eq!(NthExpression::parse("3"), Some(NthExpression::new(0, 3)));
        assert_eq!(NthExpression::parse("2n + 1"), Some(NthExpression::new(2, 1)));
        assert_eq!(NthExpression::parse("-n+3"), Some(NthExpression::new(-1, 3)));
        assert_eq!(NthExpression::parse("n"), Some(NthExpression::new(1, 0)));
        assert_eq!(NthExpression::parse("3n-2"), Some(NthExpression::new(3, -2)));
        assert_eq!(NthExpression::parse("foo"), None);
    }

    #[test]
    fn test_compound() {
        let sel = single("div#main.big[data-x='1']:first-child");
        assert_eq!(sel.first.element.as_deref(), Some("div"));
        assert_eq!(
            sel.first.components,
            [
                SelectorComponent::Id("main".into()),
                SelectorComponent::Class("big".into()),
                SelectorComponent::Attribute(AttributeSelector {
                    namespace: None,
                    name: "data-x".into(),
                    matcher: Some(AttributeMatcher::Exact("1".into())),
                }),
                SelectorComponent::PseudoClass(PseudoClass::FirstChild),
            ]
        );
    }

    #[test]
    fn test_combinators() {
        let sel = single("a b>c + d ~ e");
        let combinators: Vec<_> = sel.rest.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            [
                Combinator::Descendant,
                Combinator::Child,
                Combinator::NextSibling,
                Combinator::SubsequentSibling,
            ]
        );
    }

    #[test]
    fn test_group_and_universal() {
        let group = parse_selector_group("*, ns|item , [href]").unwrap();
        assert_eq!(group.len(), 3);
        assert_eq!(group[0].first, CompoundSelector::default());
        assert_eq!(group[1].first.namespace.as_deref(), Some("ns"));
        assert_eq!(group[1].first.element.as_deref(), Some("item"));
        assert!(group[2].first.element.is_none());
    }

    #[test]
    fn test_attribute_operators() {
        let sel = single("[a~=b][c|=d][e^='f'][g$=\"h\"][i*=j][k!=l][m=2]");
        let matchers: Vec<_> = sel
            .first
            .components
            .iter()
            .map(|c| match c {
                SelectorComponent::Attribute(a) => a.matcher.clone().unwrap(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            matchers,
            [
                AttributeMatcher::Includes("b".into()),
                AttributeMatcher::DashMatch("d".into()),
                AttributeMatcher::Prefix("f".into()),
                AttributeMatcher::Suffix("h".into()),
                AttributeMatcher::Substring("j".into()),
                AttributeMatcher::NotEqual("l".into()),
                AttributeMatcher::Exact("2".into()),
            ]
        );
    }

    #[test]
    fn test_functional_pseudo_classes() {
        let sel = single("li:nth-child(2n+1):not(.x):contains('hi there'):lang(en)");
        assert_eq!(
            sel.first.components,
            [
                SelectorComponent::PseudoClass(PseudoClass::NthChild(NthExpression::new(2, 1))),
                SelectorComponent::PseudoClass(PseudoClass::Not(Box::new(CompoundSelector {
                    namespace: None,
                    element: None,
                    components: vec![SelectorComponent::Class("x".into())],
                }))),
                SelectorComponent::PseudoClass(PseudoClass::Contains("hi there".into())),
                SelectorComponent::PseudoClass(PseudoClass::Lang("en".into())),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        let sel = single(r"#a\:b .c\31 23");
        assert_eq!(sel.first.components, [SelectorComponent::Id("a:b".into())]);
        assert_eq!(sel.rest[0].1.components, [SelectorComponent::Class("c123".into())]);
    }

    #[test]
    fn test_errors() {
        for bad in [
            "",
            "a,",
            "a >",
            "p::before",
            "p:after",
            ":hovering",
            ":not(:not(a))",
            "[a=]",
            "[a=b",
            "a:nth-child(x)",
            "a:nth-child('1')",
            "a:contains()",
            "a!b",
        ] {
            assert!(parse_selector_group(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
