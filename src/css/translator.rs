//! CSS to XPath translation
//!
//! Each compound selector becomes an [`XPathExpr`] (path, element test,
//! predicate) and combinators join them left to right. The output is rooted
//! at `descendant-or-self::` so it matches the context element itself as well
//! as everything below it.

use super::parser::{
    parse_selector_group, AttributeMatcher, AttributeSelector, Combinator, ComplexSelector,
    CompoundSelector, NthExpression, PseudoClass, SelectorComponent,
};
use std::fmt;

const SELECTOR_PREFIX: &str = "descendant-or-self::";

/// Partial XPath location step being assembled from a compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathExpr {
    path: String,
    element: String,
    condition: String,
}

impl XPathExpr {
    pub fn new(element: impl Into<String>) -> Self {
        XPathExpr {
            path: String::new(),
            element: element.into(),
            condition: String::new(),
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// AND a predicate onto the existing one
    pub fn add_condition(&mut self, condition: &str) -> &mut Self {
        self.condition = if self.condition.is_empty() {
            condition.to_string()
        } else {
            format!("({}) and ({})", self.condition, condition)
        };
        self
    }

    /// Move the element test into the predicate as `name() = '...'`, leaving
    /// the step matching any element
    pub fn add_name_test(&mut self) -> &mut Self {
        if self.element != "*" {
            let test = format!("name() = {}", xpath_literal(&self.element));
            self.add_condition(&test);
            self.element = "*".to_string();
        }
        self
    }

    /// Step down to the element's children, so positional predicates are
    /// taken among siblings
    pub fn add_star_prefix(&mut self) -> &mut Self {
        self.path.push_str("*/");
        self
    }

    /// Append `other` after `combiner`, taking over its element and predicate
    pub fn join(&mut self, combiner: &str, other: XPathExpr) -> &mut Self {
        let mut path = format!("{}{}", self, combiner);
        if other.path != "*/" {
            path.push_str(&other.path);
        }
        self.path = path;
        self.element = other.element;
        self.condition = other.condition;
        self
    }
}

impl fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.element)?;
        if !self.condition.is_empty() {
            write!(f, "[{}]", self.condition)?;
        }
        Ok(())
    }
}

/// Quote a string as an XPath literal, falling back to `concat()` when it
/// contains both quote characters
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let mut parts = Vec::new();
    let mut rest = value;
    while let Some(pos) = rest.find('\'') {
        parts.push(format!("'{}'", &rest[..pos]));
        parts.push("\"'\"".to_string());
        rest = &rest[pos + 1..];
    }
    parts.push(format!("'{}'", rest));
    format!("concat({})", parts.join(", "))
}

fn is_safe_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') || !c.is_ascii())
}

/// Translates parsed selectors; `html` lowercases element and attribute
/// names and enables the HTML pseudo-classes
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    html: bool,
}

impl Translator {
    pub fn new(html: bool) -> Self {
        Translator { html }
    }

    /// Parse and translate a selector group, joining alternatives with `|`
    pub fn css_to_xpath(&self, css: &str) -> Result<String, String> {
        let selectors = parse_selector_group(css)?;
        let translated = selectors
            .iter()
            .map(|selector| {
                self.complex_to_xpath(selector)
                    .map(|xpath| format!("{}{}", SELECTOR_PREFIX, xpath))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(translated.join(" | "))
    }

    fn complex_to_xpath(&self, selector: &ComplexSelector) -> Result<XPathExpr, String> {
        let mut xpath = self.compound_to_xpath(&selector.first)?;
        for (combinator, compound) in &selector.rest {
            let right = self.compound_to_xpath(compound)?;
            match combinator {
                Combinator::Descendant => {
                    xpath.join("/descendant-or-self::*/", right);
                }
                Combinator::Child => {
                    xpath.join("/", right);
                }
                Combinator::NextSibling => {
                    xpath
                        .join("/following-sibling::", right)
                        .add_name_test()
                        .add_condition("position() = 1");
                }
                Combinator::SubsequentSibling => {
                    xpath.join("/following-sibling::", right);
                }
            }
        }
        Ok(xpath)
    }

    fn compound_to_xpath(&self, compound: &CompoundSelector) -> Result<XPathExpr, String> {
        let (mut element, mut safe) = match &compound.element {
            Some(name) => {
                let name = if self.html { name.to_lowercase() } else { name.clone() };
                let safe = is_safe_name(&name);
                (name, safe)
            }
            None => ("*".to_string(), true),
        };
        if let Some(ns) = &compound.namespace {
            element = format!("{}:{}", ns, element);
            safe = safe && is_safe_name(ns);
        }

        let mut xpath = XPathExpr::new(element);
        if !safe {
            xpath.add_name_test();
        }

        for component in &compound.components {
            match component {
                SelectorComponent::Id(id) => {
                    xpath.add_condition(&format!("@id = {}", xpath_literal(id)));
                }
                SelectorComponent::Class(class) => {
                    xpath.add_condition(&includes_condition("@class", class));
                }
                SelectorComponent::Attribute(attr) => {
                    xpath.add_condition(&self.attribute_condition(attr)?);
                }
                SelectorComponent::PseudoClass(pseudo) => self.apply_pseudo_class(&mut xpath, pseudo)?,
            }
        }
        Ok(xpath)
    }

    fn attribute_condition(&self, attr: &AttributeSelector) -> Result<String, String> {
        let mut name = if self.html { attr.name.to_lowercase() } else { attr.name.clone() };
        let mut safe = is_safe_name(&name);
        if let Some(ns) = &attr.namespace {
            name = format!("{}:{}", ns, name);
            safe = safe && is_safe_name(ns);
        }
        if !safe {
            return Err(format!("Attribute name \"{}\" cannot be used in a selector", name));
        }
        let attribute = format!("@{}", name);

        let condition = match &attr.matcher {
            None => attribute,
            Some(AttributeMatcher::Exact(value)) => format!("{} = {}", attribute, xpath_literal(value)),
            Some(AttributeMatcher::Includes(value)) => includes_condition(&attribute, value),
            Some(AttributeMatcher::DashMatch(value)) => format!(
                "{0} and ({0} = {1} or starts-with({0}, {2}))",
                attribute,
                xpath_literal(value),
                xpath_literal(&format!("{}-", value))
            ),
            Some(AttributeMatcher::Prefix(value)) if !value.is_empty() => {
                format!("{0} and starts-with({0}, {1})", attribute, xpath_literal(value))
            }
            Some(AttributeMatcher::Suffix(value)) if !value.is_empty() => format!(
                "{0} and substring({0}, string-length({0})-{1}) = {2}",
                attribute,
                value.chars().count() - 1,
                xpath_literal(value)
            ),
            Some(AttributeMatcher::Substring(value)) if !value.is_empty() => {
                format!("{0} and contains({0}, {1})", attribute, xpath_literal(value))
            }
            Some(AttributeMatcher::Prefix(_) | AttributeMatcher::Suffix(_) | AttributeMatcher::Substring(_)) => {
                "0".to_string()
            }
            Some(AttributeMatcher::NotEqual(value)) if value.is_empty() => {
                format!("{} != {}", attribute, xpath_literal(value))
            }
            Some(AttributeMatcher::NotEqual(value)) => {
                format!("not({0}) or {0} != {1}", attribute, xpath_literal(value))
            }
        };
        Ok(condition)
    }

    fn apply_pseudo_class(&self, xpath: &mut XPathExpr, pseudo: &PseudoClass) -> Result<(), String> {
        match pseudo {
            PseudoClass::Root => {
                xpath.add_condition("not(parent::*)");
            }
            PseudoClass::Empty => {
                xpath.add_condition("not(*) and not(string-length())");
            }
            PseudoClass::FirstChild => {
                xpath.add_star_prefix().add_name_test().add_condition("position() = 1");
            }
            PseudoClass::LastChild => {
                xpath.add_star_prefix().add_name_test().add_condition("position() = last()");
            }
            PseudoClass::OnlyChild => {
                xpath.add_star_prefix().add_name_test().add_condition("last() = 1");
            }
            PseudoClass::FirstOfType => {
                require_type(xpath, "first-of-type")?;
                xpath.add_star_prefix().add_condition("position() = 1");
            }
            PseudoClass::LastOfType => {
                require_type(xpath, "last-of-type")?;
                xpath.add_star_prefix().add_condition("position() = last()");
            }
            PseudoClass::OnlyOfType => {
                require_type(xpath, "only-of-type")?;
                let condition = format!(
                    "count(preceding-sibling::{0})=0 and count(following-sibling::{0})=0",
                    xpath.element()
                );
                xpath.add_condition(&condition);
            }
            PseudoClass::NthChild(nth) => nth_condition(xpath, *nth, false, true),
            PseudoClass::NthLastChild(nth) => nth_condition(xpath, *nth, true, true),
            PseudoClass::NthOfType(nth) => nth_condition(xpath, *nth, false, false),
            PseudoClass::NthLastOfType(nth) => {
                require_type(xpath, "nth-last-of-type")?;
                nth_condition(xpath, *nth, true, false);
            }
            PseudoClass::Not(inner) => {
                let mut negated = self.compound_to_xpath(inner)?;
                negated.add_name_test();
                if negated.condition().is_empty() {
                    xpath.add_condition("0");
                } else {
                    xpath.add_condition(&format!("not({})", negated.condition()));
                }
            }
            PseudoClass::Contains(text) => {
                xpath.add_condition(&format!("contains(string(.), {})", xpath_literal(text)));
            }
            PseudoClass::Lang(lang) if self.html => {
                xpath.add_condition(&format!(
                    "ancestor-or-self::*[@lang][1][starts-with(concat(translate(@lang, \
                     'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '-'), {})]",
                    xpath_literal(&format!("{}-", lang.to_lowercase()))
                ));
            }
            PseudoClass::Lang(lang) => {
                xpath.add_condition(&format!("lang({})", xpath_literal(lang)));
            }
            html_only => {
                if !self.html {
                    return Err(format!(
                        "The pseudo-class \":{}\" is only available for HTML documents",
                        html_pseudo_name(html_only)
                    ));
                }
                xpath.add_condition(html_pseudo_condition(html_only));
            }
        }
        Ok(())
    }
}

fn includes_condition(attribute: &str, value: &str) -> String {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return "0".to_string();
    }
    format!(
        "{0} and contains(concat(' ', normalize-space({0}), ' '), {1})",
        attribute,
        xpath_literal(&format!(" {} ", value))
    )
}

fn require_type(xpath: &XPathExpr, pseudo: &str) -> Result<(), String> {
    if xpath.element() == "*" {
        return Err(format!("\"*:{}\" is not implemented", pseudo));
    }
    Ok(())
}

/// `:nth-*` as position arithmetic over the sibling step
fn nth_condition(xpath: &mut XPathExpr, nth: NthExpression, last: bool, add_name_test: bool) {
    let NthExpression { a, mut b } = nth;

    xpath.add_star_prefix();
    if add_name_test {
        xpath.add_name_test();
    }

    if a == 0 {
        let condition = if last {
            format!("position() = last() - {}", b - 1)
        } else {
            format!("position() = {}", b)
        };
        xpath.add_condition(&condition);
        return;
    }

    let sign = if a < 0 {
        if b < 1 {
            xpath.add_condition("false()");
            return;
        }
        "<="
    } else {
        ">="
    };

    let mut expr = "position()".to_string();
    if last {
        expr = format!("last() - {}", expr);
        b -= 1;
    }
    if b != 0 {
        expr = format!("{} - {}", expr, b);
    }

    let mut conditions = vec![format!("{} {} 0", expr, sign)];
    if a != 1 && a != -1 {
        conditions.push(format!("({}) mod {} = 0", expr, a));
    }
    xpath.add_condition(&conditions.join(" and "));
}

fn html_pseudo_name(pseudo: &PseudoClass) -> &'static str {
    match pseudo {
        PseudoClass::Checked => "checked",
        PseudoClass::Link => "link",
        PseudoClass::Disabled => "disabled",
        PseudoClass::Enabled => "enabled",
        PseudoClass::Selected => "selected",
        PseudoClass::Invalid => "invalid",
        PseudoClass::Hover => "hover",
        PseudoClass::Visited => "visited",
        _ => "",
    }
}

fn html_pseudo_condition(pseudo: &PseudoClass) -> &'static str {
    match pseudo {
        PseudoClass::Checked => {
            "(@checked and (name(.) = 'input' or name(.) = 'command')and (@type = 'checkbox' or @type = 'radio'))"
        }
        PseudoClass::Link => "@href and (name(.) = 'a' or name(.) = 'link' or name(.) = 'area')",
        PseudoClass::Disabled => concat!(
            "(@disabled and(",
            "(name(.) = 'input' and @type != 'hidden')",
            " or name(.) = 'button' or name(.) = 'select' or name(.) = 'textarea'",
            " or name(.) = 'command' or name(.) = 'fieldset' or name(.) = 'optgroup' or name(.) = 'option'",
            ")) or (",
            "(name(.) = 'input' and @type != 'hidden')",
            " or name(.) = 'button' or name(.) = 'select' or name(.) = 'textarea'",
            ") and ancestor::fieldset[@disabled]"
        ),
        PseudoClass::Enabled => concat!(
            "((@href and (name(.) = 'a' or name(.) = 'link' or name(.) = 'area'))",
            " or ((name(.) = 'command' or name(.) = 'fieldset' or name(.) = 'optgroup') and not(@disabled))",
            " or (((name(.) = 'input' and @type != 'hidden')",
            " or name(.) = 'button' or name(.) = 'select' or name(.) = 'textarea' or name(.) = 'keygen')",
            " and not(@disabled or ancestor::fieldset[@disabled]))",
            " or (name(.) = 'option' and not(@disabled or ancestor::optgroup[@disabled])))"
        ),
        PseudoClass::Selected => "(@selected and name(.) = 'option')",
        _ => "0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(css: &str) -> String {
        Translator::new(true).css_to_xpath(css).unwrap()
    }

    fn xml(css: &str) -> String {
        Translator::new(false).css_to_xpath(css).unwrap()
    }

    #[test]
    fn test_xpath_literal() {
        assert_eq!(xpath_literal("abc"), "'abc'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn test_type_and_universal() {
        assert_eq!(html("item"), "descendant-or-self::item");
        assert_eq!(html("*"), "descendant-or-self::*");
        assert_eq!(html("ITEM"), "descendant-or-self::item");
        assert_eq!(xml("ITEM"), "descendant-or-self::ITEM");
        assert_eq!(html("ns|item"), "descendant-or-self::ns:item");
    }

    #[test]
    fn test_group() {
        assert_eq!(html("a, b"), "descendant-or-self::a | descendant-or-self::b");
    }

    #[test]
    fn test_id_and_class() {
        assert_eq!(html("#main"), "descendant-or-self::*[@id = 'main']");
        assert_eq!(
            html("p.note"),
            "descendant-or-self::p[@class and contains(concat(' ', normalize-space(@class), ' '), ' note ')]"
        );
        assert_eq!(
            html("a#x[href]"),
            "descendant-or-self::a[(@id = 'x') and (@href)]"
        );
    }

    #[test]
    fn test_attribute_operators() {
        assert_eq!(html("[a=b]"), "descendant-or-self::*[@a = 'b']");
        assert_eq!(
            html("[lang|=en]"),
            "descendant-or-self::*[@lang and (@lang = 'en' or starts-with(@lang, 'en-'))]"
        );
        assert_eq!(html("[a^=x]"), "descendant-or-self::*[@a and starts-with(@a, 'x')]");
        assert_eq!(
            html("[a$=xyz]"),
            "descendant-or-self::*[@a and substring(@a, string-length(@a)-2) = 'xyz']"
        );
        assert_eq!(html("[a*=x]"), "descendant-or-self::*[@a and contains(@a, 'x')]");
        assert_eq!(html("[a^='']"), "descendant-or-self::*[0]");
        assert_eq!(html("[a!=x]"), "descendant-or-self::*[not(@a) or @a != 'x']");
        assert_eq!(html("[HREF]"), "descendant-or-self::*[@href]");
        assert_eq!(xml("[HREF]"), "descendant-or-self::*[@HREF]");
    }

    #[test]
    fn test_combinators() {
        assert_eq!(html("a b"), "descendant-or-self::a/descendant-or-self::*/b");
        assert_eq!(html("a > b"), "descendant-or-self::a/b");
        assert_eq!(html("a ~ b"), "descendant-or-self::a/following-sibling::b");
        assert_eq!(
            html("a + b"),
            "descendant-or-self::a/following-sibling::*[(name() = 'b') and (position() = 1)]"
        );
    }

    #[test]
    fn test_structural_pseudo_classes() {
        assert_eq!(
            html("li:first-child"),
            "descendant-or-self::*/*[(name() = 'li') and (position() = 1)]"
        );
        assert_eq!(html("ul > :last-child"), "descendant-or-self::ul/*[position() = last()]");
        assert_eq!(html("li:first-of-type"), "descendant-or-self::*/li[position() = 1]");
        assert_eq!(html(":root"), "descendant-or-self::*[not(parent::*)]");
        assert_eq!(
            html("p:empty"),
            "descendant-or-self::p[not(*) and not(string-length())]"
        );
        assert_eq!(
            html("b:only-of-type"),
            "descendant-or-self::b[count(preceding-sibling::b)=0 and count(following-sibling::b)=0]"
        );
    }

    #[test]
    fn test_nth_child() {
        assert_eq!(
            html("li:nth-child(3)"),
            "descendant-or-self::*/*[(name() = 'li') and (position() = 3)]"
        );
        assert_eq!(
            html("li:nth-child(2n+1)"),
            "descendant-or-self::*/*[(name() = 'li') and (position() - 1 >= 0 and (position() - 1) mod 2 = 0)]"
        );
        assert_eq!(
            html("li:nth-last-child(2)"),
            "descendant-or-self::*/*[(name() = 'li') and (position() = last() - 1)]"
        );
        assert_eq!(
            html("li:nth-of-type(-n+2)"),
            "descendant-or-self::*/li[position() - 2 <= 0]"
        );
        assert_eq!(
            html("li:nth-child(-n)"),
            "descendant-or-self::*/*[(name() = 'li') and (false())]"
        );
    }

    #[test]
    fn test_not_contains_lang() {
        assert_eq!(html("a:not(.x)"),
            "descendant-or-self::a[not(@class and contains(concat(' ', normalize-space(@class), ' '), ' x '))]");
        assert_eq!(html("a:not(*)"), "descendant-or-self::a[0]");
        assert_eq!(html("p:not(b)"), "descendant-or-self::p[not(name() = 'b')]");
        assert_eq!(
            html("p:contains('hi')"),
            "descendant-or-self::p[contains(string(.), 'hi')]"
        );
        assert_eq!(xml("p:lang(en)"), "descendant-or-self::p[lang('en')]");
        assert!(html("p:lang(EN)").contains("'en-'"));
    }

    #[test]
    fn test_html_only_pseudo_classes() {
        assert_eq!(html("option:selected"), "descendant-or-self::option[(@selected and name(.) = 'option')]");
        assert_eq!(html("a:hover"), "descendant-or-self::a[0]");
        let err = Translator::new(false).css_to_xpath("input:checked").unwrap_err();
        assert!(err.contains("only available for HTML"));
    }

    #[test]
    fn test_translation_errors() {
        let translator = Translator::new(true);
        assert!(translator.css_to_xpath("*:first-of-type").is_err());
        assert!(translator.css_to_xpath(":nth-last-of-type(2)").is_err());
        assert!(translator.css_to_xpath("[a\\ b]").is_err());
    }

    #[test]
    fn test_translations_compile() {
        for css in [
            "a b > c + d ~ e",
            "li:nth-child(2n+1)",
            "li:nth-last-child(-2n+3)",
            "input:enabled, input:disabled, input:checked",
            "a:link, p:lang(en), p:contains(\"it's\")",
            ":not(.a)[b|=c]",
        ] {
            let xpath = html(css);
            assert!(crate::xpath::compile(&xpath).is_ok(), "{css} -> {xpath}");
        }
    }
}
