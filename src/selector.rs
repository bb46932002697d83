//! Selector matching.
//!
//! A [`CssSelector`] is an ordered list of OR-groups. Each group is an AND of
//! an optional tag name, attribute (name, optional value) pairs and classes,
//! with an optional list of negated simple selectors (`:not(...)`).
//!
//! Selectors are parsed when a definition is built, so malformed text fails
//! immediately instead of at first use.
//!
//! ```text
//! "child"                    tag
//! "[some-directive]"         attribute present
//! "span[title=toFirst]"      tag AND attribute value
//! "button.primary"           tag AND class
//! "div:not(.hidden)"         tag AND NOT class
//! "a, [link]"                OR
//! ```

use std::fmt;

use crate::error::SelectorError;

// =============================================================================
// Types
// =============================================================================

/// An AND of tag / attribute / class constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    /// `(name, value)`; `None` value means "attribute present".
    pub attrs: Vec<(String, Option<String>)>,
    pub classes: Vec<String>,
}

/// One OR-group: a positive simple selector plus negations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorGroup {
    pub positive: SimpleSelector,
    pub not: Vec<SimpleSelector>,
}

/// An OR of selector groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelector {
    groups: Vec<SelectorGroup>,
}

impl SimpleSelector {
    /// Tag-only selector.
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            tag: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add an attribute constraint.
    pub fn attr(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.attrs.push((name.into(), value.map(str::to_string)));
        self
    }

    /// Add a class constraint.
    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.classes.push(name.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.attrs.is_empty() && self.classes.is_empty()
    }

    /// Match against an element's tag and flat attribute pairs.
    ///
    /// Tag and attribute names compare case-insensitively, values exactly.
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        if let Some(expected) = &self.tag {
            if expected != "*" && !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        for (name, value) in &self.attrs {
            let found = attrs
                .iter()
                .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name));
            match (found, value) {
                (None, _) => return false,
                (Some((_, actual)), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }

        if !self.classes.is_empty() {
            let class_attr = attrs
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("class"))
                .map(|(_, value)| value.as_str())
                .unwrap_or("");
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }

        true
    }
}

impl SelectorGroup {
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        self.positive.matches(tag, attrs) && !self.not.iter().any(|n| n.matches(tag, attrs))
    }
}

impl CssSelector {
    /// Build from explicit groups.
    pub fn from_groups(groups: Vec<SelectorGroup>) -> Result<Self, SelectorError> {
        if groups.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self { groups })
    }

    /// Single-group selector from a simple selector.
    pub fn simple(selector: SimpleSelector) -> Self {
        Self {
            groups: vec![SelectorGroup {
                positive: selector,
                not: Vec::new(),
            }],
        }
    }

    /// Parse CSS-like selector text.
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        Parser::new(text).parse()
    }

    pub fn groups(&self) -> &[SelectorGroup] {
        &self.groups
    }

    /// The tag name, if every group requires the same one.
    pub fn tag_name(&self) -> Option<&str> {
        let first = self.groups.first()?.positive.tag.as_deref()?;
        self.groups
            .iter()
            .all(|g| g.positive.tag.as_deref() == Some(first))
            .then_some(first)
    }

    /// True if any group matches.
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        self.groups.iter().any(|g| g.matches(tag, attrs))
    }
}

impl std::str::FromStr for CssSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CssSelector::parse(s)
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for (name, value) in &self.attrs {
            match value {
                Some(v) => write!(f, "[{name}={v}]")?,
                None => write!(f, "[{name}]")?,
            }
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CssSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", group.positive)?;
            for not in &group.not {
                write!(f, ":not({not})")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '*'
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.text.len())
    }

    fn unexpected(&self, ch: char) -> SelectorError {
        SelectorError::UnexpectedChar {
            selector: self.text.to_string(),
            ch,
            offset: self.offset(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn name(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_name_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn parse(mut self) -> Result<CssSelector, SelectorError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            let group = self.group()?;
            if group.positive.is_empty() && group.not.is_empty() {
                return Err(SelectorError::EmptyGroup(self.text.to_string()));
            }
            groups.push(group);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(CssSelector { groups })
    }

    fn group(&mut self) -> Result<SelectorGroup, SelectorError> {
        let positive = self.simple()?;
        let mut not = Vec::new();
        while self.peek() == Some(':') {
            let rest = &self.text[self.offset()..];
            if !rest.starts_with(":not(") {
                return Err(self.unexpected(':'));
            }
            self.pos += ":not(".chars().count();
            self.skip_ws();
            let negated = self.simple()?;
            self.skip_ws();
            if self.peek() != Some(')') {
                return Err(SelectorError::UnterminatedNot(self.text.to_string()));
            }
            self.pos += 1;
            if negated.is_empty() {
                return Err(SelectorError::EmptyGroup(self.text.to_string()));
            }
            not.push(negated);
        }
        Ok(SelectorGroup { positive, not })
    }

    fn simple(&mut self) -> Result<SimpleSelector, SelectorError> {
        let mut selector = SimpleSelector::default();
        let tag = self.name();
        if !tag.is_empty() {
            selector.tag = Some(tag);
        }

        loop {
            match self.peek() {
                Some('[') => {
                    self.pos += 1;
                    self.skip_ws();
                    let name = self.name();
                    if name.is_empty() {
                        return Err(match self.peek() {
                            Some(c) => self.unexpected(c),
                            None => SelectorError::UnterminatedAttribute(self.text.to_string()),
                        });
                    }
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.pos += 1;
                        Some(self.attr_value()?)
                    } else {
                        None
                    };
                    self.skip_ws();
                    match self.peek() {
                        Some(']') => self.pos += 1,
                        Some(c) => return Err(self.unexpected(c)),
                        None => {
                            return Err(SelectorError::UnterminatedAttribute(
                                self.text.to_string(),
                            ));
                        }
                    }
                    selector.attrs.push((name, value));
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.name();
                    if class.is_empty() {
                        return Err(match self.peek() {
                            Some(c) => self.unexpected(c),
                            None => SelectorError::EmptyGroup(self.text.to_string()),
                        });
                    }
                    selector.classes.push(class);
                }
                _ => break,
            }
        }
        Ok(selector)
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c == quote => {
                            self.pos += 1;
                            return Ok(out);
                        }
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => {
                            return Err(SelectorError::UnterminatedAttribute(
                                self.text.to_string(),
                            ));
                        }
                    }
                }
            }
            _ => {
                let mut out = String::new();
                while let Some(c) = self.peek().filter(|c| *c != ']' && !c.is_whitespace()) {
                    out.push(c);
                    self.pos += 1;
                }
                Ok(out)
            }
        }
    }
}
