//! ICU MessageFormat patterns.
//!
//! Supported syntax:
//! - `{name}` and formatted arguments such as `{n, number}` (the value is
//!   inserted as given)
//! - `{n, plural, =0 {none} one {# item} other {# items}}` with an optional
//!   `offset:N`, and `selectordinal` with the same branch syntax
//! - `{kind, select, admin {…} other {…}}`
//! - `#` inside plural branches, `''` for a literal apostrophe and `'…'`
//!   quoting around braces
//!
//! Every `plural`, `selectordinal` and `select` needs an `other` branch.

use crate::i18n::Locale;
use icu_plurals::{PluralCategory, PluralOperands, PluralRuleType, PluralRules};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    Argument(String),
    /// `#` inside a plural branch
    Pound,
    Plural {
        name: String,
        ordinal: bool,
        offset: f64,
        branches: Vec<(PluralKey, Vec<Segment>)>,
    },
    Select {
        name: String,
        branches: Vec<(String, Vec<Segment>)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PluralKey {
    /// `=N`
    Exact(f64),
    /// `zero`, `one`, `two`, `few`, `many` or `other`
    Category(String),
}

const CATEGORIES: [&str; 6] = ["zero", "one", "two", "few", "many", "other"];

/// Parse a message pattern. Errors name the byte offset of the problem.
pub(crate) fn parse_pattern(source: &str) -> Result<Vec<Segment>, String> {
    let mut parser = Parser {
        chars: source.char_indices().collect(),
        pos: 0,
        len: source.len(),
    };

    let segments = parser.message(false, false)?;
    match parser.peek() {
        None => Ok(segments),
        Some(_) => Err(format!("unmatched '}}' at byte {}", parser.offset())),
    }
}

/// Names of every argument a pattern reads, in order of appearance.
pub(crate) fn argument_names(segments: &[Segment]) -> Vec<&str> {
    let mut names = Vec::new();
    collect_names(segments, &mut names);
    names
}

fn collect_names<'a>(segments: &'a [Segment], names: &mut Vec<&'a str>) {
    for segment in segments {
        match segment {
            Segment::Literal(_) | Segment::Pound => {}
            Segment::Argument(name) => names.push(name),
            Segment::Plural { name, branches, .. } => {
                names.push(name);
                for (_, branch) in branches {
                    collect_names(branch, names);
                }
            }
            Segment::Select { name, branches } => {
                names.push(name);
                for (_, branch) in branches {
                    collect_names(branch, names);
                }
            }
        }
    }
}

/// CLDR plural category of `number` (a decimal string) in `locale`.
///
/// Falls back to `"other"` when the rules or the number cannot be resolved.
pub(crate) fn plural_category(locale: Locale, number: &str, ordinal: bool) -> &'static str {
    let rule_type = if ordinal {
        PluralRuleType::Ordinal
    } else {
        PluralRuleType::Cardinal
    };

    let langid = match locale.code().parse::<icu_locid::Locale>() {
        Ok(langid) => langid,
        Err(e) => {
            debug!("No plural rules for {}: {}", locale, e);
            return "other";
        }
    };
    let rules = match PluralRules::try_new(&(&langid).into(), rule_type) {
        Ok(rules) => rules,
        Err(e) => {
            debug!("No plural rules for {}: {}", locale, e);
            return "other";
        }
    };
    let operands = match number.trim().trim_start_matches('-').parse::<PluralOperands>() {
        Ok(operands) => operands,
        Err(_) => return "other",
    };

    match rules.category_for(operands) {
        PluralCategory::Zero => "zero",
        PluralCategory::One => "one",
        PluralCategory::Two => "two",
        PluralCategory::Few => "few",
        PluralCategory::Many => "many",
        PluralCategory::Other => "other",
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(i, _)| i)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(format!(
                "expected '{}' but found '{}' at byte {}",
                expected,
                c,
                self.offset()
            )),
            None => Err(format!("expected '{}' but the message ended", expected)),
        }
    }

    /// Read up to (not including) the next char matching `stop`, trimmed.
    fn token(&mut self, stop: impl Fn(char) -> bool) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek().filter(|&c| !stop(c)) {
            token.push(c);
            self.pos += 1;
        }
        token.trim().to_string()
    }

    /// A run of literals and arguments. `nested` messages end at a `}` that
    /// the caller consumes.
    fn message(&mut self, in_plural: bool, nested: bool) -> Result<Vec<Segment>, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        loop {
            match self.peek() {
                None if nested => return Err("unclosed '{' in a plural or select branch".to_string()),
                None | Some('}') => break,
                Some('{') => {
                    let start = self.offset();
                    self.pos += 1;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(self.argument(start, in_plural)?);
                }
                Some('#') if in_plural => {
                    self.pos += 1;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Pound);
                }
                Some('\'') => self.quoted(&mut literal, in_plural),
                Some(c) => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn quoted(&mut self, literal: &mut String, in_plural: bool) {
        let next = self.peek_at(1);
        if next == Some('\'') {
            literal.push('\'');
            self.pos += 2;
            return;
        }

        let starts_quote = matches!(next, Some('{') | Some('}')) || (in_plural && next == Some('#'));
        self.pos += 1;
        if !starts_quote {
            literal.push('\'');
            return;
        }

        // Quoted text runs to the next lone apostrophe, or to the end.
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\'' {
                if self.peek() == Some('\'') {
                    literal.push('\'');
                    self.pos += 1;
                } else {
                    return;
                }
            } else {
                literal.push(c);
            }
        }
    }

    /// Everything after an opening `{` up to and including its `}`.
    fn argument(&mut self, start: usize, in_plural: bool) -> Result<Segment, String> {
        let name = self.token(|c| matches!(c, ',' | '}' | '{'));
        match self.peek() {
            None => return Err(format!("unclosed '{{' at byte {}", start)),
            Some('{') => return Err(format!("unexpected '{{' at byte {}", self.offset())),
            _ => {}
        }
        if name.is_empty() {
            return Err(format!("empty argument at byte {}", start));
        }
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Segment::Argument(name));
        }

        self.expect(',')?;
        let kind = self.token(|c| matches!(c, ',' | '}' | '{'));
        match kind.as_str() {
            "plural" | "selectordinal" => {
                self.expect(',')?;
                let (offset, branches) = self.plural_branches(start)?;
                Ok(Segment::Plural {
                    name,
                    ordinal: kind == "selectordinal",
                    offset,
                    branches,
                })
            }
            "select" => {
                self.expect(',')?;
                let branches = self.select_branches(start, in_plural)?;
                Ok(Segment::Select { name, branches })
            }
            _ => {
                // number, date, time and friends: the style is not interpreted.
                if self.peek() == Some(',') {
                    self.pos += 1;
                    self.token(|c| matches!(c, '}' | '{'));
                }
                match self.peek() {
                    Some('}') => {
                        self.pos += 1;
                        Ok(Segment::Argument(name))
                    }
                    Some(_) => Err(format!("unexpected '{{' at byte {}", self.offset())),
                    None => Err(format!("unclosed '{{' at byte {}", start)),
                }
            }
        }
    }

    fn plural_branches(
        &mut self,
        start: usize,
    ) -> Result<(f64, Vec<(PluralKey, Vec<Segment>)>), String> {
        let mut offset = 0.0;
        let mut branches = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            if self.peek().is_none() {
                return Err(format!("unclosed '{{' at byte {}", start));
            }

            let at = self.offset();
            let selector = self.token(|c| c == '{' || c == '}' || c.is_whitespace());
            if let Some(value) = selector.strip_prefix("offset:") {
                let value = if value.is_empty() {
                    self.skip_whitespace();
                    self.token(|c| c == '{' || c == '}' || c.is_whitespace())
                } else {
                    value.to_string()
                };
                offset = value
                    .parse()
                    .map_err(|_| format!("invalid offset '{}' at byte {}", value, at))?;
                continue;
            }

            let key = if let Some(exact) = selector.strip_prefix('=') {
                PluralKey::Exact(
                    exact
                        .parse()
                        .map_err(|_| format!("invalid plural selector '{}' at byte {}", selector, at))?,
                )
            } else if CATEGORIES.contains(&selector.as_str()) {
                PluralKey::Category(selector)
            } else {
                return Err(format!("invalid plural selector '{}' at byte {}", selector, at));
            };

            self.skip_whitespace();
            self.expect('{')?;
            let branch = self.message(true, true)?;
            self.expect('}')?;
            branches.push((key, branch));
        }

        if !branches
            .iter()
            .any(|(key, _)| *key == PluralKey::Category("other".to_string()))
        {
            return Err(format!("plural at byte {} has no 'other' branch", start));
        }
        Ok((offset, branches))
    }

    fn select_branches(
        &mut self,
        start: usize,
        in_plural: bool,
    ) -> Result<Vec<(String, Vec<Segment>)>, String> {
        let mut branches = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            if self.peek().is_none() {
                return Err(format!("unclosed '{{' at byte {}", start));
            }

            let at = self.offset();
            let key = self.token(|c| c == '{' || c == '}' || c.is_whitespace());
            if key.is_empty() {
                return Err(format!("missing select key at byte {}", at));
            }

            self.skip_whitespace();
            self.expect('{')?;
            let branch = self.message(in_plural, true)?;
            self.expect('}')?;
            branches.push((key, branch));
        }

        if !branches.iter().any(|(key, _)| key == "other") {
            return Err(format!("select at byte {} has no 'other' branch", start));
        }
        Ok(branches)
    }
}
