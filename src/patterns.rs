//! Pattern facet regular expressions
//!
//! XSD regular expressions differ from the `regex` crate dialect: they are
//! implicitly anchored, `^` and `$` are ordinary characters, `.` excludes only
//! line ends, and there are the name-character escapes `\i \c \I \C`, block
//! escapes `\p{IsX}` and character-class subtraction `[a-z-[aeiou]]`. Patterns
//! are parsed against the XSD grammar first and then emitted in `regex`
//! syntax.

use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

/// Regex collaborator used by the validator compiler
pub trait RegexCompiler: Send + Sync {
    /// Check XSD syntax without compiling
    fn validate(&self, pattern: &str) -> Result<()>;

    /// Compile the patterns of one restriction step
    ///
    /// Several patterns in one step match if any of them matches.
    fn compile_set(&self, patterns: &[String]) -> Result<CompiledPattern>;
}

/// A compiled pattern set
#[derive(Clone)]
pub struct CompiledPattern {
    /// XSD sources, in facet order
    pub sources: Vec<String>,
    /// Anchored `regex` translation
    pub translated: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Whether the whole value matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("sources", &self.sources)
            .field("translated", &self.translated)
            .finish()
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.translated == other.translated
    }
}

/// Default collaborator on top of the `regex` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct XsdRegexCompiler;

impl RegexCompiler for XsdRegexCompiler {
    fn validate(&self, pattern: &str) -> Result<()> {
        translate(pattern).map(|_| ())
    }

    fn compile_set(&self, patterns: &[String]) -> Result<CompiledPattern> {
        let mut branches = Vec::with_capacity(patterns.len());
        for p in patterns {
            branches.push(format!("(?:{})", translate(p)?));
        }
        let translated = format!("^(?:{})$", branches.join("|"));
        let regex = Regex::new(&translated)
            .map_err(|e| Error::facet("pattern", format!("cannot compile '{}': {}", translated, e)))?;
        Ok(CompiledPattern {
            sources: patterns.to_vec(),
            translated,
            regex,
        })
    }
}

fn syntax(pattern: &str, detail: &str) -> Error {
    Error::facet("pattern", format!("invalid regular expression '{}': {}", pattern, detail))
}

/// Translate an XSD regular expression into unanchored `regex` syntax
pub fn translate(pattern: &str) -> Result<String> {
    let mut p = Parser {
        source: pattern,
        chars: pattern.chars().collect(),
        pos: 0,
    };
    let out = p.reg_exp()?;
    if p.pos != p.chars.len() {
        return Err(syntax(pattern, "unbalanced parenthesis"));
    }
    Ok(out)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

const NAME_START: &[(char, char)] = &[
    (':', ':'),
    ('A', 'Z'),
    ('_', '_'),
    ('a', 'z'),
    ('\u{C0}', '\u{D6}'),
    ('\u{D8}', '\u{F6}'),
    ('\u{F8}', '\u{2FF}'),
    ('\u{370}', '\u{37D}'),
    ('\u{37F}', '\u{1FFF}'),
    ('\u{200C}', '\u{200D}'),
    ('\u{2070}', '\u{218F}'),
    ('\u{2C00}', '\u{2FEF}'),
    ('\u{3001}', '\u{D7FF}'),
    ('\u{F900}', '\u{FDCF}'),
    ('\u{FDF0}', '\u{FFFD}'),
    ('\u{10000}', '\u{EFFFF}'),
];

const NAME_EXTRA: &[(char, char)] = &[
    ('-', '.'),
    ('0', '9'),
    ('\u{B7}', '\u{B7}'),
    ('\u{300}', '\u{36F}'),
    ('\u{203F}', '\u{2040}'),
];

const BLOCKS: &[(&str, char, char)] = &[
    ("BasicLatin", '\u{0000}', '\u{007F}'),
    ("Latin-1Supplement", '\u{0080}', '\u{00FF}'),
    ("LatinExtended-A", '\u{0100}', '\u{017F}'),
    ("LatinExtended-B", '\u{0180}', '\u{024F}'),
    ("IPAExtensions", '\u{0250}', '\u{02AF}'),
    ("SpacingModifierLetters", '\u{02B0}', '\u{02FF}'),
    ("CombiningDiacriticalMarks", '\u{0300}', '\u{036F}'),
    ("Greek", '\u{0370}', '\u{03FF}'),
    ("Cyrillic", '\u{0400}', '\u{04FF}'),
    ("Armenian", '\u{0530}', '\u{058F}'),
    ("Hebrew", '\u{0590}', '\u{05FF}'),
    ("Arabic", '\u{0600}', '\u{06FF}'),
    ("Devanagari", '\u{0900}', '\u{097F}'),
    ("Thai", '\u{0E00}', '\u{0E7F}'),
    ("Georgian", '\u{10A0}', '\u{10FF}'),
    ("HangulJamo", '\u{1100}', '\u{11FF}'),
    ("LatinExtendedAdditional", '\u{1E00}', '\u{1EFF}'),
    ("GreekExtended", '\u{1F00}', '\u{1FFF}'),
    ("GeneralPunctuation", '\u{2000}', '\u{206F}'),
    ("SuperscriptsandSubscripts", '\u{2070}', '\u{209F}'),
    ("CurrencySymbols", '\u{20A0}', '\u{20CF}'),
    ("LetterlikeSymbols", '\u{2100}', '\u{214F}'),
    ("NumberForms", '\u{2150}', '\u{218F}'),
    ("Arrows", '\u{2190}', '\u{21FF}'),
    ("MathematicalOperators", '\u{2200}', '\u{22FF}'),
    ("BoxDrawing", '\u{2500}', '\u{257F}'),
    ("GeometricShapes", '\u{25A0}', '\u{25FF}'),
    ("MiscellaneousSymbols", '\u{2600}', '\u{26FF}'),
    ("Dingbats", '\u{2700}', '\u{27BF}'),
    ("CJKSymbolsandPunctuation", '\u{3000}', '\u{303F}'),
    ("Hiragana", '\u{3040}', '\u{309F}'),
    ("Katakana", '\u{30A0}', '\u{30FF}'),
    ("CJKUnifiedIdeographs", '\u{4E00}', '\u{9FFF}'),
    ("HangulSyllables", '\u{AC00}', '\u{D7A3}'),
    ("PrivateUse", '\u{E000}', '\u{F8FF}'),
    ("AlphabeticPresentationForms", '\u{FB00}', '\u{FB4F}'),
    ("HalfwidthandFullwidthForms", '\u{FF00}', '\u{FFEF}'),
    ("Specials", '\u{FFF0}', '\u{FFFD}'),
];

const CATEGORIES: &[&str] = &[
    "L", "Lu", "Ll", "Lt", "Lm", "Lo", "M", "Mn", "Mc", "Me", "N", "Nd", "Nl", "No", "P", "Pc",
    "Pd", "Ps", "Pe", "Pi", "Pf", "Po", "Z", "Zs", "Zl", "Zp", "S", "Sm", "Sc", "Sk", "So", "C",
    "Cc", "Cf", "Co", "Cn",
];

fn class_char(c: char) -> String {
    if c.is_ascii_alphanumeric() {
        c.to_string()
    } else {
        format!("\\x{{{:X}}}", c as u32)
    }
}

fn ranges_class(ranges: &[(char, char)], negated: bool) -> String {
    let mut out = String::from(if negated { "[^" } else { "[" });
    for (lo, hi) in ranges {
        out.push_str(&class_char(*lo));
        if lo != hi {
            out.push('-');
            out.push_str(&class_char(*hi));
        }
    }
    out.push(']');
    out
}

fn name_char_ranges() -> Vec<(char, char)> {
    NAME_START.iter().chain(NAME_EXTRA.iter()).copied().collect()
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn err(&self, detail: &str) -> Error {
        syntax(self.source, detail)
    }

    fn reg_exp(&mut self) -> Result<String> {
        let mut branches = vec![self.branch()?];
        while self.peek() == Some('|') {
            self.pos += 1;
            branches.push(self.branch()?);
        }
        Ok(branches.join("|"))
    }

    fn branch(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.atom()?;
            out.push_str(&atom);
            out.push_str(&self.quantifier()?);
        }
        Ok(out)
    }

    fn quantifier(&mut self) -> Result<String> {
        match self.peek() {
            Some(c @ ('?' | '*' | '+')) => {
                self.pos += 1;
                Ok(c.to_string())
            }
            Some('{') => {
                self.pos += 1;
                let min = self.number()?;
                let mut out = format!("{{{}", min);
                if self.peek() == Some(',') {
                    self.pos += 1;
                    out.push(',');
                    if self.peek() != Some('}') {
                        let max = self.number()?;
                        if max < min {
                            return Err(self.err("quantifier maximum is less than minimum"));
                        }
                        out.push_str(&max.to_string());
                    }
                }
                if self.next() != Some('}') {
                    return Err(self.err("unterminated quantifier"));
                }
                out.push('}');
                Ok(out)
            }
            _ => Ok(String::new()),
        }
    }

    fn number(&mut self) -> Result<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some('0'..='9')) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.err("quantifier needs a number"));
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<u32>()
            .map_err(|_| self.err("quantifier too large"))
    }

    fn atom(&mut self) -> Result<String> {
        let c = self.next().ok_or_else(|| self.err("unexpected end"))?;
        match c {
            '(' => {
                let inner = self.reg_exp()?;
                if self.next() != Some(')') {
                    return Err(self.err("unbalanced parenthesis"));
                }
                Ok(format!("(?:{})", inner))
            }
            '[' => self.char_class_expr(),
            '.' => Ok("[^\\n\\r]".to_string()),
            '\\' => self.escape(false),
            '?' | '*' | '+' | ')' | ']' => Err(self.err(&format!("unexpected '{}'", c))),
            '{' => Err(self.err("quantifier without an atom")),
            other => Ok(regex::escape(&other.to_string())),
        }
    }

    /// Escape after the backslash; inside a class the result is a class item
    fn escape(&mut self, in_class: bool) -> Result<String> {
        let c = self.next().ok_or_else(|| self.err("dangling escape"))?;
        let single = |ch: char| {
            if in_class {
                class_char(ch)
            } else {
                regex::escape(&ch.to_string())
            }
        };
        Ok(match c {
            'n' => single('\n'),
            'r' => single('\r'),
            't' => single('\t'),
            '\\' | '|' | '.' | '?' | '*' | '+' | '(' | ')' | '{' | '}' | '-' | '[' | ']' | '^' => {
                single(c)
            }
            's' => ranges_class(&[(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')], false),
            'S' => ranges_class(&[(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')], true),
            'd' => "\\p{Nd}".to_string(),
            'D' => "\\P{Nd}".to_string(),
            'w' => "[^\\p{P}\\p{Z}\\p{C}]".to_string(),
            'W' => "[\\p{P}\\p{Z}\\p{C}]".to_string(),
            'i' => ranges_class(NAME_START, false),
            'I' => ranges_class(NAME_START, true),
            'c' => ranges_class(&name_char_ranges(), false),
            'C' => ranges_class(&name_char_ranges(), true),
            'p' | 'P' => {
                let prop = self.char_prop()?;
                let negated = c == 'P';
                match prop {
                    CharProp::Category(cat) => {
                        if negated {
                            format!("\\P{{{}}}", cat)
                        } else {
                            format!("\\p{{{}}}", cat)
                        }
                    }
                    CharProp::Block(lo, hi) => ranges_class(&[(lo, hi)], negated),
                }
            }
            other => return Err(self.err(&format!("unknown escape '\\{}'", other))),
        })
    }

    fn char_prop(&mut self) -> Result<CharProp> {
        if self.next() != Some('{') {
            return Err(self.err("expected '{' after \\p"));
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '}' {
                break;
            }
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if self.next() != Some('}') {
            return Err(self.err("unterminated property escape"));
        }
        if let Some(block) = name.strip_prefix("Is") {
            return BLOCKS
                .iter()
                .find(|(n, _, _)| *n == block)
                .map(|(_, lo, hi)| CharProp::Block(*lo, *hi))
                .ok_or_else(|| self.err(&format!("unknown block '{}'", block)));
        }
        if CATEGORIES.contains(&name.as_str()) {
            Ok(CharProp::Category(name))
        } else {
            Err(self.err(&format!("unknown category '{}'", name)))
        }
    }

    /// Character class after the opening bracket
    fn char_class_expr(&mut self) -> Result<String> {
        let negated = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };
        let mut items = String::new();
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated character class")),
                Some(']') if !first => {
                    self.pos += 1;
                    break;
                }
                Some('-') if self.peek_at(1) == Some('[') && !first => {
                    self.pos += 2;
                    let sub = self.char_class_expr()?;
                    if self.next() != Some(']') {
                        return Err(self.err("subtraction must end the character class"));
                    }
                    let base = format!("[{}{}]", if negated { "^" } else { "" }, items);
                    return Ok(format!("[{}--{}]", base, sub));
                }
                _ => {}
            }
            let lo = self.class_atom(first)?;
            first = false;
            match lo {
                ClassAtom::Item(s) => items.push_str(&s),
                ClassAtom::Char(c) => {
                    if self.peek() == Some('-')
                        && self.peek_at(1) != Some('[')
                        && self.peek_at(1) != Some(']')
                    {
                        self.pos += 1;
                        let hi = match self.class_atom(false)? {
                            ClassAtom::Char(h) => h,
                            ClassAtom::Item(_) => {
                                return Err(self.err("range end must be a single character"))
                            }
                        };
                        if hi < c {
                            return Err(self.err("character range is out of order"));
                        }
                        items.push_str(&class_char(c));
                        items.push('-');
                        items.push_str(&class_char(hi));
                    } else {
                        items.push_str(&class_char(c));
                    }
                }
            }
        }
        if items.is_empty() {
            return Err(self.err("empty character class"));
        }
        Ok(format!("[{}{}]", if negated { "^" } else { "" }, items))
    }

    fn class_atom(&mut self, first: bool) -> Result<ClassAtom> {
        let c = self.next().ok_or_else(|| self.err("unterminated character class"))?;
        match c {
            '\\' => {
                let save = self.pos;
                match self.peek() {
                    Some(
                        'n' | 'r' | 't' | '\\' | '|' | '.' | '?' | '*' | '+' | '(' | ')' | '{'
                        | '}' | '-' | '[' | ']' | '^',
                    ) => {
                        let e = self.next().unwrap_or_default();
                        Ok(ClassAtom::Char(match e {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            other => other,
                        }))
                    }
                    _ => {
                        self.pos = save;
                        Ok(ClassAtom::Item(self.escape(true)?))
                    }
                }
            }
            '[' => Err(self.err("'[' must be escaped in a character class")),
            '-' if !first && self.peek() != Some(']') => {
                Err(self.err("'-' must be escaped inside a character class"))
            }
            other => Ok(ClassAtom::Char(other)),
        }
    }
}

enum CharProp {
    Category(String),
    Block(char, char),
}

enum ClassAtom {
    Char(char),
    Item(String),
}
