//! Parsed representations of structures.
//!
//! A structure such as `ret > (key1[*] & ?key2 > subkey)` is parsed once into
//! a tree of [`Level`](struct.Level.html)s, [`Path`](struct.Path.html)s and
//! [`Step`](enum.Step.html)s. Every grammar defect is reported while parsing,
//! so evaluating a [`Structure`](struct.Structure.html) can only fail because
//! of the data.
//!
//! The grammar is:
//!
//! ```text
//! Structure ::= Level
//! Level     ::= Path ( '&' Path )*
//! Path      ::= '>'* Step ( '>'+ Step )*
//! Step      ::= Key | '?' Key | '*' | '(' Level ')'
//! Key       ::= <identifier> Array* | Array+
//! Array     ::= '[' <digits> ']' | '[' '*' ']' | '[' '+' ']'
//! ```

use crate::errors::MalformedStructure;
use crate::lexer::{Lexer, Spanned, Token};
use crate::validator::Config;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A parsed structure, ready to validate any number of responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    level: Level,
}

impl Structure {
    /// Parse a structure using the default configuration.
    pub fn parse(input: &str) -> Result<Structure, MalformedStructure> {
        Self::parse_with_config(input, &Config::default())
    }

    /// Parse a structure, honoring the nesting limit in `config`.
    pub fn parse_with_config(input: &str, config: &Config) -> Result<Structure, MalformedStructure> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser {
            input,
            tokens,
            index: 0,
            max_depth: config.max_depth,
        };

        let level = parser.level(0)?;
        parser.expect_eof()?;

        Ok(Structure { level })
    }

    /// The top-level conjunction of paths.
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Same as [`level`](#method.level), but moves ownership.
    pub fn into_level(self) -> Level {
        self.level
    }
}

impl FromStr for Structure {
    type Err = MalformedStructure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Structure::parse(s)
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.level)
    }
}

impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Structure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Structure::parse(&text).map_err(de::Error::custom)
    }
}

/// A conjunction of paths, all of which must hold for a value.
///
/// A level with no paths (the empty structure) matches only the empty
/// mapping. An empty group `()` is not such a level: it parses as a single
/// fan-out with nothing after it, which accepts any mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Level {
    paths: Vec<Path>,
}

impl Level {
    /// Construct a level from its conjoined paths.
    pub fn new(paths: Vec<Path>) -> Self {
        Level { paths }
    }

    /// The paths of this level, in the order they are evaluated.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Whether this is the empty level, which only matches `{}`.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                f.write_str(" & ")?;
            }
            write!(f, "{}", path)?;
        }
        Ok(())
    }
}

/// A chain of hops, evaluated left to right, each one descending into the
/// value produced by the one before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    hops: Vec<Hop>,
}

impl Path {
    /// Construct a path from its hops.
    pub fn new(hops: Vec<Hop>) -> Self {
        Path { hops }
    }

    /// The hops of this path, in the order they are applied.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut fan_outs = 0;
        let mut first = true;
        for hop in &self.hops {
            match hop {
                Hop::FanOut => fan_outs += 1,
                Hop::Step(step) => {
                    if first {
                        if fan_outs > 0 {
                            write!(f, "{} ", ">".repeat(fan_outs))?;
                        }
                    } else {
                        write!(f, " {} ", ">".repeat(fan_outs + 1))?;
                    }
                    write!(f, "{}", step)?;
                    fan_outs = 0;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

/// One element of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hop {
    /// Apply the next step to the current value.
    Step(Step),

    /// Apply the rest of the path to the value of every key in the current
    /// mapping.
    ///
    /// After a step, a run of N `>` produces N-1 fan-outs; a run of N `>` at
    /// the start of a path produces N.
    FanOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A mapping key, possibly optional, possibly followed by accessors.
    Key(Key),

    /// `*`: the value must be a mapping.
    ///
    /// Steps after a wildcard are kept in the tree but never evaluated.
    Wildcard,

    /// A parenthesized level, evaluated against the current value.
    Group(Level),
}

impl Step {
    /// Terminal steps check the current value without descending into it, so
    /// nothing may follow them. Only groups are terminal; a wildcard may be
    /// followed by steps, which are ignored.
    pub fn is_terminal(&self) -> bool {
        match self {
            Step::Group(_) => true,
            Step::Key(_) | Step::Wildcard => false,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "{}", key),
            Step::Wildcard => f.write_str("*"),
            Step::Group(level) => write!(f, "({})", level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    name: Option<String>,
    optional: bool,
    accessors: Vec<Accessor>,
}

impl Key {
    /// Construct a key. `name` is `None` for a bare accessor chain.
    pub fn new(name: Option<String>, optional: bool, accessors: Vec<Accessor>) -> Self {
        Key {
            name,
            optional,
            accessors,
        }
    }

    /// The mapping key to look up. `None` for a bare accessor chain such as
    /// `[*]`, which applies to the current value.
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(String::as_str)
    }

    /// Whether the key was marked with `?`, so that its absence is not an
    /// error.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The array accessors following the key, applied left to right.
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.optional {
            f.write_str("?")?;
        }
        if let Some(ref name) = self.name {
            f.write_str(name)?;
        }
        for accessor in &self.accessors {
            write!(f, "{}", accessor)?;
        }
        Ok(())
    }
}

/// A bracketed suffix on a key, constraining an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// `[i]`: the element at `i` must exist.
    Index(usize),

    /// `[*]`: every element, possibly none.
    Each,

    /// `[+]`: every element, at least one.
    NonEmpty,
}

impl FromStr for Accessor {
    type Err = MalformedStructure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" => Ok(Accessor::Each),
            "+" => Ok(Accessor::NonEmpty),
            // Indices too large for usize can never exist, so they saturate and
            // fail as out of bounds.
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(Accessor::Index(digits.parse().unwrap_or(usize::MAX)))
            }
            _ => Err(MalformedStructure::InvalidArrayIndex {
                token: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Accessor::Index(i) => write!(f, "[{}]", i),
            Accessor::Each => f.write_str("[*]"),
            Accessor::NonEmpty => f.write_str("[+]"),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    index: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Spanned {
        // The lexer always terminates the stream with Eof, and the parser never
        // advances past it.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.peek().clone();
        if spanned.token != Token::Eof {
            self.index += 1;
        }
        spanned
    }

    fn unexpected(&self, expected: &'static str) -> MalformedStructure {
        let spanned = self.peek();
        MalformedStructure::UnexpectedToken {
            expected,
            found: spanned.token.describe(),
            position: spanned.position,
        }
    }

    fn expect_eof(&self) -> Result<(), MalformedStructure> {
        match self.peek().token {
            Token::Eof => Ok(()),
            _ => Err(self.unexpected("'&' or end of structure")),
        }
    }

    fn level(&mut self, depth: usize) -> Result<Level, MalformedStructure> {
        if depth > self.max_depth {
            return Err(MalformedStructure::MaxDepthExceeded {
                max_depth: self.max_depth,
            });
        }

        match self.peek().token {
            Token::Eof | Token::RParen if depth == 0 => return Ok(Level::default()),
            // `()` holds one empty path, which fans out over the mapping with
            // nothing left to check.
            Token::Eof | Token::RParen => return Ok(Level::new(vec![Path::new(vec![Hop::FanOut])])),
            _ => {}
        }

        let mut paths = vec![self.path(depth)?];
        while self.peek().token == Token::Amp {
            self.advance();
            paths.push(self.path(depth)?);
        }

        Ok(Level::new(paths))
    }

    fn path(&mut self, depth: usize) -> Result<Path, MalformedStructure> {
        let mut hops = vec![];
        let mut fan_outs = self.separators();

        loop {
            hops.extend((0..fan_outs).map(|_| Hop::FanOut));

            let step = self.step(depth)?;
            let terminal = step.is_terminal();
            let rendered = if terminal { Some(step.to_string()) } else { None };
            hops.push(Hop::Step(step));

            let separators = self.separators();
            if separators == 0 {
                break;
            }

            if let Some(step) = rendered {
                return Err(MalformedStructure::StepAfterTerminal { step });
            }

            fan_outs = separators - 1;
        }

        Ok(Path::new(hops))
    }

    fn separators(&mut self) -> usize {
        let mut count = 0;
        while self.peek().token == Token::Gt {
            self.advance();
            count += 1;
        }
        count
    }

    fn step(&mut self, depth: usize) -> Result<Step, MalformedStructure> {
        let Spanned { token, position } = self.peek().clone();
        match token {
            Token::LParen => {
                self.advance();
                let level = self.level(depth + 1)?;
                match self.peek().token {
                    Token::RParen => {
                        self.advance();
                        Ok(Step::Group(level))
                    }
                    Token::Eof => Err(MalformedStructure::UnbalancedParenthesis {
                        level: self.input[position + 1..].trim().to_owned(),
                    }),
                    _ => Err(self.unexpected("'&' or ')'")),
                }
            }
            Token::Question => {
                self.advance();
                match self.peek().token {
                    Token::Ident(_) => self.key(true),
                    _ => Err(self.unexpected("a key name after '?'")),
                }
            }
            Token::Ident(ref name) if name == "*" => {
                self.advance();
                if let Token::Accessor(_) = self.peek().token {
                    self.accessors(Some(name.clone()), false)
                } else {
                    Ok(Step::Wildcard)
                }
            }
            Token::Ident(_) | Token::Accessor(_) => self.key(false),
            _ => Err(self.unexpected("a step")),
        }
    }

    fn key(&mut self, optional: bool) -> Result<Step, MalformedStructure> {
        let name = match self.peek().token {
            Token::Ident(ref name) => Some(name.clone()),
            _ => None,
        };
        if name.is_some() {
            self.advance();
        }

        self.accessors(name, optional)
    }

    fn accessors(&mut self, name: Option<String>, optional: bool) -> Result<Step, MalformedStructure> {
        let mut accessors = vec![];
        while let Token::Accessor(ref raw) = self.peek().token {
            let accessor: Accessor = raw.parse()?;
            self.advance();
            accessors.push(accessor);
        }

        Ok(Step::Key(Key::new(name, optional, accessors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(name: &str) -> Hop {
        Hop::Step(Step::Key(Key::new(Some(name.to_owned()), false, vec![])))
    }

    #[test]
    fn empty_structure() {
        assert!(Structure::parse("").unwrap().level().is_empty());
        assert!(Structure::parse("   ").unwrap().level().is_empty());
    }

    #[test]
    fn conjunction_inside_group() {
        let structure = Structure::parse("ret > (key1 & ?key2 & key3)").unwrap();
        assert_eq!(
            structure.into_level(),
            Level::new(vec![Path::new(vec![
                key("ret"),
                Hop::Step(Step::Group(Level::new(vec![
                    Path::new(vec![key("key1")]),
                    Path::new(vec![Hop::Step(Step::Key(Key::new(
                        Some("key2".to_owned()),
                        true,
                        vec![]
                    )))]),
                    Path::new(vec![key("key3")]),
                ]))),
            ])])
        );
    }

    #[test]
    fn depth_runs() {
        let structure = Structure::parse("ret >>> skey").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[key("ret"), Hop::FanOut, Hop::FanOut, key("skey")][..]
        );

        let structure = Structure::parse(">> skey").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[Hop::FanOut, Hop::FanOut, key("skey")][..]
        );
    }

    #[test]
    fn accessor_chains() {
        let structure = Structure::parse("[+][1] > ret").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[
                Hop::Step(Step::Key(Key::new(
                    None,
                    false,
                    vec![Accessor::NonEmpty, Accessor::Index(1)]
                ))),
                key("ret"),
            ][..]
        );
    }

    #[test]
    fn ampersand_splits_only_at_top() {
        let structure = Structure::parse("ret > key1 > * & msg > *").unwrap();
        assert_eq!(structure.level().paths().len(), 2);

        let structure = Structure::parse("ret > (key1 > * & key2 > *)").unwrap();
        assert_eq!(structure.level().paths().len(), 1);
    }

    #[test]
    fn unbalanced_parenthesis() {
        assert_eq!(
            Structure::parse("(ret > *"),
            Err(MalformedStructure::UnbalancedParenthesis {
                level: "ret > *".to_owned()
            })
        );
    }

    #[test]
    fn stray_close_parenthesis() {
        match Structure::parse("ret > *)") {
            Err(MalformedStructure::UnexpectedToken { found, position, .. }) => {
                assert_eq!(found, "')'");
                assert_eq!(position, 7);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn invalid_accessor() {
        assert_eq!(
            Structure::parse("[inv] > ret"),
            Err(MalformedStructure::InvalidArrayIndex {
                token: "inv".to_owned()
            })
        );
        assert!(Structure::parse("ret[]").is_err());
        assert!(Structure::parse("ret[-1]").is_err());
    }

    #[test]
    fn nothing_follows_groups() {
        assert_eq!(
            Structure::parse("(a & b) >> c"),
            Err(MalformedStructure::StepAfterTerminal {
                step: "(a & b)".to_owned()
            })
        );
    }

    #[test]
    fn steps_after_wildcard_are_kept() {
        let structure = Structure::parse("ret > * > key").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[key("ret"), Hop::Step(Step::Wildcard), key("key")][..]
        );
        assert_eq!(structure.to_string(), "ret > * > key");
    }

    #[test]
    fn empty_group_fans_out() {
        let structure = Structure::parse("ret > ()").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[
                key("ret"),
                Hop::Step(Step::Group(Level::new(vec![Path::new(vec![Hop::FanOut])]))),
            ][..]
        );
        assert_eq!(structure.to_string(), "ret > ()");
        assert_eq!(Structure::parse(&structure.to_string()).unwrap(), structure);

        assert_eq!(
            Structure::parse("("),
            Err(MalformedStructure::UnbalancedParenthesis {
                level: "".to_owned()
            })
        );
    }

    #[test]
    fn oversized_index_saturates() {
        let structure = Structure::parse("[18446744073709551616]").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[Hop::Step(Step::Key(Key::new(
                None,
                false,
                vec![Accessor::Index(usize::MAX)]
            )))][..]
        );
    }

    #[test]
    fn doubled_question_mark() {
        let structure = Structure::parse("??x").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[Hop::Step(Step::Key(Key::new(Some("?x".to_owned()), true, vec![])))][..]
        );
        assert_eq!(structure.to_string(), "??x");
    }

    #[test]
    fn dangling_separators() {
        assert!(Structure::parse("ret >").is_err());
        assert!(Structure::parse("a & & b").is_err());
        assert!(Structure::parse("a &").is_err());
        assert!(Structure::parse("?").is_err());
    }

    #[test]
    fn star_with_accessors_is_a_key() {
        let structure = Structure::parse("*[0]").unwrap();
        assert_eq!(
            structure.level().paths()[0].hops(),
            &[Hop::Step(Step::Key(Key::new(
                Some("*".to_owned()),
                false,
                vec![Accessor::Index(0)]
            )))][..]
        );
    }

    #[test]
    fn max_depth() {
        let mut config = Config::new();
        config.max_depth(2);

        assert!(Structure::parse_with_config("a > (b > (c))", &config).is_ok());
        assert_eq!(
            Structure::parse_with_config("a > (b > (c > (d)))", &config),
            Err(MalformedStructure::MaxDepthExceeded { max_depth: 2 })
        );
    }

    #[test]
    fn display_is_canonical() {
        let input = "([0]>ret>>(arr[1][0]>?opt>(fst&snd[+])&next>*))";
        let structure = Structure::parse(input).unwrap();
        let canonical = structure.to_string();
        assert_eq!(
            canonical,
            "([0] > ret >> (arr[1][0] > ?opt > (fst & snd[+]) & next > *))"
        );
        assert_eq!(Structure::parse(&canonical).unwrap(), structure);

        assert_eq!(Structure::parse(">>  x").unwrap().to_string(), ">> x");
    }

    #[test]
    fn serde_as_string() {
        let structure: Structure = serde_json::from_str(r#""ret > [*]""#).unwrap();
        assert_eq!(structure, Structure::parse("ret > [*]").unwrap());
        assert_eq!(serde_json::to_string(&structure).unwrap(), r#""ret > [*]""#);

        assert!(serde_json::from_str::<Structure>(r#""(ret""#).is_err());
    }
}
