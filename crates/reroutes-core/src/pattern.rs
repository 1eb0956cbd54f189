// ── Path pattern compiler ──
//
// Compiles route patterns such as `/users/:id`, `/files/:path*` or
// `/:lang(en|de)?/docs` into a `regex::Regex`. Syntax:
//   :name        named parameter, matches one segment
//   (regex)      custom pattern, unnamed parameters are keyed by position
//   ? * +        optional, zero-or-more, one-or-more modifiers
//   {...}        group with its own prefix/suffix, may take a modifier
//   \c           literal character
//
// `regex` has no lookaround, so "followed by a delimiter or the end" is
// matched by consuming that delimiter outside the reported path.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

const DELIMITERS: &str = "/#?";
const PREFIXES: &str = "./";

// ── Options ──────────────────────────────────────────────────────────

/// Compilation options for [`PathPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Case-sensitive matching.
    pub sensitive: bool,
    /// Disallow an optional trailing delimiter.
    pub strict: bool,
    /// Anchor the match at the start of the path.
    pub start: bool,
    /// Require the match to run through the end of the path.
    pub end: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            start: true,
            end: true,
        }
    }
}

impl MatchOptions {
    /// Options used by the location-changed predicate: prefix matching,
    /// trailing slash tolerated.
    pub fn location_changed() -> Self {
        Self {
            end: false,
            strict: false,
            ..Self::default()
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    #[serde(rename = "?")]
    Optional,
    #[serde(rename = "*")]
    ZeroOrMore,
    #[serde(rename = "+")]
    OneOrMore,
}

impl Modifier {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '?' => Some(Self::Optional),
            '*' => Some(Self::ZeroOrMore),
            '+' => Some(Self::OneOrMore),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "?",
            Self::ZeroOrMore => "*",
            Self::OneOrMore => "+",
        }
    }

    fn repeats(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }
}

fn modifier_str(modifier: Option<Modifier>) -> &'static str {
    modifier.map_or("", Modifier::as_str)
}

/// A parameter captured by a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Key {
    /// Parameter name, or its position for unnamed `(regex)` parameters.
    pub name: String,
    pub prefix: String,
    pub suffix: String,
    pub pattern: String,
    pub modifier: Option<Modifier>,
}

/// Result of a successful [`PathPattern::exec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMatch {
    /// The matched portion of the input.
    pub path: String,
    /// Captured parameters in pattern order. Repeated parameters are
    /// returned unsplit; parameters that did not participate are absent.
    pub params: IndexMap<String, String>,
}

// ── Compiled pattern ─────────────────────────────────────────────────

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    options: MatchOptions,
    keys: Vec<Key>,
    regex: Regex,
}

impl PathPattern {
    /// Compile `pattern`. All syntax errors surface here.
    pub fn compile(pattern: &str, options: MatchOptions) -> Result<Self, PatternError> {
        let segments = Parser::new(lex(pattern)?).parse()?;
        let (route, keys) = build_route(&segments, options);
        let regex = Regex::new(&route).map_err(|e| PatternError::Regex {
            pattern: pattern.to_owned(),
            source: Box::new(e),
        })?;
        Ok(Self {
            source: pattern.to_owned(),
            options,
            keys,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The generated regular expression.
    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn exec(&self, path: &str) -> Option<PathMatch> {
        let captures = self.regex.captures(path)?;
        let matched = captures.get(1).map_or("", |m| m.as_str());
        let params = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| {
                captures
                    .get(i + 2)
                    .map(|m| (key.name.clone(), m.as_str().to_owned()))
            })
            .collect();
        Some(PathMatch {
            path: matched.to_owned(),
            params,
        })
    }
}

// ── Lexer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Open,
    Close,
    Pattern(String),
    Name(String),
    Char(char),
    Escaped(char),
    Modifier(char),
    End,
}

impl Lexeme {
    fn describe(&self) -> &'static str {
        match self {
            Self::Open => "\"{\"",
            Self::Close => "\"}\"",
            Self::Pattern(_) => "pattern",
            Self::Name(_) => "parameter name",
            Self::Char(_) => "character",
            Self::Escaped(_) => "escaped character",
            Self::Modifier(_) => "modifier",
            Self::End => "end of pattern",
        }
    }
}

fn lex(input: &str) -> Result<Vec<(usize, Lexeme)>, PatternError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' | '+' | '?' => {
                tokens.push((i, Lexeme::Modifier(c)));
                i += 1;
            }
            '\\' => {
                let Some(&escaped) = chars.get(i + 1) else {
                    return Err(PatternError::UnexpectedToken {
                        found: "end of pattern",
                        expected: "escaped character",
                        index: i + 1,
                    });
                };
                tokens.push((i, Lexeme::Escaped(escaped)));
                i += 2;
            }
            '{' => {
                tokens.push((i, Lexeme::Open));
                i += 1;
            }
            '}' => {
                tokens.push((i, Lexeme::Close));
                i += 1;
            }
            ':' => {
                let name: String = chars[i + 1..]
                    .iter()
                    .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
                    .collect();
                if name.is_empty() {
                    return Err(PatternError::MissingParameterName { index: i });
                }
                let len = name.len();
                tokens.push((i, Lexeme::Name(name)));
                i += 1 + len;
            }
            '(' => {
                let (pattern, next) = lex_group(&chars, i)?;
                tokens.push((i, Lexeme::Pattern(pattern)));
                i = next;
            }
            _ => {
                tokens.push((i, Lexeme::Char(c)));
                i += 1;
            }
        }
    }

    tokens.push((chars.len(), Lexeme::End));
    Ok(tokens)
}

/// Read a `( ... )` custom pattern starting at `open`. Only
/// non-capturing inner groups are accepted.
fn lex_group(chars: &[char], open: usize) -> Result<(String, usize), PatternError> {
    let mut depth = 1usize;
    let mut pattern = String::new();
    let mut j = open + 1;

    if chars.get(j) == Some(&'?') {
        return Err(PatternError::LeadingQuestionMark { index: j });
    }

    while j < chars.len() {
        match chars[j] {
            '\\' => {
                pattern.push('\\');
                if let Some(&next) = chars.get(j + 1) {
                    pattern.push(next);
                }
                j += 2;
                continue;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    j += 1;
                    break;
                }
            }
            '(' => {
                depth += 1;
                if chars.get(j + 1) != Some(&'?') {
                    return Err(PatternError::CapturingGroup { index: j });
                }
            }
            _ => {}
        }
        pattern.push(chars[j]);
        j += 1;
    }

    if depth != 0 {
        return Err(PatternError::UnbalancedPattern { index: open });
    }
    if pattern.is_empty() {
        return Err(PatternError::MissingPattern { index: open });
    }
    Ok((pattern, j))
}

// ── Parser ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(Key),
    /// `{...}` group without a parameter.
    Group {
        prefix: String,
        suffix: String,
        modifier: Option<Modifier>,
    },
}

struct Parser {
    tokens: Vec<(usize, Lexeme)>,
    pos: usize,
    next_index: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Lexeme)>) -> Self {
        Self {
            tokens,
            pos: 0,
            next_index: 0,
        }
    }

    fn next_if<T>(&mut self, take: impl FnOnce(&Lexeme) -> Option<T>) -> Option<T> {
        let value = self.tokens.get(self.pos).and_then(|(_, token)| take(token))?;
        self.pos += 1;
        Some(value)
    }

    fn char(&mut self) -> Option<char> {
        self.next_if(|t| match t {
            Lexeme::Char(c) => Some(*c),
            _ => None,
        })
    }

    fn escaped(&mut self) -> Option<char> {
        self.next_if(|t| match t {
            Lexeme::Escaped(c) => Some(*c),
            _ => None,
        })
    }

    fn name(&mut self) -> Option<String> {
        self.next_if(|t| match t {
            Lexeme::Name(name) => Some(name.clone()),
            _ => None,
        })
    }

    fn pattern(&mut self) -> Option<String> {
        self.next_if(|t| match t {
            Lexeme::Pattern(pattern) => Some(pattern.clone()),
            _ => None,
        })
    }

    fn modifier(&mut self) -> Option<Modifier> {
        self.next_if(|t| match t {
            Lexeme::Modifier(c) => Modifier::from_char(*c),
            _ => None,
        })
    }

    fn expect(&mut self, want: &Lexeme) -> Result<(), PatternError> {
        match self.tokens.get(self.pos) {
            Some((_, token)) if token == want => {
                self.pos += 1;
                Ok(())
            }
            Some((index, token)) => Err(PatternError::UnexpectedToken {
                found: token.describe(),
                expected: want.describe(),
                index: *index,
            }),
            None => Err(PatternError::UnexpectedToken {
                found: "end of pattern",
                expected: want.describe(),
                index: 0,
            }),
        }
    }

    fn text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.char().or_else(|| self.escaped()) {
            text.push(c);
        }
        text
    }

    fn positional(&mut self) -> String {
        let name = self.next_index.to_string();
        self.next_index += 1;
        name
    }

    fn parse(mut self) -> Result<Vec<Segment>, PatternError> {
        let default_pattern = format!("[^{}]+?", regex::escape(DELIMITERS));
        let mut segments = Vec::new();
        let mut path = String::new();

        while self.pos < self.tokens.len() {
            let c = self.char();
            let name = self.name();
            let pattern = self.pattern();

            if name.is_some() || pattern.is_some() {
                let mut prefix = c.map(String::from).unwrap_or_default();
                if !prefix.is_empty() && !PREFIXES.contains(prefix.as_str()) {
                    path.push_str(&prefix);
                    prefix.clear();
                }
                if !path.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut path)));
                }
                let name = match name {
                    Some(name) => name,
                    None => self.positional(),
                };
                segments.push(Segment::Param(Key {
                    name,
                    prefix,
                    suffix: String::new(),
                    pattern: pattern.unwrap_or_else(|| default_pattern.clone()),
                    modifier: self.modifier(),
                }));
                continue;
            }

            if let Some(value) = c.or_else(|| self.escaped()) {
                path.push(value);
                continue;
            }

            if !path.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut path)));
            }

            if self.next_if(|t| (*t == Lexeme::Open).then_some(())).is_some() {
                let prefix = self.text();
                let name = self.name();
                let pattern = self.pattern();
                let suffix = self.text();
                self.expect(&Lexeme::Close)?;
                let modifier = self.modifier();

                let segment = match (name, pattern) {
                    (None, None) => Segment::Group {
                        prefix,
                        suffix,
                        modifier,
                    },
                    (name, pattern) => {
                        let name = match name {
                            Some(name) => name,
                            None => self.positional(),
                        };
                        Segment::Param(Key {
                            name,
                            prefix,
                            suffix,
                            pattern: pattern.unwrap_or_else(|| default_pattern.clone()),
                            modifier,
                        })
                    }
                };
                segments.push(segment);
                continue;
            }

            self.expect(&Lexeme::End)?;
        }

        Ok(segments)
    }
}

// ── Regex generation ─────────────────────────────────────────────────

/// Build the route regex. Group 1 is the reported path; parameter `n`
/// is group `n + 2`.
fn build_route(segments: &[Segment], options: MatchOptions) -> (String, Vec<Key>) {
    let delimiter = format!("[{}]", regex::escape(DELIMITERS));
    let mut keys = Vec::new();
    let mut body = String::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => body.push_str(&regex::escape(text)),
            Segment::Group {
                prefix,
                suffix,
                modifier,
            } => {
                body.push_str(&format!(
                    "(?:{}{}){}",
                    regex::escape(prefix),
                    regex::escape(suffix),
                    modifier_str(*modifier)
                ));
            }
            Segment::Param(key) => {
                body.push_str(&param_route(key));
                keys.push(key.clone());
            }
        }
    }

    let mut tail = String::new();
    if options.end {
        if !options.strict {
            body.push_str(&format!("{delimiter}?"));
        }
        tail.push('$');
    } else {
        let end_delimited = match segments.last() {
            Some(Segment::Literal(text)) => text.chars().last().is_some_and(|c| DELIMITERS.contains(c)),
            Some(_) => false,
            None => true,
        };
        if !options.strict {
            body.push_str(&format!("(?:{delimiter}$)?"));
        }
        if !end_delimited {
            tail.push_str(&format!("(?:{delimiter}|$)"));
        }
    }

    let flags = if options.sensitive { "" } else { "(?i)" };
    let anchor = if options.start { "^" } else { "" };
    (format!("{flags}{anchor}({body}){tail}"), keys)
}

fn param_route(key: &Key) -> String {
    let prefix = regex::escape(&key.prefix);
    let suffix = regex::escape(&key.suffix);
    let pattern = &key.pattern;

    match key.modifier {
        Some(modifier) if modifier.repeats() => {
            if prefix.is_empty() && suffix.is_empty() {
                format!("((?:{pattern}){})", modifier.as_str())
            } else {
                let optional = if modifier == Modifier::ZeroOrMore { "?" } else { "" };
                format!(
                    "(?:{prefix}((?:{pattern})(?:{suffix}{prefix}(?:{pattern}))*){suffix}){optional}"
                )
            }
        }
        modifier => {
            let modifier = modifier_str(modifier);
            if prefix.is_empty() && suffix.is_empty() {
                format!("({pattern}){modifier}")
            } else {
                format!("(?:{prefix}({pattern}){suffix}){modifier}")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn compile(pattern: &str) -> PathPattern {
        PathPattern::compile(pattern, MatchOptions::default()).unwrap()
    }

    fn prefix(pattern: &str) -> PathPattern {
        PathPattern::compile(pattern, MatchOptions::location_changed()).unwrap()
    }

    fn params(m: &PathMatch) -> Vec<(&str, &str)> {
        m.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn static_path_matches_exactly_by_default() {
        let p = compile("/test");
        assert!(p.is_match("/test"));
        assert!(p.is_match("/test/"));
        assert!(p.is_match("/TEST"));
        assert!(!p.is_match("/test/more"));
        assert!(!p.is_match("/not-test"));
    }

    #[test]
    fn prefix_mode_stops_at_segment_boundaries() {
        let p = prefix("/test");
        assert!(p.is_match("/test"));
        assert!(p.is_match("/test/"));
        assert!(p.is_match("/test/nested"));
        assert!(p.is_match("/test?q=1"));
        assert!(!p.is_match("/testing"));
        assert!(!p.is_match("/not-test"));
        assert_eq!(p.exec("/test/nested").unwrap().path, "/test");
    }

    #[test]
    fn strict_rejects_trailing_delimiter() {
        let options = MatchOptions {
            strict: true,
            ..MatchOptions::default()
        };
        let p = PathPattern::compile("/test", options).unwrap();
        assert!(p.is_match("/test"));
        assert!(!p.is_match("/test/"));
    }

    #[test]
    fn sensitive_respects_case() {
        let options = MatchOptions {
            sensitive: true,
            ..MatchOptions::default()
        };
        let p = PathPattern::compile("/Test", options).unwrap();
        assert!(p.is_match("/Test"));
        assert!(!p.is_match("/test"));
    }

    #[test]
    fn unanchored_start_finds_inner_match() {
        let options = MatchOptions {
            start: false,
            ..MatchOptions::location_changed()
        };
        let p = PathPattern::compile("/test", options).unwrap();
        assert!(p.is_match("/app/test"));
        assert!(!prefix("/test").is_match("/app/test"));
    }

    #[test]
    fn named_parameters_capture_one_segment() {
        let p = compile("/users/:id/posts/:post_id");
        let m = p.exec("/users/42/posts/7").unwrap();
        assert_eq!(params(&m), vec![("id", "42"), ("post_id", "7")]);
        assert!(p.exec("/users/42/posts").is_none());
        assert_eq!(
            p.keys().iter().map(|k| k.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "post_id"]
        );
    }

    #[test]
    fn custom_and_unnamed_patterns() {
        let p = compile("/:lang(en|de)/(\\d+)");
        let m = p.exec("/de/2024").unwrap();
        assert_eq!(params(&m), vec![("lang", "de"), ("0", "2024")]);
        assert!(!p.is_match("/fr/2024"));
        assert!(!p.is_match("/de/latest"));
    }

    #[test]
    fn optional_parameter_may_be_absent() {
        let p = compile("/docs/:page?");
        assert!(params(&p.exec("/docs").unwrap()).is_empty());
        assert_eq!(params(&p.exec("/docs/intro").unwrap()), vec![("page", "intro")]);
    }

    #[test]
    fn repeated_parameters_are_returned_unsplit() {
        let zero = compile("/files/:path*");
        assert!(zero.is_match("/files"));
        assert_eq!(
            params(&zero.exec("/files/a/b/c").unwrap()),
            vec![("path", "a/b/c")]
        );

        let one = compile("/files/:path+");
        assert!(!one.is_match("/files"));
        assert!(one.is_match("/files/a"));
    }

    #[test]
    fn groups_carry_prefix_and_suffix() {
        let p = compile("/book{s}?/:id{-:rev}?");
        assert!(p.is_match("/book/1"));
        assert!(p.is_match("/books/1"));
        let m = p.exec("/books/1-3").unwrap();
        assert_eq!(params(&m), vec![("id", "1"), ("rev", "3")]);
    }

    #[test]
    fn escaped_characters_are_literal() {
        let p = compile("/a\\:b\\(c\\)");
        assert!(p.is_match("/a:b(c)"));
        assert!(p.keys().is_empty());
    }

    #[test]
    fn syntax_errors_surface_at_compile_time() {
        let err = |pattern| PathPattern::compile(pattern, MatchOptions::default()).unwrap_err();

        assert!(matches!(err("/:"), PatternError::MissingParameterName { index: 1 }));
        assert!(matches!(err("/()"), PatternError::MissingPattern { index: 1 }));
        assert!(matches!(err("/(abc"), PatternError::UnbalancedPattern { index: 1 }));
        assert!(matches!(err("/(a(b))"), PatternError::CapturingGroup { index: 3 }));
        assert!(matches!(err("/(?:a)"), PatternError::LeadingQuestionMark { index: 2 }));
        assert!(matches!(err("/a}"), PatternError::UnexpectedToken { index: 2, .. }));
        assert!(matches!(err("/{a"), PatternError::UnexpectedToken { .. }));
        assert!(matches!(err("/(a[)"), PatternError::Regex { .. }));
    }

    #[test]
    fn error_messages_are_readable() {
        let err = PathPattern::compile("/a}", MatchOptions::default()).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"Unexpected "}" at 2, expected end of pattern"#);
    }

    #[test]
    fn empty_pattern_matches_in_prefix_mode() {
        let p = prefix("");
        assert!(p.is_match("/anything"));
        assert_eq!(p.exec("/anything").unwrap().path, "");
    }
}
