//! Ant-style path matching.
//!
//! Patterns are split on `/` into segments. A segment is a literal, the
//! multi-segment wildcard `**`, or a glob compiled to a regex (`?`, `*`, `{var}`,
//! `{var:regex}`). Empty segments are ignored on both sides, so `/a//b` and
//! `/a/b` are the same path.

use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

use super::core::ParamVec;
use crate::error::MappingError;

const DOUBLE_WILDCARD: &str = "**";
const GROUP_PREFIX: &str = "rfvar";

/// Letters, digits, `_`, `-` and `.`, not starting with a digit or punctuation.
/// Rejects capture-the-rest forms like `{*rest}`.
fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// The pattern operations the mapping layer needs.
pub trait PathMatcher: Send + Sync {
    /// Whether `path` contains any wildcard or variable syntax.
    fn is_pattern(&self, path: &str) -> bool;

    /// Whether `pattern` matches the whole of `path`. Malformed patterns never match.
    fn matches(&self, pattern: &str, path: &str) -> bool;

    /// Variables captured by matching `path` against `pattern`, or `None` when it
    /// does not match.
    fn extract_uri_template_variables(&self, pattern: &str, path: &str) -> Option<ParamVec>;

    /// Comparator ordering patterns by specificity for the given lookup path.
    fn pattern_comparator<'a>(&self, path: &'a str) -> PatternComparator<'a> {
        PatternComparator::new(path)
    }

    /// Merge a type-level pattern with a method-level pattern.
    ///
    /// # Errors
    ///
    /// Fails when both sides pin a different file extension (`/*.html` + `/f.txt`).
    fn combine(&self, pattern1: &str, pattern2: &str) -> Result<String, MappingError>;
}

/// The default [`PathMatcher`]. Stateless; patterns are compiled per call.
/// Routing keys hold pre-compiled [`PathPattern`]s instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct AntPathMatcher;

impl PathMatcher for AntPathMatcher {
    fn is_pattern(&self, path: &str) -> bool {
        path.contains('*') || path.contains('?') || (path.contains('{') && path.contains('}'))
    }

    fn matches(&self, pattern: &str, path: &str) -> bool {
        PathPattern::parse(pattern).is_ok_and(|compiled| compiled.matches(path))
    }

    fn extract_uri_template_variables(&self, pattern: &str, path: &str) -> Option<ParamVec> {
        PathPattern::parse(pattern).ok()?.match_and_extract(path)
    }

    fn combine(&self, pattern1: &str, pattern2: &str) -> Result<String, MappingError> {
        if pattern1.is_empty() {
            return Ok(pattern2.to_string());
        }
        if pattern2.is_empty() {
            return Ok(pattern1.to_string());
        }
        let has_variable = pattern1.contains('{');
        if pattern1 != pattern2 && !has_variable && self.matches(pattern1, pattern2) {
            // /* + /hotel -> /hotel, /*.* + /*.html -> /*.html
            return Ok(pattern2.to_string());
        }
        if let Some(base) = pattern1.strip_suffix("/*") {
            return Ok(concat(base, pattern2));
        }
        if pattern1.ends_with("/**") {
            return Ok(concat(pattern1, pattern2));
        }
        let Some(star_dot) = pattern1.find("*.") else {
            return Ok(concat(pattern1, pattern2));
        };
        if has_variable {
            return Ok(concat(pattern1, pattern2));
        }
        let ext1 = &pattern1[star_dot + 1..];
        let (file2, ext2) = match pattern2.find('.') {
            Some(dot) => (&pattern2[..dot], &pattern2[dot..]),
            None => (pattern2, ""),
        };
        let ext1_all = ext1 == ".*" || ext1.is_empty();
        let ext2_all = ext2 == ".*" || ext2.is_empty();
        if !ext1_all && !ext2_all {
            return Err(MappingError::CannotCombine {
                first: pattern1.to_string(),
                second: pattern2.to_string(),
            });
        }
        let ext = if ext1_all { ext2 } else { ext1 };
        Ok(format!("{file2}{ext}"))
    }
}

fn concat(path1: &str, path2: &str) -> String {
    match (path1.ends_with('/'), path2.starts_with('/')) {
        (true, true) => format!("{path1}{}", &path2[1..]),
        (true, false) | (false, true) => format!("{path1}{path2}"),
        (false, false) => format!("{path1}/{path2}"),
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    DoubleWildcard,
    Glob {
        source: String,
        regex: Regex,
        variables: Vec<(Arc<str>, usize)>,
    },
}

impl Segment {
    fn parse(pattern: &str, segment: &str, next_group: &mut usize) -> Result<Self, MappingError> {
        if segment == DOUBLE_WILDCARD {
            return Ok(Self::DoubleWildcard);
        }
        if !segment.contains(['*', '?', '{', '}']) {
            return Ok(Self::Literal(segment.to_string()));
        }
        let mut expr = String::from("^");
        let mut names = Vec::new();
        let mut chars = segment.char_indices();
        while let Some((start, c)) = chars.next() {
            match c {
                '?' => expr.push('.'),
                '*' => expr.push_str(".*"),
                '{' => {
                    let mut depth = 1;
                    let mut end = None;
                    for (idx, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    end = Some(idx);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let end = end.ok_or_else(|| invalid(pattern, "unbalanced '{'"))?;
                    let body = &segment[start + 1..end];
                    let (name, var_regex) = match body.split_once(':') {
                        Some((name, regex)) => (name, regex),
                        None => (body, ".*"),
                    };
                    if name.is_empty() {
                        return Err(invalid(pattern, "empty variable name"));
                    }
                    if !is_variable_name(name) {
                        return Err(invalid(pattern, &format!("invalid variable name '{name}'")));
                    }
                    let group = format!("{GROUP_PREFIX}{}", *next_group);
                    *next_group += 1;
                    expr.push_str(&format!("(?P<{group}>{var_regex})"));
                    names.push((Arc::<str>::from(name), group));
                }
                '}' => return Err(invalid(pattern, "unbalanced '}'")),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');
        let regex = Regex::new(&expr)
            .map_err(|err| invalid(pattern, &format!("invalid variable regex: {err}")))?;
        let variables = names
            .into_iter()
            .map(|(name, group)| {
                let index = regex
                    .capture_names()
                    .position(|candidate| candidate == Some(group.as_str()))
                    .ok_or_else(|| invalid(pattern, "variable group missing from compiled regex"))?;
                Ok((name, index))
            })
            .collect::<Result<Vec<_>, MappingError>>()?;
        Ok(Self::Glob {
            source: segment.to_string(),
            regex,
            variables,
        })
    }

    fn match_segment(&self, part: &str, vars: &mut ParamVec) -> bool {
        match self {
            Self::Literal(literal) => literal == part,
            Self::DoubleWildcard => true,
            Self::Glob {
                regex, variables, ..
            } => {
                if variables.is_empty() {
                    return regex.is_match(part);
                }
                let Some(captures) = regex.captures(part) else {
                    return false;
                };
                for (name, index) in variables {
                    let value = captures.get(*index).map_or("", |m| m.as_str());
                    vars.push((Arc::clone(name), value.to_string()));
                }
                true
            }
        }
    }

    fn is_single_star(&self) -> bool {
        matches!(self, Self::Glob { source, .. } if source == "*")
    }
}

fn invalid(pattern: &str, reason: &str) -> MappingError {
    MappingError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// Specificity counters used by [`PatternComparator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternInfo {
    pub uri_vars: usize,
    pub single_wildcards: usize,
    pub double_wildcards: usize,
    /// Length with every `{...}` variable counted as one character.
    pub length: usize,
    /// The pattern is exactly `/**`.
    pub catch_all: bool,
    /// The pattern ends with `/**`.
    pub prefix: bool,
}

impl PatternInfo {
    fn of(source: &str) -> Self {
        let mut info = Self {
            uri_vars: 0,
            single_wildcards: 0,
            double_wildcards: 0,
            length: 0,
            catch_all: source == "/**",
            prefix: source.ends_with("/**"),
        };
        let bytes = source.as_bytes();
        let mut pos = 0;
        let mut depth = 0usize;
        while pos < bytes.len() {
            match bytes[pos] {
                b'{' => {
                    if depth == 0 {
                        info.uri_vars += 1;
                        info.length += 1;
                    }
                    depth += 1;
                }
                b'}' if depth > 0 => depth -= 1,
                _ if depth > 0 => {}
                b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                    info.double_wildcards += 1;
                    info.length += 2;
                    pos += 1;
                }
                b'*' => {
                    if pos != bytes.len() - 1 || pos == 0 || bytes[pos - 1] != b'.' {
                        info.single_wildcards += 1;
                    }
                    info.length += 1;
                }
                _ => info.length += 1,
            }
            pos += 1;
        }
        info
    }

    /// `uri_vars + single_wildcards + 2 * double_wildcards`
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.uri_vars + self.single_wildcards + 2 * self.double_wildcards
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    leading_slash: bool,
    trailing_slash: bool,
    has_double_wildcard: bool,
    info: PatternInfo,
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

impl std::hash::Hash for PathPattern {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Unbalanced braces, empty or duplicate variable names, and variable regexes
    /// that do not compile are reported as [`MappingError::InvalidPattern`].
    pub fn parse(pattern: &str) -> Result<Self, MappingError> {
        let mut next_group = 0;
        let segments = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| Segment::parse(pattern, segment, &mut next_group))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Glob { variables, .. } = segment {
                for (name, _) in variables {
                    if seen.contains(&name.as_ref()) {
                        return Err(invalid(
                            pattern,
                            &format!("duplicate variable name '{name}'"),
                        ));
                    }
                    seen.push(name);
                }
            }
        }
        let has_double_wildcard = segments
            .iter()
            .any(|segment| matches!(segment, Segment::DoubleWildcard));
        Ok(Self {
            source: pattern.to_string(),
            leading_slash: pattern.starts_with('/'),
            trailing_slash: pattern.ends_with('/'),
            has_double_wildcard,
            info: PatternInfo::of(pattern),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn info(&self) -> &PatternInfo {
        &self.info
    }

    /// Whether any segment is a wildcard or contains a variable.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| !matches!(segment, Segment::Literal(_)))
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flat_map(|segment| match segment {
            Segment::Glob { variables, .. } => variables
                .iter()
                .map(|(name, _)| name.as_ref())
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.match_and_extract(path).is_some()
    }

    /// Match the whole path, returning captured variables on success.
    #[must_use]
    pub fn match_and_extract(&self, path: &str) -> Option<ParamVec> {
        if path.starts_with('/') != self.leading_slash {
            return None;
        }
        let parts: SmallVec<[&str; 16]> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut vars = ParamVec::new();
        let matched = if self.has_double_wildcard {
            self.match_from(0, &parts, 0, &mut vars)
        } else if parts.len() == self.segments.len() {
            self.match_fixed(&parts, &mut vars) && self.trailing_slash == path.ends_with('/')
        } else if parts.len() + 1 == self.segments.len()
            && path.ends_with('/')
            && self.segments.last().is_some_and(Segment::is_single_star)
        {
            // `/a/*` matches `/a/`
            self.match_fixed(&parts, &mut vars)
        } else {
            false
        };
        matched.then_some(vars)
    }

    fn match_fixed(&self, parts: &[&str], vars: &mut ParamVec) -> bool {
        self.segments
            .iter()
            .zip(parts)
            .all(|(segment, part)| segment.match_segment(part, vars))
    }

    fn match_from(&self, pi: usize, parts: &[&str], si: usize, vars: &mut ParamVec) -> bool {
        let Some(segment) = self.segments.get(pi) else {
            return si == parts.len();
        };
        let mark = vars.len();
        if matches!(segment, Segment::DoubleWildcard) {
            for next in si..=parts.len() {
                if self.match_from(pi + 1, parts, next, vars) {
                    return true;
                }
                vars.truncate(mark);
            }
            return false;
        }
        let Some(part) = parts.get(si) else {
            return false;
        };
        if segment.match_segment(part, vars) && self.match_from(pi + 1, parts, si + 1, vars) {
            return true;
        }
        vars.truncate(mark);
        false
    }
}

/// Orders patterns from most to least specific for one lookup path.
///
/// The ordering is a lexicographic comparison of, in turn: not being the catch-all
/// `/**`, being equal to the lookup path, not being a `/**` prefix pattern, a lower
/// `uri_vars + single_wildcards + 2 * double_wildcards` total, a greater length
/// (variables count as one character), fewer single wildcards, fewer variables.
/// Being lexicographic, it is a strict weak order.
#[derive(Debug, Clone, Copy)]
pub struct PatternComparator<'a> {
    path: &'a str,
}

impl<'a> PatternComparator<'a> {
    #[must_use]
    pub fn new(path: &'a str) -> Self {
        Self { path }
    }

    /// Compare two pattern strings.
    #[must_use]
    pub fn compare(&self, pattern1: &str, pattern2: &str) -> Ordering {
        self.compare_info(
            pattern1,
            &PatternInfo::of(pattern1),
            pattern2,
            &PatternInfo::of(pattern2),
        )
    }

    /// Compare two compiled patterns.
    #[must_use]
    pub fn compare_patterns(&self, pattern1: &PathPattern, pattern2: &PathPattern) -> Ordering {
        self.compare_info(pattern1.as_str(), pattern1.info(), pattern2.as_str(), pattern2.info())
    }

    fn compare_info(&self, p1: &str, i1: &PatternInfo, p2: &str, i2: &PatternInfo) -> Ordering {
        i1.catch_all
            .cmp(&i2.catch_all)
            .then_with(|| (p1 != self.path).cmp(&(p2 != self.path)))
            .then_with(|| i1.prefix.cmp(&i2.prefix))
            .then_with(|| i1.total_count().cmp(&i2.total_count()))
            .then_with(|| i2.length.cmp(&i1.length))
            .then_with(|| i1.single_wildcards.cmp(&i2.single_wildcards))
            .then_with(|| i1.uri_vars.cmp(&i2.uri_vars))
    }
}
