use std::borrow::Cow;

use tracing::warn;

use super::request::ServerRequest;

/// Derives the path used for mapping lookups from a request.
///
/// Steps, in order: strip `;name=value` path parameters (or only `;jsessionid`
/// when semicolon removal is disabled), percent-decode, collapse `//`, then
/// remove the context path. An empty remainder becomes `/`.
#[derive(Debug, Clone)]
pub struct LookupPathResolver {
    remove_semicolon_content: bool,
    url_decode: bool,
}

impl Default for LookupPathResolver {
    fn default() -> Self {
        Self {
            remove_semicolon_content: true,
            url_decode: true,
        }
    }
}

impl LookupPathResolver {
    #[must_use]
    pub fn new(remove_semicolon_content: bool, url_decode: bool) -> Self {
        Self {
            remove_semicolon_content,
            url_decode,
        }
    }

    /// Lookup path within the application for the given request.
    #[must_use]
    pub fn lookup_path(&self, request: &ServerRequest) -> String {
        let uri = self.clean(request.raw_path());
        let context_path = self.clean(request.context_path());
        let context_path = context_path.trim_end_matches('/');
        if context_path.is_empty() {
            return non_empty(uri);
        }
        match remaining_path(&uri, context_path) {
            Some(rest) => non_empty(rest.to_string()),
            None => {
                warn!(
                    uri = %uri,
                    context_path = %context_path,
                    "Request path is outside the context path, using full path"
                );
                non_empty(uri)
            }
        }
    }

    fn clean(&self, raw: &str) -> String {
        let stripped = if self.remove_semicolon_content {
            remove_semicolon_content(raw)
        } else {
            remove_jsessionid(raw)
        };
        let decoded = if self.url_decode {
            decode(&stripped)
        } else {
            Cow::Borrowed(stripped.as_str())
        };
        collapse_slashes(&decoded)
    }
}

fn non_empty(path: String) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

fn decode(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(path = %path, error = %err, "Could not decode request path, using it undecoded");
            Cow::Borrowed(path)
        }
    }
}

/// Remove every `;...` run up to the next `/`.
#[must_use]
pub fn remove_semicolon_content(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut skipping = false;
    for c in path.chars() {
        match c {
            ';' => skipping = true,
            '/' => {
                skipping = false;
                out.push(c);
            }
            _ if !skipping => out.push(c),
            _ => {}
        }
    }
    out
}

fn remove_jsessionid(path: &str) -> String {
    const KEY: &str = ";jsessionid=";
    let lower = path.to_ascii_lowercase();
    let Some(start) = lower.find(KEY) else {
        return path.to_string();
    };
    let tail = &path[start + KEY.len()..];
    let end = tail
        .find([';', '/'])
        .map_or(path.len(), |idx| start + KEY.len() + idx);
    let mut out = String::with_capacity(path.len());
    out.push_str(&path[..start]);
    out.push_str(&path[end..]);
    out
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}

/// Remainder of `uri` after `prefix` (matched case-insensitively on a segment
/// boundary).
fn remaining_path<'a>(uri: &'a str, prefix: &str) -> Option<&'a str> {
    let head = uri.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &uri[prefix.len()..];
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(resolver: &LookupPathResolver, request: ServerRequest) -> String {
        resolver.lookup_path(&request)
    }

    #[test]
    fn test_semicolon_content_is_removed() {
        let resolver = LookupPathResolver::default();
        assert_eq!(
            lookup(&resolver, ServerRequest::get("/api/beans;v=1/detail;jsessionid=abc")),
            "/api/beans/detail"
        );
    }

    #[test]
    fn test_only_jsessionid_removed_when_disabled() {
        let resolver = LookupPathResolver::new(false, true);
        assert_eq!(
            lookup(&resolver, ServerRequest::get("/cars;color=red;JSESSIONID=abc/x")),
            "/cars;color=red/x"
        );
    }

    #[test]
    fn test_decodes_and_collapses_slashes() {
        let resolver = LookupPathResolver::default();
        assert_eq!(lookup(&resolver, ServerRequest::get("/a%20b//c")), "/a b/c");
        let raw = LookupPathResolver::new(true, false);
        assert_eq!(lookup(&raw, ServerRequest::get("/a%20b")), "/a%20b");
    }

    #[test]
    fn test_context_path_removal() {
        let resolver = LookupPathResolver::default();
        let req = ServerRequest::get("/App/api/beans").with_context_path("/app");
        assert_eq!(lookup(&resolver, req), "/api/beans");

        let req = ServerRequest::get("/app").with_context_path("/app/");
        assert_eq!(lookup(&resolver, req), "/");

        let req = ServerRequest::get("/application/x").with_context_path("/app");
        assert_eq!(lookup(&resolver, req), "/application/x");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let resolver = LookupPathResolver::default();
        assert_eq!(lookup(&resolver, ServerRequest::get("")), "/");
        assert_eq!(lookup(&resolver, ServerRequest::get(";x=1")), "/");
    }
}
