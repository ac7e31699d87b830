//! Rule lists: `pattern || template` lines mapping a download URL to the URL
//! of its digest or signature file.
//!
//! Patterns are written in an escaped-literal notation: `\.`, `\d`, `\w` and
//! friends keep their regex meaning, any other escaped character stands for
//! itself. Templates refer to capture groups as `$|N|` (N >= 1).
//!
//! Rules are evaluated in file order and the first matching line wins.

use regex::Regex;

const SEPARATOR: &str = " || ";

/// Escapes passed through to the regex engine unchanged.
const CLASS_ESCAPES: [char; 10] = ['.', 'b', 'B', 'd', 'D', 'n', 's', 'S', 't', 'w'];

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    template: String,
}

impl Rule {
    /// Parses one rule line. Returns `None` for blank lines, lines without the
    /// ` || ` separator and patterns that do not compile.
    pub fn parse(line: &str) -> Option<Rule> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (raw, template) = line.split_once(SEPARATOR)?;
        if raw.trim().is_empty() {
            return None;
        }
        match Regex::new(&unescape_pattern(raw.trim())) {
            Ok(pattern) => Some(Rule {
                pattern,
                template: template.trim().to_string(),
            }),
            Err(e) => {
                tracing::warn!("skipping rule with invalid pattern {:?}: {}", raw, e);
                None
            }
        }
    }

    /// Applies the rule to `url`, returning the filled-in template on a match.
    pub fn apply(&self, url: &str) -> Option<String> {
        let caps = self.pattern.captures(url)?;
        let groups: Vec<&str> = (0..caps.len())
            .map(|i| caps.get(i).map_or("", |m| m.as_str()))
            .collect();
        Some(substitute(&self.template, &groups))
    }
}

/// Evaluates `rules` (one rule per line) against `url`.
///
/// Returns the template of the first matching rule with its `$|N|`
/// placeholders replaced, or `None` when no rule matches.
pub fn match_href(url: &str, rules: &str) -> Option<String> {
    rules
        .lines()
        .filter_map(Rule::parse)
        .find_map(|rule| rule.apply(url))
}

/// Turns the escaped-literal notation into a regex pattern.
pub fn unescape_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if CLASS_ESCAPES.contains(&next) => {
                out.push('\\');
                out.push(next);
            }
            Some(next) => out.push_str(&regex::escape(next.encode_utf8(&mut [0u8; 4]))),
            None => out.push_str(r"\\"),
        }
    }
    out
}

/// Replaces every `$|N|` in `template` with `groups[N]`. Group 0 (the whole
/// match) and out-of-range indices are left as written; groups that did not
/// participate in the match become empty.
fn substitute(template: &str, groups: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$|") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let index = after[..digits].parse::<usize>().ok();
        let closed = after[digits..].starts_with('|');
        match index {
            Some(n) if closed && n >= 1 && n < groups.len() => {
                out.push_str(groups[n]);
                rest = &after[digits + 1..];
            }
            _ => {
                out.push_str("$|");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
