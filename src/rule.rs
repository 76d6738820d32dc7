use anyhow::{Result, anyhow};
use regex::{Captures, Regex};

use crate::convert::Conversion;

/// One (pattern, replacement) pair of the rename chain. The pattern is
/// compiled once at construction; a bad pattern fails construction.
#[derive(Debug, Clone)]
pub struct ReplaceRule {
    regex: Regex,
    replacement: String,
}

impl ReplaceRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|err| anyhow!("invalid pattern '{pattern}': {err}"))?;
        Ok(Self {
            regex,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Substitutes every match in `input`, expanding the replacement template
    /// per match.
    pub fn apply(&self, input: &str) -> String {
        self.regex
            .replace_all(input, |caps: &Captures<'_>| {
                expand_template(&self.replacement, caps)
            })
            .into_owned()
    }
}

/// Runs the rules in list order, each rule transforming the previous rule's
/// output. An empty chain is the identity.
pub fn apply_chain(rules: &[ReplaceRule], input: &str) -> String {
    rules
        .iter()
        .fold(input.to_string(), |name, rule| rule.apply(&name))
}

/// Template expansion with `$`-references and backslash conversion
/// directives. `$` followed by a digit run selects the longest digit prefix
/// naming an existing group, so `X$0X` means group 0 between literal `X`s;
/// `${name}` is the braced form and `$$` a literal dollar. A reference whose
/// group does not exist in the pattern is kept as written. A directive
/// converts everything expanded to its right; a backslash before any other
/// character is emitted literally.
fn expand_template(template: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    expand_into(template, caps, &mut out);
    out
}

fn expand_into(template: &str, caps: &Captures<'_>, out: &mut String) {
    let mut rest = template;
    loop {
        let Some(idx) = rest.find(['$', '\\']) else {
            out.push_str(rest);
            return;
        };
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        if let Some(after) = rest.strip_prefix('$') {
            rest = expand_reference(after, caps, out);
            continue;
        }

        let mut tail = rest[1..].chars();
        let Some(marker) = tail.next() else {
            out.push('\\');
            return;
        };
        if let Some(conversion) = Conversion::from_directive(marker) {
            let mut converted = String::new();
            expand_into(tail.as_str(), caps, &mut converted);
            out.push_str(&conversion.apply(&converted));
            return;
        }
        out.push('\\');
        out.push(marker);
        rest = tail.as_str();
    }
}

fn expand_reference<'t>(rest: &'t str, caps: &Captures<'_>, out: &mut String) -> &'t str {
    if let Some(after) = rest.strip_prefix('$') {
        out.push('$');
        return after;
    }

    if let Some(inner) = rest.strip_prefix('{') {
        if let Some(end) = inner.find('}') {
            if push_group(&inner[..end], caps, out) {
                return &inner[end + 1..];
            }
        }
        out.push('$');
        return rest;
    }

    let digit_len = rest.chars().take_while(char::is_ascii_digit).count();
    if digit_len == 0 {
        out.push('$');
        return rest;
    }
    let run = &rest[..digit_len];
    for take in (1..=digit_len).rev() {
        if let Ok(index) = run[..take].parse::<usize>() {
            if index < caps.len() {
                out.push_str(caps.get(index).map_or("", |m| m.as_str()));
                out.push_str(&run[take..]);
                return &rest[digit_len..];
            }
        }
    }
    out.push('$');
    out.push_str(run);
    &rest[digit_len..]
}

fn push_group(name: &str, caps: &Captures<'_>, out: &mut String) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        let Ok(index) = name.parse::<usize>() else {
            return false;
        };
        if index >= caps.len() {
            return false;
        }
        out.push_str(caps.get(index).map_or("", |m| m.as_str()));
        return true;
    }
    match caps.name(name) {
        Some(found) => {
            out.push_str(found.as_str());
            true
        }
        None => false,
    }
}
