/// Characters rejected in filesystem entry names. Kept visible so the set can
/// be checked and varied per platform convention; control characters are
/// always rejected as well.
pub const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

pub const PLACEHOLDER: char = '_';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOutcome {
    pub name: String,
    pub replaced: usize,
}

impl SanitizeOutcome {
    pub fn was_sanitized(&self) -> bool {
        self.replaced > 0
    }
}

/// Replaces every illegal character with the placeholder and counts how many
/// substitutions were made.
pub fn sanitize_name(candidate: &str) -> SanitizeOutcome {
    let mut name = String::with_capacity(candidate.len());
    let mut replaced = 0usize;
    for ch in candidate.chars() {
        if ch.is_control() || ILLEGAL_CHARS.contains(&ch) {
            name.push(PLACEHOLDER);
            replaced += 1;
        } else {
            name.push(ch);
        }
    }
    SanitizeOutcome { name, replaced }
}
