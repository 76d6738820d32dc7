/// Character conversions selectable from replacement templates via the
/// backslash directives `\u`, `\l`, `\h`, `\f`, `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Upper,
    Lower,
    HalfWidth,
    FullWidth,
    German,
}

impl Conversion {
    pub fn from_directive(ch: char) -> Option<Self> {
        match ch {
            'u' => Some(Self::Upper),
            'l' => Some(Self::Lower),
            'h' => Some(Self::HalfWidth),
            'f' => Some(Self::FullWidth),
            'n' => Some(Self::German),
            _ => None,
        }
    }

    pub fn apply(self, input: &str) -> String {
        match self {
            Self::Upper => input.to_uppercase(),
            Self::Lower => input.to_lowercase(),
            Self::HalfWidth => to_half_width(input),
            Self::FullWidth => to_full_width(input),
            Self::German => transliterate_german(input),
        }
    }
}

const WIDTH_OFFSET: u32 = 0xFEE0;

/// Narrows full-width ASCII (U+FF01..=U+FF5E) and the ideographic space.
/// Full-width katakana is left alone; only these width classes fold.
pub fn to_half_width(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(ch as u32 - WIDTH_OFFSET).unwrap_or(ch)
            }
            '\u{3000}' => ' ',
            other => other,
        })
        .collect()
}

/// Widens printable ASCII (space excluded) and half-width katakana, composing
/// trailing voiced/semi-voiced sound marks into single characters.
pub fn to_full_width(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '!'..='~' => {
                out.push(char::from_u32(ch as u32 + WIDTH_OFFSET).unwrap_or(ch));
            }
            '\u{FF66}'..='\u{FF9F}' => {
                let base = widen_katakana(ch);
                match chars.peek() {
                    Some('\u{FF9E}') => {
                        if let Some(composed) = with_voiced_mark(base) {
                            out.push(composed);
                            chars.next();
                        } else {
                            out.push(base);
                        }
                    }
                    Some('\u{FF9F}') => {
                        if let Some(composed) = with_semi_voiced_mark(base) {
                            out.push(composed);
                            chars.next();
                        } else {
                            out.push(base);
                        }
                    }
                    _ => out.push(base),
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn widen_katakana(ch: char) -> char {
    match ch {
        'ｦ' => 'ヲ',
        'ｧ' => 'ァ',
        'ｨ' => 'ィ',
        'ｩ' => 'ゥ',
        'ｪ' => 'ェ',
        'ｫ' => 'ォ',
        'ｬ' => 'ャ',
        'ｭ' => 'ュ',
        'ｮ' => 'ョ',
        'ｯ' => 'ッ',
        'ｰ' => 'ー',
        'ｱ' => 'ア',
        'ｲ' => 'イ',
        'ｳ' => 'ウ',
        'ｴ' => 'エ',
        'ｵ' => 'オ',
        'ｶ' => 'カ',
        'ｷ' => 'キ',
        'ｸ' => 'ク',
        'ｹ' => 'ケ',
        'ｺ' => 'コ',
        'ｻ' => 'サ',
        'ｼ' => 'シ',
        'ｽ' => 'ス',
        'ｾ' => 'セ',
        'ｿ' => 'ソ',
        'ﾀ' => 'タ',
        'ﾁ' => 'チ',
        'ﾂ' => 'ツ',
        'ﾃ' => 'テ',
        'ﾄ' => 'ト',
        'ﾅ' => 'ナ',
        'ﾆ' => 'ニ',
        'ﾇ' => 'ヌ',
        'ﾈ' => 'ネ',
        'ﾉ' => 'ノ',
        'ﾊ' => 'ハ',
        'ﾋ' => 'ヒ',
        'ﾌ' => 'フ',
        'ﾍ' => 'ヘ',
        'ﾎ' => 'ホ',
        'ﾏ' => 'マ',
        'ﾐ' => 'ミ',
        'ﾑ' => 'ム',
        'ﾒ' => 'メ',
        'ﾓ' => 'モ',
        'ﾔ' => 'ヤ',
        'ﾕ' => 'ユ',
        'ﾖ' => 'ヨ',
        'ﾗ' => 'ラ',
        'ﾘ' => 'リ',
        'ﾙ' => 'ル',
        'ﾚ' => 'レ',
        'ﾛ' => 'ロ',
        'ﾜ' => 'ワ',
        'ﾝ' => 'ン',
        'ﾞ' => '\u{309B}',
        'ﾟ' => '\u{309C}',
        other => other,
    }
}

fn with_voiced_mark(base: char) -> Option<char> {
    match base {
        'ウ' => Some('ヴ'),
        'カ' | 'キ' | 'ク' | 'ケ' | 'コ' | 'サ' | 'シ' | 'ス' | 'セ' | 'ソ' | 'タ' | 'チ'
        | 'ツ' | 'テ' | 'ト' | 'ハ' | 'ヒ' | 'フ' | 'ヘ' | 'ホ' => {
            char::from_u32(base as u32 + 1)
        }
        _ => None,
    }
}

fn with_semi_voiced_mark(base: char) -> Option<char> {
    match base {
        'ハ' | 'ヒ' | 'フ' | 'ヘ' | 'ホ' => char::from_u32(base as u32 + 2),
        _ => None,
    }
}

/// German transliteration: umlauts and sharp s expand to their ASCII digraphs.
/// A capital expands all-caps when an adjacent letter is uppercase, title-case
/// otherwise.
pub fn transliterate_german(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    for (idx, &ch) in chars.iter().enumerate() {
        match ch {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            'Ä' | 'Ö' | 'Ü' | 'ẞ' => {
                let upper = match ch {
                    'Ä' => "AE",
                    'Ö' => "OE",
                    'Ü' => "UE",
                    _ => "SS",
                };
                if adjacent_is_upper(&chars, idx) {
                    out.push_str(upper);
                } else {
                    let mut iter = upper.chars();
                    if let Some(first) = iter.next() {
                        out.push(first);
                    }
                    for rest in iter {
                        out.push(rest.to_ascii_lowercase());
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn adjacent_is_upper(chars: &[char], idx: usize) -> bool {
    let prev = idx.checked_sub(1).and_then(|p| chars.get(p));
    let next = chars.get(idx + 1);
    prev.is_some_and(|c| c.is_uppercase()) || next.is_some_and(|c| c.is_uppercase())
}
