//! Text folding shared by key canonicalization and store matching

use unicode_segmentation::UnicodeSegmentation;

/// Characters folded to their unaccented ASCII form.
///
/// Store-side matching replays the same table in SQL, so both sides of a
/// comparison fold identically.
pub const DIACRITIC_FOLDS: &[(char, char)] = &[
    ('á', 'a'),
    ('à', 'a'),
    ('ä', 'a'),
    ('â', 'a'),
    ('ã', 'a'),
    ('é', 'e'),
    ('è', 'e'),
    ('ë', 'e'),
    ('ê', 'e'),
    ('í', 'i'),
    ('ì', 'i'),
    ('ï', 'i'),
    ('î', 'i'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ö', 'o'),
    ('ô', 'o'),
    ('õ', 'o'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('ü', 'u'),
    ('û', 'u'),
    ('ñ', 'n'),
    ('ç', 'c'),
];

fn fold_char(c: char) -> char {
    DIACRITIC_FOLDS
        .iter()
        .find(|(from, _)| *from == c)
        .map_or(c, |(_, to)| *to)
}

/// Lowercase and strip diacritics, leaving everything else untouched
pub fn strip_diacritics(text: &str) -> String {
    text.to_lowercase().chars().map(fold_char).collect()
}

/// Case-fold, strip diacritics, drop punctuation and collapse whitespace
pub fn fold(text: &str) -> String {
    words(text).join(" ")
}

/// Folded words of a text, in order
pub fn words(text: &str) -> Vec<String> {
    strip_diacritics(text)
        .unicode_words()
        .map(str::to_string)
        .collect()
}

/// Folded words joined into an identifier fragment (`Luis  Pérez` -> `luis_perez`)
pub fn identifier(text: &str) -> String {
    words(text).join("_")
}
