/// Name normalization shared by the scanner and the matcher.
///
/// Product names ("Grace Coconut Milk 400ml") and file names
/// ("Grace_Coconut-Milk_400ml.png") are reduced to the same alphabet so they can
/// be compared: lowercase ASCII letters and digits, words joined by a single
/// separator.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Space,
    Hyphen,
}

impl Separator {
    fn as_char(self) -> char {
        match self {
            Separator::Space => ' ',
            Separator::Hyphen => '-',
        }
    }
}

/// Lowercase, drop everything outside `[a-z0-9]`, and collapse word boundaries
/// (whitespace, `-`, `_`, `.`, `/`) into one `sep`. Leading and trailing
/// boundaries are trimmed.
pub fn normalize(input: &str, sep: Separator) -> String {
    let sep = sep.as_char();
    let mut out = String::with_capacity(input.len());
    let mut boundary = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if boundary && !out.is_empty() {
                out.push(sep);
            }
            boundary = false;
            out.push(c);
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/') {
            boundary = true;
        }
    }

    out
}

/// Space-separated form used for matching.
pub fn normalize_words(input: &str) -> String {
    normalize(input, Separator::Space)
}

/// Hyphen-separated form used for generated file names.
pub fn slugify(input: &str) -> String {
    normalize(input, Separator::Hyphen)
}

/// Normalized words strictly longer than `min_len` characters.
pub fn significant_words(input: &str, min_len: usize) -> Vec<String> {
    normalize_words(input)
        .split(' ')
        .filter(|w| w.len() > min_len)
        .map(str::to_string)
        .collect()
}

/// File name without directories and without its final extension.
///
/// Dotfiles such as ".hidden" keep their full name.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_words() {
        assert_eq!(normalize_words("Grace Coconut Milk 400ml"), "grace coconut milk 400ml");
        assert_eq!(
            normalize_words("North_Coast_Organic_Apple_Cider_Vinegar"),
            "north coast organic apple cider vinegar"
        );
        assert_eq!(normalize_words("  Ackee -- & Saltfish!! "), "ackee saltfish");
        assert_eq!(normalize_words("Tropical Sun's Jerk"), "tropical suns jerk");
        assert_eq!(normalize_words(""), "");
        assert_eq!(normalize_words("!!!"), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Palm Oil (1L)"), "palm-oil-1l");
        assert_eq!(slugify("Gift  Card__50"), "gift-card-50");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Premium Vinegar",
            "  leading and trailing  ",
            "Café Crème",
            "a--b__c..d//e",
            "ÀÉÎ mixed UPPER lower 123",
            "-_-",
            "",
            "already normalized words",
        ];
        for input in inputs {
            for sep in [Separator::Space, Separator::Hyphen] {
                let once = normalize(input, sep);
                assert_eq!(normalize(&once, sep), once, "not idempotent for {input:?}");
            }
        }
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(
            significant_words("Premium Vinegar of the Isle", 2),
            vec!["premium", "vinegar", "the", "isle"]
        );
        assert!(significant_words("a of to", 2).is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("North_Coast.png"), "North_Coast");
        assert_eq!(file_stem("images/products/rice.tar.gz"), "rice.tar");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
