//! Word tokenizer for paragraph-vector training and inference.

use once_cell::sync::Lazy;
use regex::Regex;

/// Words (with inner apostrophes or hyphens) and single punctuation marks.
static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+(?:['’-]\w+)*|[^\w\s]").unwrap());

/// Split a paragraph into tokens. Case is preserved.
///
/// Falls back to splitting on spaces if the pattern finds nothing in
/// non-blank text.
pub fn tokenize(text: &str) -> Vec<String> {
    let tokens: Vec<String> = RE_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    if tokens.is_empty() && !text.trim().is_empty() {
        return text
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_and_punctuation() {
        assert_eq!(
            tokenize("Scope 1 emissions fell 12%."),
            vec!["Scope", "1", "emissions", "fell", "12", "%", "."]
        );
    }

    #[test]
    fn keeps_contractions_and_hyphens() {
        assert_eq!(
            tokenize("The company's net-zero plan"),
            vec!["The", "company's", "net-zero", "plan"]
        );
        assert_eq!(tokenize("We’re on track"), vec!["We’re", "on", "track"]);
    }

    #[test]
    fn empty_and_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n ").is_empty());
    }

    #[test]
    fn unicode_words() {
        assert_eq!(tokenize("Émissions réduites"), vec!["Émissions", "réduites"]);
    }
}
