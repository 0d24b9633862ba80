/// Whether a glyph can join the crowd: hiragana, including voiced and small kana.
pub fn is_accepted(glyph: char) -> bool {
    ('ぁ'..='ん').contains(&glyph)
}

/// Accepted glyphs of `text`, in order, at most `limit` of them.
pub fn accepted(text: &str, limit: usize) -> Vec<char> {
    text.chars().filter(|&c| is_accepted(c)).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_hiragana() {
        assert_eq!(accepted("あいabcうカ漢ん", 50), vec!['あ', 'い', 'う', 'ん']);
        assert_eq!(accepted("がぱぁっょ", 50), vec!['が', 'ぱ', 'ぁ', 'っ', 'ょ']);
        assert!(accepted("hello", 50).is_empty());
    }

    #[test]
    fn respects_limit() {
        let text = "あ".repeat(80);
        assert_eq!(accepted(&text, 50).len(), 50);
    }
}
