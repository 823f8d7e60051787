//! Filename normalization: ordered rewrite rules followed by title-casing

use regex::Regex;
use crate::config::TitleCase;

/// Stem used when every rule and the raw name leave nothing behind.
pub const EMPTY_NAME_FALLBACK: &str = "Untitled";

/// One pattern/replacement pair. `skip_prefix` rejects a match whose text
/// starts with that prefix and retries one character further on.
struct RenameRule {
    pattern: Regex,
    replacement: &'static str,
    skip_prefix: Option<&'static str>,
}

impl RenameRule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            replacement,
            skip_prefix: None,
        }
    }

    fn skipping(mut self, prefix: &'static str) -> Self {
        self.skip_prefix = Some(prefix);
        self
    }

    fn apply(&self, input: &str) -> String {
        let Some(prefix) = self.skip_prefix else {
            return self.pattern.replace_all(input, self.replacement).into_owned();
        };

        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        let mut pos = 0;
        while let Some(m) = self.pattern.find_at(input, pos) {
            let rest = &input[m.start()..];
            if rest.starts_with(prefix) {
                pos = m.start() + rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            out.push_str(&input[last..m.start()]);
            out.push_str(self.replacement);
            last = m.end();
            pos = m.end();
        }
        out.push_str(&input[last..]);
        out
    }
}

pub struct FilenameNormalizer {
    rules: Vec<RenameRule>,
    policy: TitleCase,
}

impl FilenameNormalizer {
    pub fn new(policy: TitleCase) -> Self {
        // Order matters: earlier rewrites create and destroy matches for later ones.
        let rules = vec![
            RenameRule::new(r"--", " - "),
            RenameRule::new(r"_+", " "),
            // leading track tokens such as "01_" or "A1."
            RenameRule::new(r"(?i)^[a-c0-9]{1,3}[\s\-_.]+", ""),
            // advertised domains, bare or wrapped: "(www.site.com)"
            RenameRule::new(
                r"(?i)\(*(?:_-\s)*(?:www\.*)*-*[a-z0-9(\-]+\.[\[(]*(?:net|com|org|ru)+[)\]\[*\d]*",
                "",
            ),
            // release group fragments before a dot
            RenameRule::new(r"(?i)[-_)]+[a-z0-9]{2,3}\.", ".").skipping(")-"),
            RenameRule::new(r"(?i)[-_]*siberia", ""),
        ];

        Self { rules, policy }
    }

    /// Runs the rewrite rules and title-cases the result. Never returns an empty
    /// string: an empty outcome falls back to the title-cased raw stem, then to
    /// [`EMPTY_NAME_FALLBACK`].
    pub fn normalize_stem(&self, raw_stem: &str) -> String {
        let rewritten = self
            .rules
            .iter()
            .fold(raw_stem.to_string(), |name, rule| rule.apply(&name));

        let cased = title_case(rewritten.trim(), self.policy);
        if !cased.is_empty() {
            return cased;
        }

        let raw = title_case(raw_stem.trim(), self.policy);
        if raw.is_empty() {
            EMPTY_NAME_FALLBACK.to_string()
        } else {
            raw
        }
    }

    /// Normalized stem with `extension` (leading dot included) appended as given.
    pub fn normalize(&self, raw_stem: &str, extension: &str) -> String {
        format!("{}{}", self.normalize_stem(raw_stem), extension)
    }
}

/// Capitalises the first character of every word and lowercases the rest.
/// A word is a run of alphanumerics and apostrophes, so "(original mix)"
/// becomes "(Original Mix)" and "3rd" stays "3rd".
pub fn title_case(text: &str, policy: TitleCase) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            word.push(c);
        } else {
            push_word(&mut out, &word, policy);
            word.clear();
            out.push(c);
        }
    }
    push_word(&mut out, &word, policy);
    out
}

fn push_word(out: &mut String, word: &str, policy: TitleCase) {
    if word.is_empty() {
        return;
    }
    if policy == TitleCase::Culture && is_acronym(word) {
        out.push_str(word);
        return;
    }

    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
    }
    for c in chars {
        out.extend(c.to_lowercase());
    }
}

fn is_acronym(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() > 1 && letters.iter().all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalizer() -> FilenameNormalizer {
        FilenameNormalizer::new(TitleCase::Culture)
    }

    #[test]
    fn test_track_number_and_domain_are_stripped() {
        let n = normalizer();
        assert_eq!(n.normalize("01_artist--title_www.site.com", ".mp3"), "Artist - Title.mp3");
        assert_eq!(n.normalize("7_artist--title_www.site.com", ".mp3"), "Artist - Title.mp3");
        assert_eq!(n.normalize("A1_artist--title_www.site.com", ".mp3"), "Artist - Title.mp3");
        assert_eq!(n.normalize("b12_artist--title_www.site.com", ".mp3"), "Artist - Title.mp3");
    }

    #[test]
    fn test_end_to_end_example_name() {
        let n = normalizer();
        assert_eq!(
            n.normalize("01_dj_mix--club_anthem_www.tracks.net", ".mp3"),
            "Dj Mix - Club Anthem.mp3"
        );
    }

    #[test]
    fn test_parenthesized_domain() {
        let n = normalizer();
        assert_eq!(
            n.normalize_stem("Artist - Title (www.promo-site.org)"),
            "Artist - Title"
        );
    }

    #[test]
    fn test_already_normalized_name_is_unchanged() {
        let n = normalizer();
        assert_eq!(n.normalize_stem("Artist - Title"), "Artist - Title");
        assert_eq!(n.normalize_stem("artist - title (original mix)"), "Artist - Title (Original Mix)");
    }

    #[test]
    fn test_underscores_collapse() {
        assert_eq!(normalizer().normalize_stem("deep___house__track"), "Deep House Track");
    }

    #[test]
    fn test_release_group_fragment_before_dot() {
        let n = normalizer();
        assert_eq!(n.normalize_stem("artist - title-xyz.part"), "Artist - Title.Part");
    }

    #[test]
    fn test_release_group_rule_skips_paren_dash() {
        // ")-" may not open the match, so only "-ab." is rewritten
        let n = normalizer();
        assert_eq!(n.normalize_stem("mix)-ab.x"), "Mix).X");
    }

    #[test]
    fn test_siberia_tag_removed() {
        assert_eq!(normalizer().normalize_stem("artist - title-siberia"), "Artist - Title");
        assert_eq!(normalizer().normalize_stem("artist - title_SIBERIA"), "Artist - Title");
    }

    #[test]
    fn test_extension_appended_unmodified() {
        assert_eq!(normalizer().normalize("artist - title", ".FLAC"), "Artist - Title.FLAC");
    }

    #[test]
    fn test_empty_result_falls_back_to_raw_stem() {
        let n = normalizer();
        // the domain rule consumes the whole name
        assert_eq!(n.normalize_stem("promo.com"), "Promo.Com");
        assert_eq!(n.normalize(" ", ".mp3"), "Untitled.mp3");
    }

    #[test]
    fn test_title_case_policies() {
        assert_eq!(title_case("DJ shadow - o'neil 3rd", TitleCase::Culture), "DJ Shadow - O'neil 3rd");
        assert_eq!(title_case("DJ shadow", TitleCase::Strict), "Dj Shadow");
        assert_eq!(title_case("A tribe", TitleCase::Culture), "A Tribe");
    }
}
