//! URL slugs derived from store names.
//!
//! A store at `/store/{slug}` is addressed by a lowercase, hyphenated form of
//! its name. Two stores called "Joe's Diner" get `joes-diner` and
//! `joes-diner-2`; the numbering is decided by [`disambiguate`] from the number
//! of existing slugs in the same family, and the database unique constraint
//! has the final word when two requests race.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Fallback base when a name has no characters that survive normalization.
pub const FALLBACK_SLUG: &str = "store";

/// Longest base slug kept before any `-N` suffix is appended.
pub const MAX_BASE_LENGTH: usize = 80;

/// A URL-safe store identifier: `[a-z0-9]+(-[a-z0-9]+)*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Build the base slug for a display name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(slugify(name))
    }

    /// Wrap a slug read back from storage or a request path.
    ///
    /// Returns `None` if the value is not in canonical slug form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value
                .split('-')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        valid.then(|| Self(value.to_owned()))
    }

    /// This slug with a numeric suffix, e.g. `coffee` → `coffee-3`.
    #[must_use]
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Case-insensitive `PostgreSQL` regex matching this base and every
    /// numbered variant of it (`^(base)(-[0-9]+)?$`).
    ///
    /// Slugs only contain `[a-z0-9-]`, none of which are regex
    /// metacharacters, so the base is embedded as-is.
    #[must_use]
    pub fn family_pattern(&self) -> String {
        format!("^({})(-[0-9]+)?$", self.0)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a display name into a base slug.
///
/// Latin accented letters are folded to ASCII, apostrophes and combining
/// marks are dropped, and every other run of non-alphanumeric characters becomes a single hyphen.
///
/// ```
/// use delicious_core::slugify;
///
/// assert_eq!(slugify("  Joe's   Diner & Grill! "), "joes-diner-grill");
/// assert_eq!(slugify("Café Crème"), "cafe-creme");
/// assert_eq!(slugify("!!!"), "store");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if matches!(c, '\'' | '\u{2019}' | '\u{0300}'..='\u{036F}') {
            continue;
        }
        let folded = if c.is_ascii_alphanumeric() {
            Some(FoldedChar::One(c))
        } else {
            fold_latin(c)
        };

        match folded {
            Some(folded) => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                folded.push_into(&mut slug);
            }
            None => pending_hyphen = true,
        }
    }

    if slug.len() > MAX_BASE_LENGTH {
        slug.truncate(MAX_BASE_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_owned()
    } else {
        slug
    }
}

/// Pick the slug for a new name given how many existing slugs share its family.
///
/// Count-based: zero matches keeps the base, otherwise the suffix is
/// `count + 1`. Gaps left by deleted stores are not reused, and concurrent
/// inserts can land on the same suffix, so callers must still rely on the
/// unique constraint and retry with [`Slug::with_suffix`].
#[must_use]
pub fn disambiguate(base: &Slug, existing_matches: usize) -> Slug {
    if existing_matches == 0 {
        base.clone()
    } else {
        base.with_suffix(existing_matches + 1)
    }
}

enum FoldedChar {
    One(char),
    Two(char, char),
}

impl FoldedChar {
    fn push_into(self, out: &mut String) {
        match self {
            Self::One(a) => out.push(a),
            Self::Two(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }
}

/// ASCII folding for lowercase Latin letters with diacritics.
const fn fold_latin(c: char) -> Option<FoldedChar> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => FoldedChar::One('a'),
        'ç' | 'ć' | 'č' => FoldedChar::One('c'),
        'ď' | 'ð' => FoldedChar::One('d'),
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => FoldedChar::One('e'),
        'ì' | 'í' | 'î' | 'ï' | 'ī' => FoldedChar::One('i'),
        'ł' => FoldedChar::One('l'),
        'ñ' | 'ń' | 'ň' => FoldedChar::One('n'),
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => FoldedChar::One('o'),
        'ř' => FoldedChar::One('r'),
        'ś' | 'š' => FoldedChar::One('s'),
        'ť' => FoldedChar::One('t'),
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => FoldedChar::One('u'),
        'ý' | 'ÿ' => FoldedChar::One('y'),
        'ź' | 'ż' | 'ž' => FoldedChar::One('z'),
        'æ' => FoldedChar::Two('a', 'e'),
        'œ' => FoldedChar::Two('o', 'e'),
        'ß' => FoldedChar::Two('s', 's'),
        'þ' => FoldedChar::Two('t', 'h'),
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Coffee Shop"), "coffee-shop");
        assert_eq!(slugify("coffee-shop"), "coffee-shop");
        assert_eq!(slugify("  The   Big  Burrito  "), "the-big-burrito");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("--Dashes--everywhere--"), "dashes-everywhere");
        assert_eq!(slugify("Bob’s Bagels"), "bobs-bagels");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("Straße"), "strasse");
        assert_eq!(slugify("ÆBLE"), "aeble");
    }

    #[test]
    fn test_slugify_drops_combining_marks() {
        // 'İ' lowercases to 'i' followed by U+0307
        assert_eq!(slugify("İstanbul Kebab"), "istanbul-kebab");
        assert_eq!(slugify("Cafe\u{0301} Noir"), "cafe-noir");
    }

    #[test]
    fn test_slugify_drops_unfoldable_scripts() {
        assert_eq!(slugify("寿司 Sushi 寿司"), "sushi");
        assert_eq!(slugify("寿司"), FALLBACK_SLUG);
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("7-Eleven #42"), "7-eleven-42");
    }

    #[test]
    fn test_slugify_truncates_long_names() {
        let name = "word ".repeat(40);
        let slug = slugify(&name);
        assert!(slug.len() <= MAX_BASE_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_output_is_parseable() {
        for name in ["Joe's Diner", "Café", "A  &  B", "!!!", "x"] {
            assert!(Slug::parse(&slugify(name)).is_some(), "{name}");
        }
    }

    #[test]
    fn test_disambiguate_counts_matches() {
        let base = Slug::from_name("Joe's Diner");
        assert_eq!(disambiguate(&base, 0).as_str(), "joes-diner");
        assert_eq!(disambiguate(&base, 1).as_str(), "joes-diner-2");
        assert_eq!(disambiguate(&base, 4).as_str(), "joes-diner-5");
    }

    #[test]
    fn test_family_pattern() {
        let base = Slug::from_name("Coffee Shop");
        assert_eq!(base.family_pattern(), "^(coffee-shop)(-[0-9]+)?$");
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert!(Slug::parse("ok-slug-2").is_some());
        assert!(Slug::parse("").is_none());
        assert!(Slug::parse("Upper").is_none());
        assert!(Slug::parse("double--hyphen").is_none());
        assert!(Slug::parse("-leading").is_none());
        assert!(Slug::parse("../etc").is_none());
    }
}
