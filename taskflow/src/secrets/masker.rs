//! Redaction of secret values and their derived variants.

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

/// The marker that replaces every secret occurrence.
pub const MASK: &str = "*******";

/// Derives a variant of a secret that must also be masked.
pub type SecretGenerator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Alternations longer than this are matched literally instead.
const MAX_PATTERN_LEN: usize = 256 * 1024;

/// Compiled program limit for the alternation.
const PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Default)]
struct MaskerState {
    secrets: Vec<String>,
    generators: Vec<SecretGenerator>,
    matcher: Option<Matcher>,
}

/// A compiled view of every maskable variant, longest first.
#[derive(Clone)]
enum Matcher {
    Pattern(Regex),
    Literals(Arc<Vec<String>>),
}

impl Matcher {
    fn build(variants: Vec<String>) -> Self {
        let alternation = variants
            .iter()
            .map(|v| regex::escape(v))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.len() > MAX_PATTERN_LEN {
            tracing::debug!(
                variants = variants.len(),
                pattern_len = alternation.len(),
                "Secret set too large for one pattern, masking literally"
            );
            return Self::Literals(Arc::new(variants));
        }

        match RegexBuilder::new(&alternation)
            .size_limit(PATTERN_SIZE_LIMIT)
            .dfa_size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(pattern) => Self::Pattern(pattern),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to compile secret mask pattern, masking literally");
                Self::Literals(Arc::new(variants))
            }
        }
    }

    fn mask(&self, text: &str) -> String {
        // Each pass removes at least one non-`*` character, so both loops terminate.
        let mut current = text.to_string();
        match self {
            Self::Pattern(pattern) => {
                while pattern.is_match(&current) {
                    current = pattern.replace_all(&current, MASK).into_owned();
                }
            }
            Self::Literals(variants) => loop {
                let mut changed = false;
                for variant in variants.as_slice() {
                    if current.contains(variant.as_str()) {
                        current = current.replace(variant.as_str(), MASK);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            },
        }
        current
    }
}

/// Tracks secrets and redacts them from arbitrary text.
///
/// Every generator is applied to every secret, including secrets added
/// before the generator was registered.
#[derive(Default)]
pub struct SecretMasker {
    state: RwLock<MaskerState>,
}

impl SecretMasker {
    /// Creates an empty masker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret value.
    ///
    /// Empty values and values made only of `*` are ignored: they would
    /// match inside the redaction marker.
    pub fn add(&self, secret: impl Into<String>) {
        let secret = secret.into();
        if !is_maskable(&secret) {
            return;
        }
        let mut state = self.state.write();
        if !state.secrets.contains(&secret) {
            state.secrets.push(secret);
            state.matcher = None;
        }
    }

    /// Registers a generator producing a derived variant of each secret.
    pub fn add_generator<F>(&self, generator: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        state.generators.push(Arc::new(generator));
        state.matcher = None;
    }

    /// Returns the number of raw secrets tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().secrets.len()
    }

    /// Returns true if no secrets are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().secrets.is_empty()
    }

    /// Replaces every secret and derived variant in `text` with [`MASK`].
    ///
    /// Longer variants are matched first. Masking repeats until the text is
    /// stable, so `mask(mask(t)) == mask(t)`.
    #[must_use]
    pub fn mask(&self, text: &str) -> String {
        match self.matcher() {
            Some(matcher) => matcher.mask(text),
            None => text.to_string(),
        }
    }

    fn matcher(&self) -> Option<Matcher> {
        if let Some(matcher) = self.state.read().matcher.clone() {
            return Some(matcher);
        }

        let mut state = self.state.write();
        if let Some(matcher) = state.matcher.clone() {
            return Some(matcher);
        }
        let mut variants: Vec<String> = Vec::new();
        for secret in &state.secrets {
            variants.push(secret.clone());
            for generator in &state.generators {
                variants.push(generator(secret));
            }
        }
        variants.retain(|v| is_maskable(v));
        variants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        variants.dedup();

        if variants.is_empty() {
            return None;
        }

        let matcher = Matcher::build(variants);
        state.matcher = Some(matcher.clone());
        Some(matcher)
    }
}

fn is_maskable(value: &str) -> bool {
    !value.is_empty() && !value.chars().all(|c| c == '*')
}

impl fmt::Debug for SecretMasker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SecretMasker")
            .field("secret_count", &state.secrets.len())
            .field("generator_count", &state.generators.len())
            .finish()
    }
}

/// Built-in generators for common secret encodings.
pub mod generators {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    /// Standard base64 encoding of the secret.
    #[must_use]
    pub fn base64(secret: &str) -> String {
        STANDARD.encode(secret.as_bytes())
    }

    /// Upper-case form of the secret.
    #[must_use]
    pub fn uppercase(secret: &str) -> String {
        secret.to_uppercase()
    }

    /// Lower-case form of the secret.
    #[must_use]
    pub fn lowercase(secret: &str) -> String {
        secret.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mask_literal_secret() {
        let masker = SecretMasker::new();
        masker.add("hunter2");

        assert_eq!(masker.mask("password=hunter2;"), format!("password={MASK};"));
    }

    #[test]
    fn test_mask_without_secrets_is_identity() {
        let masker = SecretMasker::new();
        assert_eq!(masker.mask("nothing to hide"), "nothing to hide");
    }

    #[test]
    fn test_mask_generator_variant() {
        let masker = SecretMasker::new();
        masker.add("super secret");
        masker.add_generator(generators::uppercase);

        assert_eq!(masker.mask("SUPER SECRET"), MASK);
    }

    #[test]
    fn test_generator_applies_to_later_secrets() {
        let masker = SecretMasker::new();
        masker.add_generator(generators::base64);
        masker.add("token");

        let encoded = generators::base64("token");
        assert_eq!(masker.mask(&format!("auth {encoded}")), format!("auth {MASK}"));
    }

    #[test]
    fn test_mask_multiple_and_overlapping() {
        let masker = SecretMasker::new();
        masker.add("abc");
        masker.add("abcdef");
        masker.add("xyz");

        assert_eq!(
            masker.mask("abcdef abc xyzabc"),
            format!("{MASK} {MASK} {MASK}{MASK}")
        );
    }

    #[test]
    fn test_mask_is_idempotent() {
        let masker = SecretMasker::new();
        masker.add("s3cr3t");
        masker.add("**x");
        masker.add("abc");

        for raw in ["s3cr3t", "abcx", "plain text", "a s3cr3t b abc"] {
            let once = masker.mask(raw);
            assert_eq!(masker.mask(&once), once);
        }
    }

    #[test]
    fn test_marker_only_secrets_ignored() {
        let masker = SecretMasker::new();
        masker.add("");
        masker.add("***");

        assert!(masker.is_empty());
        assert_eq!(masker.mask(MASK), MASK);
    }

    #[test]
    fn test_large_secret_set_is_still_masked() {
        let masker = SecretMasker::new();
        masker.add_generator(generators::base64);
        masker.add_generator(generators::uppercase);
        let secrets: Vec<String> = (0..400)
            .map(|i| format!("key-{i:04}-").repeat(400))
            .collect();
        for secret in &secrets {
            masker.add(secret.clone());
        }

        let line = format!(
            "first={} last={} encoded={}",
            secrets[0],
            secrets[399].to_uppercase(),
            generators::base64(&secrets[200])
        );
        let masked = masker.mask(&line);

        assert_eq!(masked, format!("first={MASK} last={MASK} encoded={MASK}"));
        assert_eq!(masker.mask(&masked), masked);
        for secret in &secrets {
            assert!(!masked.contains(secret.as_str()));
        }
    }

    #[test]
    fn test_literal_matching_agrees_with_pattern() {
        let variants: Vec<String> = ["abcdef", "abc", "xyz"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let literals = Matcher::Literals(Arc::new(variants));

        assert_eq!(
            literals.mask("abcdef abc xyzabc"),
            format!("{MASK} {MASK} {MASK}{MASK}")
        );
        assert_eq!(literals.mask("plain"), "plain");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let masker = SecretMasker::new();
        masker.add("p@ss.w(rd)+");

        assert_eq!(masker.mask("p@ssXw(rd)+"), "p@ssXw(rd)+");
        assert_eq!(masker.mask("p@ss.w(rd)+"), MASK);
    }
}
