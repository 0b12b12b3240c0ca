//! Rule-based valence scorer.
//!
//! Each lexicon token contributes its valence, adjusted by the tokens around
//! it: boosters and dampeners within three tokens, negation within three
//! tokens, ALL-CAPS emphasis, a contrastive "but", and trailing exclamation
//! marks. The raw sum is squashed into `[-1, 1]` with `s / sqrt(s^2 + 15)`.

use std::collections::HashMap;

use super::SentimentScorer;

const NORMALIZATION_ALPHA: f64 = 15.0;
const BOOSTER_INCREMENT: f64 = 0.293;
const BOOSTER_DECREMENT: f64 = -0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const LOOKBACK: usize = 3;

const VALENCES: &[(&str, f64)] = &[
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 2.7),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("best", 3.2),
    ("better", 1.9),
    ("love", 3.2),
    ("happy", 2.7),
    ("win", 2.8),
    ("winning", 2.4),
    ("gain", 2.4),
    ("gains", 2.4),
    ("profit", 1.9),
    ("profits", 1.9),
    ("profitable", 1.9),
    ("strong", 2.3),
    ("bullish", 2.0),
    ("moon", 1.2),
    ("mooning", 1.6),
    ("rally", 1.6),
    ("surge", 1.4),
    ("rising", 0.8),
    ("positive", 2.6),
    ("optimistic", 1.8),
    ("hope", 1.9),
    ("safe", 1.9),
    ("secure", 1.4),
    ("support", 1.7),
    ("success", 2.7),
    ("successful", 2.8),
    ("growth", 1.6),
    ("adoption", 0.9),
    ("excited", 2.2),
    ("exciting", 2.2),
    ("nice", 1.8),
    ("wow", 2.8),
    ("thanks", 1.9),
    ("agree", 1.5),
    ("bad", -2.5),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("horrible", -2.5),
    ("hate", -2.7),
    ("loss", -1.3),
    ("losses", -1.7),
    ("lose", -1.8),
    ("losing", -1.6),
    ("lost", -1.3),
    ("crash", -1.7),
    ("crashing", -1.8),
    ("dump", -1.6),
    ("dumping", -1.6),
    ("scam", -2.7),
    ("fraud", -2.8),
    ("fear", -2.2),
    ("panic", -2.3),
    ("worried", -1.2),
    ("worry", -1.9),
    ("worst", -3.1),
    ("worse", -2.1),
    ("weak", -1.9),
    ("bearish", -1.8),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("risk", -1.1),
    ("risky", -1.4),
    ("hacked", -1.7),
    ("rekt", -2.0),
    ("sad", -2.1),
    ("angry", -2.3),
    ("problem", -1.7),
    ("ugly", -2.3),
    ("stupid", -2.4),
    ("bubble", -0.9),
    ("collapse", -2.2),
    ("falling", -0.9),
    ("dead", -3.3),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT),
    ("completely", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("hugely", BOOSTER_INCREMENT),
    ("incredibly", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("so", BOOSTER_INCREMENT),
    ("super", BOOSTER_INCREMENT),
    ("totally", BOOSTER_INCREMENT),
    ("very", BOOSTER_INCREMENT),
    ("barely", BOOSTER_DECREMENT),
    ("hardly", BOOSTER_DECREMENT),
    ("kinda", BOOSTER_DECREMENT),
    ("marginally", BOOSTER_DECREMENT),
    ("slightly", BOOSTER_DECREMENT),
    ("somewhat", BOOSTER_DECREMENT),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "without",
    "isnt", "arent", "wasnt", "dont", "doesnt", "didnt", "wont", "cant", "couldnt", "shouldnt",
    "wouldnt", "aint",
];

/// Lexicon-driven [`SentimentScorer`].
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    valences: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            valences: VALENCES.iter().copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
        }
    }

    /// Raw (unnormalized) valence sum. Exposed for diagnostics.
    #[must_use]
    pub fn raw_valence(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let lowered: Vec<String> = tokens.iter().map(|t| normalize_token(t)).collect();
        let shouting_everywhere = tokens.iter().filter(|t| has_letters(t)).all(|t| is_all_caps(t));

        let mut sentiments = vec![0.0; tokens.len()];
        for (i, word) in lowered.iter().enumerate() {
            let Some(&base) = self.valences.get(word.as_str()) else {
                continue;
            };
            let sign = base.signum();
            let mut valence = base;

            if !shouting_everywhere && is_all_caps(&tokens[i]) {
                valence += sign * CAPS_INCREMENT;
            }

            for distance in 1..=LOOKBACK.min(i) {
                let prev = &lowered[i - distance];
                if let Some(&scalar) = self.boosters.get(prev.as_str()) {
                    let damping = match distance {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    let mut boost = scalar * damping;
                    if !shouting_everywhere && is_all_caps(&tokens[i - distance]) {
                        boost += scalar.signum() * CAPS_INCREMENT;
                    }
                    valence += sign * boost;
                }
            }

            if (1..=LOOKBACK.min(i)).any(|d| is_negation(&lowered[i - d])) {
                valence *= NEGATION_SCALAR;
            }

            sentiments[i] = valence;
        }

        if let Some(but) = lowered.iter().position(|w| w == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < but {
                    *s *= 0.5;
                } else if i > but {
                    *s *= 1.5;
                }
            }
        }

        let mut total: f64 = sentiments.iter().sum();
        if total != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            total += total.signum() * bangs * EXCLAMATION_INCREMENT;
        }
        total
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        let total = self.raw_valence(text);
        if total == 0.0 {
            return 0.0;
        }
        (total / (total * total + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Lowercases and drops apostrophes so "don't" and "dont" match alike.
fn normalize_token(token: &str) -> String {
    token.to_lowercase().replace('\'', "")
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

fn has_letters(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
}

fn is_all_caps(token: &str) -> bool {
    token.chars().filter(|c| c.is_alphabetic()).count() > 1
        && token
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> f64 {
        LexiconScorer::new().score(text)
    }

    #[test]
    fn polarity_follows_lexicon() {
        assert!(score("Bitcoin looks strong and the gains are great") > 0.5);
        assert!(score("This is a scam and I hate it") < -0.5);
        assert_eq!(score("Ethereum block 123 was produced"), 0.0);
    }

    #[test]
    fn negation_flips_polarity() {
        assert!(score("good") > 0.0);
        assert!(score("not good") < 0.0);
        assert!(score("this is not really good") < 0.0);
        assert!(score("don't panic") > 0.0);
    }

    #[test]
    fn boosters_and_dampeners_scale_intensity() {
        assert!(score("very good") > score("good"));
        assert!(score("slightly good") < score("good"));
    }

    #[test]
    fn caps_emphasis_applies_only_against_lowercase_context() {
        assert!(score("GOOD news") > score("good news"));
        assert_eq!(score("GOOD NEWS"), score("good news"));
    }

    #[test]
    fn exclamations_add_emphasis_up_to_a_cap() {
        assert!(score("good!!!") > score("good"));
        assert_eq!(score("good!!!!"), score("good!!!!!!!!"));
    }

    #[test]
    fn but_shifts_weight_to_the_second_clause() {
        assert!(score("The price is good but the fees are terrible") < 0.0);
    }

    #[test]
    fn scores_stay_in_range_and_are_deterministic() {
        let text = "BEST BEST BEST amazing awesome great love win!!!!";
        let s = score(text);
        assert!(s > 0.9 && s <= 1.0);
        assert_eq!(s, score(text));
        assert!(score("worst scam fraud dead crash hate") >= -1.0);
    }
}
