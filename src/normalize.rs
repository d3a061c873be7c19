//! Normalizer: raw feed articles to cleaned, classified articles.
//!
//! One batch pass that, in input order:
//! 1. drops untitled articles and repeated urls (first occurrence wins),
//! 2. strips markup, bare links and whitespace noise from the body,
//! 3. drops anything not detected as the target language,
//! 4. assigns a [`Topic`] by keyword rules.
//!
//! All drops are silent at the API level; they are counted in a
//! [`NormalizeReport`] and logged at debug.

use crate::models::{CleanedArticle, RawArticle, Topic};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument};
use whatlang::{Detector, Lang, Script};

/// Marker returned when the language of a text cannot be determined.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Keyword rules in priority order. The first rule with any keyword
/// contained in the lower-cased body decides the topic.
const TOPIC_RULES: &[(Topic, &[&str])] = &[
    (
        Topic::Sports,
        &["sports", "match", "cricket", "tournament", "player"],
    ),
    (
        Topic::Crime,
        &["crime", "police", "murder", "attack", "theft", "arrest"],
    ),
    (
        Topic::Politics,
        &["government", "election", "minister", "parliament", "policy"],
    ),
    (
        Topic::Technology,
        &["tech", "software", "ai", "startup", "innovation", "data"],
    ),
    (
        Topic::Entertainment,
        &["movie", "film", "actor", "music", "celebrity", "show"],
    ),
];

/// Languages the feed can serve, with the two-letter code its `language`
/// parameter uses and the script each is written in. Detection is limited
/// to these, so the detector never answers with a language the feed could
/// not have been asked for (Latin, Esperanto, ...).
const FEED_LANGUAGES: &[(Lang, &str, Script)] = &[
    (Lang::Ara, "ar", Script::Arabic),
    (Lang::Cmn, "zh", Script::Mandarin),
    (Lang::Deu, "de", Script::Latin),
    (Lang::Eng, "en", Script::Latin),
    (Lang::Fra, "fr", Script::Latin),
    (Lang::Heb, "he", Script::Hebrew),
    (Lang::Ita, "it", Script::Latin),
    (Lang::Nld, "nl", Script::Latin),
    (Lang::Nob, "no", Script::Latin),
    (Lang::Por, "pt", Script::Latin),
    (Lang::Rus, "ru", Script::Cyrillic),
    (Lang::Spa, "es", Script::Latin),
    (Lang::Swe, "sv", Script::Latin),
    (Lang::Urd, "ur", Script::Arabic),
];

/// Remove `<...>` tags and `http…` links, collapse whitespace, trim.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = TAG_RE.replace_all(text, "");
    let text = LINK_RE.replace_all(&text, "");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Assign a topic from the first matching keyword rule, else `General`.
///
/// Matching is plain substring search, so rule order is the only
/// tie-break: a body mentioning both a match and an election is Sports.
pub fn classify_topic(text: &str) -> Topic {
    let text = text.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}

/// Best-effort language identification.
pub trait LanguageDetector {
    /// Two-letter language code, or [`UNKNOWN_LANGUAGE`].
    fn detect(&self, text: &str) -> String;
}

/// Trigram detector backed by `whatlang`, limited to the feed's languages.
///
/// Headline-length text rarely gives a confident guess. When the guess is
/// unreliable and the text is written in the target language's script, the
/// target language wins: a weak guess is not evidence that the article is
/// foreign. Confident guesses and other scripts are taken as detected.
pub struct WhatlangDetector {
    detector: Detector,
    target: Option<(Lang, Script)>,
}

impl WhatlangDetector {
    /// Detector that resolves unreliable same-script guesses to `target`
    /// (a two-letter code). An unsupported target gets no such preference.
    pub fn for_target(target: &str) -> Self {
        let allowlist = FEED_LANGUAGES.iter().map(|(lang, _, _)| *lang).collect();
        let target = FEED_LANGUAGES
            .iter()
            .find(|(_, code, _)| code.eq_ignore_ascii_case(target))
            .map(|(lang, _, script)| (*lang, *script));
        Self {
            detector: Detector::with_allowlist(allowlist),
            target,
        }
    }
}

impl fmt::Debug for WhatlangDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatlangDetector")
            .field("target", &self.target)
            .finish()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> String {
        let Some(info) = self.detector.detect(text) else {
            return UNKNOWN_LANGUAGE.to_string();
        };
        let lang = match self.target {
            Some((target, script)) if !info.is_reliable() && info.script() == script => target,
            _ => info.lang(),
        };
        FEED_LANGUAGES
            .iter()
            .find(|(l, _, _)| *l == lang)
            .map(|(_, code, _)| (*code).to_string())
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
    }
}

/// Counts of what a normalization pass kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub input: usize,
    pub kept: usize,
    pub untitled: usize,
    pub duplicates: usize,
    pub wrong_language: usize,
}

#[derive(Debug, Clone)]
pub struct Normalizer<D = WhatlangDetector> {
    target_language: String,
    detector: D,
}

impl Normalizer<WhatlangDetector> {
    pub fn new(target_language: &str) -> Self {
        Self::with_detector(target_language, WhatlangDetector::for_target(target_language))
    }
}

impl<D: LanguageDetector> Normalizer<D> {
    pub fn with_detector(target_language: &str, detector: D) -> Self {
        Self {
            target_language: target_language.to_lowercase(),
            detector,
        }
    }

    /// Normalize a batch of raw articles, preserving input order.
    ///
    /// An untitled article does not claim its url; a foreign-language one
    /// does, so a later duplicate of it is dropped as well.
    #[instrument(level = "info", skip_all, fields(input = raw.len(), target = %self.target_language))]
    pub fn normalize(&self, raw: &[RawArticle]) -> (Vec<CleanedArticle>, NormalizeReport) {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut report = NormalizeReport {
            input: raw.len(),
            ..Default::default()
        };
        let mut cleaned = Vec::new();

        for article in raw {
            let title = article.title().unwrap_or("").trim();
            let url = article.url().unwrap_or("");

            if title.is_empty() {
                debug!(%url, "Dropping untitled article");
                report.untitled += 1;
                continue;
            }
            if !seen.insert(url) {
                debug!(%url, "Dropping duplicate url");
                report.duplicates += 1;
                continue;
            }

            let content = clean_text(article.body());
            let sample = if content.is_empty() {
                title
            } else {
                content.as_str()
            };
            let lang = self.detector.detect(sample);
            if lang != self.target_language {
                debug!(%url, %lang, "Dropping article outside target language");
                report.wrong_language += 1;
                continue;
            }

            let topic = classify_topic(&content);
            cleaned.push(CleanedArticle {
                title: title.to_string(),
                url: url.to_string(),
                source: article.source_name(),
                content,
                topic,
            });
        }

        report.kept = cleaned.len();
        info!(
            kept = report.kept,
            untitled = report.untitled,
            duplicates = report.duplicates,
            wrong_language = report.wrong_language,
            "Normalized articles"
        );
        (cleaned, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Everything is the target language except text containing "bonjour".
    struct FixedDetector;

    impl LanguageDetector for FixedDetector {
        fn detect(&self, text: &str) -> String {
            if text.trim().is_empty() {
                UNKNOWN_LANGUAGE.to_string()
            } else if text.contains("bonjour") {
                "fr".to_string()
            } else {
                "en".to_string()
            }
        }
    }

    fn raw(title: &str, url: &str, content: &str) -> RawArticle {
        serde_json::from_value(json!({
            "source": {"id": null, "name": "Wire"},
            "title": title,
            "url": url,
            "content": content,
        }))
        .unwrap()
    }

    fn normalizer() -> Normalizer<FixedDetector> {
        Normalizer::with_detector("en", FixedDetector)
    }

    #[test]
    fn clean_text_strips_tags_links_and_whitespace() {
        let input = "  <p>Breaking:</p>\n\n  read  more at https://example.com/x?y=1 <b>now</b>\t ";
        assert_eq!(clean_text(input), "Breaking: read more at now");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("<br/>"), "");
    }

    #[test]
    fn topic_rules_follow_priority_order() {
        assert_eq!(
            classify_topic("The match was delayed by the election results"),
            Topic::Sports
        );
        assert_eq!(classify_topic("Police arrest suspect"), Topic::Crime);
        assert_eq!(classify_topic("new election policy"), Topic::Politics);
        assert_eq!(classify_topic("Startup raises funds"), Topic::Technology);
        assert_eq!(classify_topic("Film festival opens"), Topic::Entertainment);
        assert_eq!(classify_topic("weather is mild"), Topic::General);
        assert_eq!(classify_topic(""), Topic::General);
    }

    #[test]
    fn end_to_end_scenario_keeps_first_titled_url() {
        let input = vec![
            raw("A", "u1", "election news about policy"),
            raw("A2", "u1", "duplicate"),
            raw("", "u2", "..."),
        ];
        let (cleaned, report) = normalizer().normalize(&input);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].url, "u1");
        assert_eq!(cleaned[0].title, "A");
        assert_eq!(cleaned[0].topic, Topic::Politics);
        assert_eq!(cleaned[0].source.as_deref(), Some("Wire"));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.untitled, 1);
    }

    #[test]
    fn untitled_article_does_not_claim_url() {
        let input = vec![raw("   ", "u1", "first"), raw("Real", "u1", "second")];
        let (cleaned, _) = normalizer().normalize(&input);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].title, "Real");
    }

    #[test]
    fn foreign_language_is_dropped_and_claims_url() {
        let input = vec![
            raw("Salut", "u1", "bonjour tout le monde"),
            raw("Hello", "u1", "hello world"),
            raw("Other", "u2", "plain english"),
        ];
        let (cleaned, report) = normalizer().normalize(&input);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].url, "u2");
        assert_eq!(report.wrong_language, 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn empty_body_detects_on_title() {
        let (cleaned, _) = normalizer().normalize(&[raw("bonjour", "u1", "")]);
        assert!(cleaned.is_empty());

        let article = raw("Hello there", "u2", "<p></p>");
        let (cleaned, _) = normalizer().normalize(&[article]);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].content, "");
        assert_eq!(cleaned[0].topic, Topic::General);
    }

    #[test]
    fn title_is_trimmed_and_description_used_as_fallback() {
        let article: RawArticle = serde_json::from_value(json!({
            "title": "  Spaced  ",
            "url": "u1",
            "content": "",
            "description": "The <i>tournament</i> begins",
        }))
        .unwrap();
        let (cleaned, _) = normalizer().normalize(&[article]);
        assert_eq!(cleaned[0].title, "Spaced");
        assert_eq!(cleaned[0].content, "The tournament begins");
        assert_eq!(cleaned[0].topic, Topic::Sports);
    }

    #[test]
    fn output_preserves_input_order() {
        let input = vec![raw("C", "u3", "c"), raw("A", "u1", "a"), raw("B", "u2", "b")];
        let (cleaned, _) = normalizer().normalize(&input);
        let urls: Vec<_> = cleaned.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn normalizing_is_idempotent() {
        let input = vec![
            raw("One", "u1", "first story about the government"),
            raw("One again", "u1", "repeat"),
            raw("Two", "u2", "second <b>story</b> http://x.io"),
        ];
        let n = normalizer();
        let (first, _) = n.normalize(&input);
        let (second, _) = n.normalize(&input);
        assert_eq!(first, second);

        // Feeding the cleaned set back in changes nothing.
        let round: Vec<RawArticle> = first
            .iter()
            .map(|c| raw(&c.title, &c.url, &c.content))
            .collect();
        let (again, report) = n.normalize(&round);
        assert_eq!(again, first);
        assert_eq!(report.duplicates, 0);
    }

    #[test]
    fn whatlang_detects_english_and_rejects_other_languages() {
        let detector = WhatlangDetector::for_target("en");
        assert_eq!(
            detector.detect(
                "The government announced a new policy on Tuesday, and ministers said the \
                 changes would take effect before the next election."
            ),
            "en"
        );
        assert_eq!(
            detector.detect(
                "Die Bundesregierung hat am Dienstag neue Regeln für die Rente beschlossen. \
                 Nach Angaben des Ministeriums sollen die Änderungen noch vor der nächsten \
                 Wahl in Kraft treten, und die Opposition kündigte bereits Widerstand an, \
                 weil sie die Pläne für ungerecht und überstürzt hält."
            ),
            "de"
        );
        assert_eq!(
            detector.detect("Правительство объявило о новых мерах поддержки экономики"),
            "ru"
        );
        assert_eq!(detector.detect(""), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn whatlang_never_answers_outside_feed_languages() {
        let detector = WhatlangDetector::for_target("en");
        let supported: Vec<&str> = FEED_LANGUAGES.iter().map(|(_, code, _)| *code).collect();
        for text in [
            "Ceasefire holds in Gaza",
            "NASA delays Artemis launch",
            "Lorem ipsum dolor sit amet, consectetur adipiscing elit",
            "Labas rytas, kaip sekasi",
        ] {
            let lang = detector.detect(text);
            assert!(supported.contains(&lang.as_str()), "{text} -> {lang}");
        }
    }

    #[test]
    fn short_english_titles_survive_the_language_filter() {
        let titles = [
            "The quick update: officials say talks continue",
            "Ceasefire holds in Gaza",
            "NASA delays Artemis launch",
            "Stocks rally as inflation cools",
            "Storm knocks out power across the coast",
            "City council approves new budget",
        ];
        let input: Vec<RawArticle> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| raw(title, &format!("u{i}"), ""))
            .collect();

        let (cleaned, report) = Normalizer::new("en").normalize(&input);
        assert_eq!(report.wrong_language, 0);
        let kept: Vec<&str> = cleaned.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(kept, titles);
    }
}
