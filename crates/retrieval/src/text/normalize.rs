//! Markup stripping for source content.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Entity replacements, applied in this order.
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Turn markup into plain text.
///
/// Replaces each tag with a space, decodes the common entities, collapses
/// whitespace runs to a single space and trims. Runs once: encoded brackets
/// (`Vec&lt;T&gt;`) come out as literal text and are not stripped again.
///
/// `normalize(normalize(x)) == normalize(x)` whenever the output holds no
/// markup, i.e. no `<...>` span and no entity; that covers every input
/// without encoded markup.
pub fn normalize(raw: &str) -> String {
    let mut out = TAG_RE.replace_all(raw, " ").into_owned();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    WHITESPACE_RE.replace_all(&out, " ").trim().to_string()
}

/// Rewrite chat-service markup (`<@U123>`, `<#C1|ops>`, `<!here>`,
/// `<https://...>`) into readable text.
pub fn clean_chat_markup(text: &str) -> String {
    text.replace("<@", "@")
        .replace('>', "")
        .replace("<#", "#")
        .replace("<!", "")
        .replace("<http", "http")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_markup(text: &str) -> bool {
        TAG_RE.is_match(text) || ENTITIES.iter().any(|(entity, _)| text.contains(entity))
    }

    #[test]
    fn test_strips_tags_and_entities() {
        assert_eq!(
            normalize("<p>Hello&nbsp;<b>world</b> &amp; friends</p>"),
            "Hello world & friends"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  one\n\n two\t\tthree  "), "one two three");
    }

    #[test]
    fn test_quotes_and_apostrophes() {
        assert_eq!(normalize("&quot;it&#39;s&quot;"), "\"it's\"");
    }

    #[test]
    fn test_block_elements_keep_words_apart() {
        assert_eq!(
            normalize("<ul><li>deploy</li><li>rollback</li></ul><p>Step</p><p>Two</p>"),
            "deploy rollback Step Two"
        );
    }

    #[test]
    fn test_encoded_brackets_become_literal() {
        assert_eq!(
            normalize("<p>Returns Vec&lt;String&gt; when a &lt; b and b &gt; c</p>"),
            "Returns Vec<String> when a < b and b > c"
        );
        assert_eq!(normalize("5 &lt; 6 and 7 &gt; 3"), "5 < 6 and 7 > 3");
    }

    #[test]
    fn test_entities_decode_in_order() {
        // &amp; is decoded before &lt;, matching a single sequential pass
        assert_eq!(normalize("a &amp;lt;b&amp;gt; c"), "a <b> c");
    }

    #[test]
    fn test_idempotent_on_samples() {
        let samples = [
            ("", ""),
            ("plain text", "plain text"),
            ("<div>x</div>", "x"),
            ("5 &lt; 6 and 7 &gt; 3", "5 < 6 and 7 > 3"),
            ("&amp;amp;nbsp;", "&amp;nbsp;"),
            ("<unclosed tag", "<unclosed tag"),
        ];
        for (sample, expected) in samples {
            let once = normalize(sample);
            assert_eq!(once, expected, "sample: {:?}", sample);
            if !has_markup(&once) {
                assert_eq!(normalize(&once), once, "sample: {:?}", sample);
            }
        }
    }

    #[test]
    fn test_clean_chat_markup() {
        assert_eq!(
            clean_chat_markup("<!here> ask <@U123> in <#C42|ops> see <https://x.io/a>"),
            "here ask @U123 in #C42|ops see https://x.io/a"
        );
    }
}
