//! Plain-text normalization for API text fields.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^<>]*>").expect("valid tag pattern")
});
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("valid entity pattern")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("rsquo", "'"),
    ("lsquo", "'"),
    ("rdquo", "\""),
    ("ldquo", "\""),
    ("hellip", "..."),
    ("mdash", "-"),
    ("ndash", "-"),
    ("copy", "©"),
    ("reg", "®"),
    ("deg", "°"),
    ("aacute", "á"),
    ("agrave", "à"),
    ("auml", "ä"),
    ("ccedil", "ç"),
    ("eacute", "é"),
    ("egrave", "è"),
    ("iacute", "í"),
    ("ntilde", "ñ"),
    ("oacute", "ó"),
    ("ouml", "ö"),
    ("uacute", "ú"),
    ("uuml", "ü"),
];

/// Strips markup, decodes entities, uppercases and tidies whitespace.
///
/// Only element tags and comments count as markup: a `<` that is not
/// followed by a letter, `/` or `!--` is kept as text, so `3 < 5 > 4`
/// survives. Decoding can expose new markup (`&lt;b&gt;`), so the pass is
/// repeated until the text stops changing. Every pass after the first only
/// shortens the text, which bounds the loop and makes the function idempotent.
pub fn sanitize(text: &str) -> String {
    let mut current = normalize_once(text);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(text: &str) -> String {
    let stripped = TAG.replace_all(text, "");
    let decoded = ENTITY.replace_all(&stripped, |caps: &Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    let unescaped = decoded.replace("\\'", "'");
    let upper = unescaped.to_uppercase();
    WHITESPACE.replace_all(upper.trim(), " ").into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .or_else(|| {
            let lower = body.to_ascii_lowercase();
            NAMED_ENTITIES.iter().find(|(name, _)| *name == lower)
        })
        .map(|(_, value)| (*value).to_string())
}
