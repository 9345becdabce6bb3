use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strips markup and collapses whitespace in a fragment of HTML text.
pub fn strip_html(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Minimum length for a paragraph to count as substantive body text.
const MIN_PARAGRAPH_LEN: usize = 80;

/// Navigation/boilerplate markers that disqualify a paragraph.
const BOILERPLATE_MARKERS: &[&str] = &[
    "copyright",
    "all rights reserved",
    "cookie",
    "privacy policy",
    "sign up for our newsletter",
    "subscribe",
];

fn is_boilerplate(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Picks the description for a page. A source-declared content container
/// (CSS selector) takes priority: its text is line-trimmed and reassembled
/// with blank-line separators. Otherwise the largest substantive paragraph
/// wins (length-filtered, boilerplate-filtered).
pub fn extract_description(document: &Html, container_selector: Option<&str>) -> Option<String> {
    if let Some(css) = container_selector {
        if let Ok(selector) = Selector::parse(css) {
            if let Some(container) = document.select(&selector).next() {
                let text = container
                    .text()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }

    let p_selector = Selector::parse("p").ok()?;
    document
        .select(&p_selector)
        .map(|p| {
            WS_RE
                .replace_all(&p.text().collect::<String>(), " ")
                .trim()
                .to_string()
        })
        .filter(|text| text.len() >= MIN_PARAGRAPH_LEN && !is_boilerplate(text))
        .max_by_key(String::len)
}

/// Prefers the Open Graph image meta tag, then the first `<img>` that
/// doesn't look like a logo or icon. Relative URLs are resolved against
/// the page's origin.
pub fn extract_image(document: &Html, origin: &str) -> Option<String> {
    let og_selector = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    if let Some(meta) = document.select(&og_selector).next() {
        if let Some(content) = meta.value().attr("content") {
            if !content.trim().is_empty() {
                return Some(resolve_image_url(content.trim(), origin));
            }
        }
    }

    let img_selector = Selector::parse("img").ok()?;
    for img in document.select(&img_selector) {
        if let Some(src) = img.value().attr("src") {
            let lower = src.to_lowercase();
            if lower.contains("logo") || lower.contains("icon") || lower.contains("sprite") {
                continue;
            }
            if src.trim().is_empty() {
                continue;
            }
            return Some(resolve_image_url(src.trim(), origin));
        }
    }
    None
}

/// Resolves protocol-relative (`//...`) and root-relative (`/...`) URLs
/// against the source's origin (`https://host`).
pub fn resolve_image_url(src: &str, origin: &str) -> String {
    if src.starts_with("//") {
        format!("https:{}", src)
    } else if src.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), src)
    } else {
        src.to_string()
    }
}

/// Extracts `scheme://host` from a URL, for resolving relative links.
pub fn origin_of(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        let host_end = rest.find('/').unwrap_or(rest.len());
        format!("{}{}", &url[..scheme_end + 3], &rest[..host_end])
    } else {
        url.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_collapses_markup() {
        assert_eq!(
            strip_html("<p>Crafts &amp; <b>music</b>\n for kids</p>"),
            "Crafts & music for kids"
        );
    }

    #[test]
    fn named_container_beats_paragraph_scan() {
        let html = r#"
            <div class="event-body">
                Line one.
                <span>Line two.</span>
            </div>
            <p>A much longer generic paragraph that would otherwise win the length contest easily, full of text.</p>
        "#;
        let document = Html::parse_document(html);
        let desc = extract_description(&document, Some("div.event-body")).unwrap();
        assert!(desc.starts_with("Line one."));
        assert!(desc.contains("\n\n"));
    }

    #[test]
    fn paragraph_scan_skips_boilerplate_and_short_blocks() {
        let html = r#"
            <p>Short intro.</p>
            <p>Copyright 2026 Example Corp, all rights reserved, unauthorized use prohibited under penalty.</p>
            <p>Join us for an afternoon of hands-on tidepool exploration, guided by museum educators with live animals.</p>
        "#;
        let document = Html::parse_document(html);
        let desc = extract_description(&document, None).unwrap();
        assert!(desc.starts_with("Join us"));
    }

    #[test]
    fn og_image_wins_over_inline_images() {
        let html = r#"
            <head><meta property="og:image" content="/images/hero.jpg"></head>
            <body><img src="/images/banner.png"></body>
        "#;
        let document = Html::parse_document(html);
        let image = extract_image(&document, "https://example.org").unwrap();
        assert_eq!(image, "https://example.org/images/hero.jpg");
    }

    #[test]
    fn logos_and_icons_are_skipped() {
        let html = r#"<img src="/img/site-logo.png"><img src="//cdn.example.org/event.jpg">"#;
        let document = Html::parse_document(html);
        let image = extract_image(&document, "https://example.org").unwrap();
        assert_eq!(image, "https://cdn.example.org/event.jpg");
    }

    #[test]
    fn origin_extraction() {
        assert_eq!(origin_of("https://a.b.org/x/y?z=1"), "https://a.b.org");
        assert_eq!(origin_of("https://a.b.org"), "https://a.b.org");
    }
}
