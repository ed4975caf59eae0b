//! Link extraction from index pages and selection of the most recent dataset.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static ANCHOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());

static HREF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).unwrap()
});

static CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static DIGITS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// A candidate dataset link found on an index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub label: String,
    pub url: String,
}

impl ResolvedLink {
    /// Last path segment of the URL, or the whole URL when it has none
    pub fn file_name(&self) -> &str {
        file_name_of(&self.url)
    }
}

pub(crate) fn file_name_of(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

/// Decode the handful of entities that show up in hrefs and link text
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Visible text of an HTML fragment with whitespace collapsed
pub(crate) fn text_content(fragment: &str) -> String {
    let stripped = TAG_REGEX.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_capture(caps: &regex::Captures<'_>) -> Option<String> {
    (1..caps.len()).find_map(|i| caps.get(i).map(|m| m.as_str().to_string()))
}

pub(crate) fn attr_href(attrs: &str) -> Option<String> {
    HREF_REGEX
        .captures(attrs)
        .and_then(|caps| first_capture(&caps))
        .map(|href| decode_entities(href.trim()))
}

pub(crate) fn attr_classes(attrs: &str) -> Vec<String> {
    CLASS_REGEX
        .captures(attrs)
        .and_then(|caps| first_capture(&caps))
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// An anchor as it appears in the page, before URL resolution
pub(crate) struct RawAnchor {
    pub start: usize,
    pub classes: Vec<String>,
    pub href: String,
    pub text: String,
}

pub(crate) fn raw_anchors(html: &str) -> impl Iterator<Item = RawAnchor> + '_ {
    ANCHOR_REGEX.captures_iter(html).filter_map(|caps| {
        let whole = caps.get(0)?;
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let href = attr_href(attrs)?;
        Some(RawAnchor {
            start: whole.start(),
            classes: attr_classes(attrs),
            href,
            text: caps.get(2).map(|m| text_content(m.as_str())).unwrap_or_default(),
        })
    })
}

/// Resolve an href against the page URL, keeping only http(s) targets
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<String> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Extract every http(s) link of an HTML page, resolving relative hrefs
/// against `base`. Links without visible text are labelled by file name.
pub fn extract_links(html: &[u8], base: &Url) -> Vec<ResolvedLink> {
    let html = String::from_utf8_lossy(html);
    raw_anchors(&html)
        .filter_map(|anchor| {
            let url = absolutize(base, &anchor.href)?;
            let label = if anchor.text.is_empty() {
                file_name_of(&url).to_string()
            } else {
                anchor.text
            };
            Some(ResolvedLink { label, url })
        })
        .collect()
}

/// Keep the links whose file name matches `pattern`
pub fn matching_links<'a>(
    links: &'a [ResolvedLink],
    pattern: &'a Regex,
) -> impl Iterator<Item = &'a ResolvedLink> + 'a {
    links
        .iter()
        .filter(move |link| pattern.is_match(link.file_name()))
}

/// Compare the numeric runs of two names as numbers, run by run, so that
/// `multas_2024_10` sorts after `multas_2024_9`. Runs of any length compare
/// without overflow.
pub fn compare_identifiers(a: &str, b: &str) -> Ordering {
    let runs = |s: &str| -> Vec<String> {
        DIGITS_REGEX
            .find_iter(s)
            .map(|m| {
                let trimmed = m.as_str().trim_start_matches('0');
                trimmed.to_string()
            })
            .collect()
    };
    let (a_runs, b_runs) = (runs(a), runs(b));

    for (x, y) in a_runs.iter().zip(b_runs.iter()) {
        let ord = x.len().cmp(&y.len()).then_with(|| x.cmp(y));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a_runs.len().cmp(&b_runs.len())
}

/// Pick the most recent link: greatest embedded identifier, ties broken by
/// lexicographic URL order.
pub fn select_latest<'a, I>(links: I) -> Option<&'a ResolvedLink>
where
    I: IntoIterator<Item = &'a ResolvedLink>,
{
    links.into_iter().max_by(|a, b| {
        compare_identifiers(a.file_name(), b.file_name()).then_with(|| a.url.cmp(&b.url))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://datos.madrid.es/portal/site/egob/").unwrap()
    }

    fn link(url: &str) -> ResolvedLink {
        ResolvedLink {
            label: file_name_of(url).to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_extract_links_resolves_relative_hrefs() {
        let html = br#"<html><body>
            <a href="/egob/catalogo/multas_2023.csv">Multas 2023</a>
            <a class="x" href='multas_2024.csv'><span>Multas</span> 2024</a>
            <a href=https://other.example.org/data.json>JSON</a>
        </body></html>"#;

        let links = extract_links(html, &base());
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://datos.madrid.es/egob/catalogo/multas_2023.csv");
        assert_eq!(links[0].label, "Multas 2023");
        assert_eq!(
            links[1].url,
            "https://datos.madrid.es/portal/site/egob/multas_2024.csv"
        );
        assert_eq!(links[1].label, "Multas 2024");
        assert_eq!(links[2].url, "https://other.example.org/data.json");
    }

    #[test]
    fn test_extract_links_skips_non_http_targets() {
        let html = br##"
            <a href="#top">top</a>
            <a href="mailto:datos@madrid.es">mail</a>
            <a href="javascript:void(0)">js</a>
            <a name="anchor-without-href">x</a>
            <a href="/a.csv?x=1&amp;y=2"></a>
        "##;

        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://datos.madrid.es/a.csv?x=1&y=2");
        assert_eq!(links[0].label, "a.csv");
    }

    #[test]
    fn test_extract_links_empty_document() {
        assert!(extract_links(b"", &base()).is_empty());
    }

    #[test]
    fn test_matching_links_uses_file_name() {
        let pattern = Regex::new(crate::config::DEFAULT_DATASET_PATTERN).unwrap();
        let links = vec![
            link("https://datos.madrid.es/multas/readme.txt"),
            link("https://datos.madrid.es/egob/210104-403-multas-circulacion-detalle.csv"),
            link("https://datos.madrid.es/egob/aparcamientos.csv"),
            link("https://datos.madrid.es/egob/210104-404-multas-circulacion-resumen.csv"),
        ];
        let matched: Vec<_> = matching_links(&links, &pattern).collect();
        assert_eq!(matched.len(), 1);
        assert!(matched[0].url.ends_with("detalle.csv"));
    }

    #[test]
    fn test_select_latest_by_year() {
        let links = vec![
            link("https://datos.madrid.es/multas_2023.csv"),
            link("https://datos.madrid.es/multas_2024.csv"),
        ];
        let latest = select_latest(&links).unwrap();
        assert_eq!(latest.file_name(), "multas_2024.csv");
    }

    #[test]
    fn test_select_latest_is_numeric_not_lexicographic() {
        let links = vec![
            link("https://datos.madrid.es/multas_2024_10.csv"),
            link("https://datos.madrid.es/multas_2024_9.csv"),
            link("https://datos.madrid.es/multas_2024_09.csv"),
        ];
        let latest = select_latest(&links).unwrap();
        assert_eq!(latest.file_name(), "multas_2024_10.csv");
    }

    #[test]
    fn test_select_latest_catalogue_numbers() {
        let links = vec![
            link("https://datos.madrid.es/egob/catalogo/210104-399-multas-circulacion-detalle.csv"),
            link("https://datos.madrid.es/egob/catalogo/210104-403-multas-circulacion-detalle.csv"),
            link("https://datos.madrid.es/egob/catalogo/210104-41-multas-circulacion-detalle.csv"),
        ];
        let latest = select_latest(&links).unwrap();
        assert!(latest.url.contains("210104-403-"));
    }

    #[test]
    fn test_select_latest_empty() {
        let links: Vec<ResolvedLink> = Vec::new();
        assert!(select_latest(&links).is_none());
    }

    #[test]
    fn test_compare_identifiers() {
        assert_eq!(compare_identifiers("a_2024", "a_2023"), Ordering::Greater);
        assert_eq!(compare_identifiers("a_007", "a_7"), Ordering::Equal);
        assert_eq!(compare_identifiers("a_2024_1", "a_2024"), Ordering::Greater);
        assert_eq!(compare_identifiers("plain", "plain"), Ordering::Equal);
        assert_eq!(
            compare_identifiers("x_99999999999999999999999999999999999999999", "x_1"),
            Ordering::Greater
        );
    }
}
