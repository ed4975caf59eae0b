//! Monthly datasets.
//!
//! The portal lists one entry per month as an `li.asociada-item` block. Its
//! `p.info-title` reads `"<year> <month in Spanish>"` and the CSV of the
//! "Detalle" file is an `a.asociada-link.ico-csv` following a `<p>Detalle</p>`
//! marker.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::FinesError;
use crate::resolver::links::{ResolvedLink, absolutize, raw_anchors, text_content};

/// First year with published fines data
pub const FIRST_YEAR: i32 = 2017;

static ITEM_START_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<li\b[^>]*\bclass\s*=\s*["'][^"']*\basociada-item\b[^"']*["'][^>]*>"#)
        .unwrap()
});

static INFO_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<p\b[^>]*\bclass\s*=\s*["'][^"']*\binfo-title\b[^"']*["'][^>]*>(.*?)</p\s*>"#)
        .unwrap()
});

static DETALLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>\s*Detalle\s*</p\s*>").unwrap());

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// A calendar month of published data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, FinesError> {
        if !(1..=12).contains(&month) {
            return Err(FinesError::InvalidPeriod(format!("invalid month: {month}")));
        }
        if year < FIRST_YEAR {
            return Err(FinesError::InvalidPeriod(format!(
                "year out of range: {year} (data starts in {FIRST_YEAR})"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Parse an index page title such as `"2025 Abril"`
    pub fn from_title(title: &str) -> Option<Self> {
        let mut parts = title.split_whitespace();
        let year = parts.next()?.parse::<i32>().ok()?;
        let month_name = parts.next()?.to_lowercase();
        if parts.next().is_some() {
            return None;
        }
        let month = if month_name == "setiembre" {
            9
        } else {
            MONTHS.iter().position(|m| *m == month_name)? as u32 + 1
        };
        Self::new(year, month).ok()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = FinesError;

    /// Accepts `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FinesError::InvalidPeriod(format!("expected YYYY-MM, got `{s}`"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// A dataset link tied to the month it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodLink {
    pub period: Period,
    pub link: ResolvedLink,
}

fn period_link_in_block(block: &str, base: &Url) -> Option<PeriodLink> {
    let title = INFO_TITLE_REGEX
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| text_content(m.as_str()))?;
    let period = Period::from_title(&title)?;

    let detalle_at = DETALLE_REGEX.find(block)?.end();
    let anchor = raw_anchors(&block[detalle_at..]).find(|anchor| {
        anchor.classes.iter().any(|c| c == "asociada-link")
            && anchor.classes.iter().any(|c| c == "ico-csv")
    })?;
    let url = absolutize(base, &anchor.href)?;

    Some(PeriodLink {
        period,
        link: ResolvedLink { label: title, url },
    })
}

/// Extract the monthly "Detalle" CSV links of a portal index page
pub fn extract_period_links(html: &[u8], base: &Url) -> Vec<PeriodLink> {
    let html = String::from_utf8_lossy(html);
    let starts: Vec<usize> = ITEM_START_REGEX
        .find_iter(&html)
        .map(|m| m.start())
        .collect();

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            period_link_in_block(&html[start..end], base)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<ul class="asociada-list">
  <li class="asociada-item">
    <div class="asociada-info"><p class="info-title">2025 Abril</p></div>
    <div class="asociada-files">
      <p>Resumen</p>
      <a class="asociada-link ico-csv" href="/egob/catalogo/210104-402-multas-circulacion-resumen.csv">CSV</a>
      <p>Detalle</p>
      <a class="asociada-link ico-xls" href="/egob/catalogo/210104-403-multas-circulacion-detalle.xlsx">XLSX</a>
      <a class="asociada-link ico-csv" href="/egob/catalogo/210104-403-multas-circulacion-detalle.csv">CSV</a>
    </div>
  </li>
  <li class="asociada-item hide">
    <div class="asociada-info"><p class="info-title">2025 Marzo</p></div>
    <p>Detalle</p>
    <a class="asociada-link ico-csv" href="/egob/catalogo/210104-399-multas-circulacion-detalle.csv">CSV</a>
  </li>
  <li class="asociada-item">
    <p class="info-title">Documentación</p>
    <p>Detalle</p>
    <a class="asociada-link ico-csv" href="/egob/catalogo/estructura.csv">CSV</a>
  </li>
  <li class="asociada-item">
    <p class="info-title">2025 Febrero</p>
    <a class="asociada-link ico-csv" href="/egob/catalogo/no-detalle.csv">CSV</a>
  </li>
</ul>"#;

    fn base() -> Url {
        Url::parse("https://datos.madrid.es/sites/v/index.jsp").unwrap()
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(2024, 13).is_err());
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2016, 5).is_err());
        let period = Period::new(2024, 5).unwrap();
        assert_eq!(period.to_string(), "2024-05");
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("2024-05".parse::<Period>().unwrap(), Period::new(2024, 5).unwrap());
        assert!("2024/05".parse::<Period>().is_err());
        assert!("2024-13".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_from_title() {
        assert_eq!(Period::from_title("2025 Abril"), Some(Period::new(2025, 4).unwrap()));
        assert_eq!(Period::from_title("2023  diciembre"), Some(Period::new(2023, 12).unwrap()));
        assert_eq!(Period::from_title("2020 Setiembre"), Some(Period::new(2020, 9).unwrap()));
        assert_eq!(Period::from_title("Abril 2025"), None);
        assert_eq!(Period::from_title("2025 April"), None);
    }

    #[test]
    fn test_extract_period_links_takes_detalle_csv() {
        let links = extract_period_links(PAGE.as_bytes(), &base());
        assert_eq!(links.len(), 2);

        assert_eq!(links[0].period, Period::new(2025, 4).unwrap());
        assert_eq!(
            links[0].link.url,
            "https://datos.madrid.es/egob/catalogo/210104-403-multas-circulacion-detalle.csv"
        );
        assert_eq!(links[0].link.label, "2025 Abril");

        assert_eq!(links[1].period, Period::new(2025, 3).unwrap());
        assert!(links[1].link.url.ends_with("210104-399-multas-circulacion-detalle.csv"));
    }

    #[test]
    fn test_extract_period_links_empty_page() {
        assert!(extract_period_links(b"", &base()).is_empty());
        assert!(extract_period_links(b"<html><li>2025 Abril</li></html>", &base()).is_empty());
    }
}
