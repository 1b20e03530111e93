// src/utils/url.rs

//! Search and document URL construction for the origin's advanced search.

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PageCursor, Partition};

/// Manifestation filter carried on every search URL: restrict results to
/// documents with a downloadable PDF/HTML/DOC rendition.
const MANIFESTATION_CLAUSE: &str = "orEMBEDDED_MANIFESTATION-TYPE%3Dpdf%3BEMBEDDED_MANIFESTATION-TYPE%3Dpdfa1a%3BEMBEDDED_MANIFESTATION-TYPE%3Dpdfa1b%3BEMBEDDED_MANIFESTATION-TYPE%3Dpdfa2a%3BEMBEDDED_MANIFESTATION-TYPE%3Dpdfx%3BEMBEDDED_MANIFESTATION-TYPE%3Dpdf1x%3BEMBEDDED_MANIFESTATION-TYPE%3Dhtml%3BEMBEDDED_MANIFESTATION-TYPE%3Dxhtml%3BEMBEDDED_MANIFESTATION-TYPE%3Ddoc%3BEMBEDDED_MANIFESTATION-TYPE%3Ddocx";

/// Sentinel the origin uses for results with no recorded year.
const UNKNOWN_YEAR_SENTINEL: &str = "FV_OTHER";

/// Interface languages offered by the origin, with the ISO-639-3 code used
/// in the content-language compose clause.
const LANGUAGES: &[(&str, &str)] = &[
    ("bg", "BUL"),
    ("es", "SPA"),
    ("cs", "CES"),
    ("da", "DAN"),
    ("de", "DEU"),
    ("et", "EST"),
    ("el", "ELL"),
    ("en", "ENG"),
    ("fr", "FRA"),
    ("ga", "GLE"),
    ("hr", "HRV"),
    ("it", "ITA"),
    ("lv", "LAV"),
    ("lt", "LIT"),
    ("hu", "HUN"),
    ("mt", "MLT"),
    ("nl", "NLD"),
    ("pl", "POL"),
    ("pt", "POR"),
    ("ro", "RON"),
    ("sk", "SLK"),
    ("sl", "SLV"),
    ("fi", "FIN"),
    ("sv", "SWE"),
];

/// Look up the ISO-639-3 content-language code for a two-letter interface
/// language. None for languages the origin does not offer.
pub fn content_language(lang: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(code, _)| *code == lang)
        .map(|(_, alpha3)| *alpha3)
}

/// Builds listing and document URLs for one interface language.
#[derive(Debug, Clone)]
pub struct SearchUrlBuilder {
    origin: Url,
    language: String,
    alpha3: &'static str,
}

impl SearchUrlBuilder {
    pub fn new(origin: &str, language: &str) -> Result<Self> {
        let alpha3 = content_language(language)
            .ok_or_else(|| AppError::validation(format!("unsupported language: {language}")))?;
        Ok(Self {
            origin: Url::parse(origin)?,
            language: language.to_string(),
            alpha3,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// URL of one listing page for a partition. A cursor token (the href of
    /// the previous page's next-arrow) takes precedence; otherwise the URL
    /// is built from scratch with an explicit `page` parameter.
    pub fn listing_url(&self, partition: &Partition, cursor: &PageCursor) -> String {
        if let Some(token) = &cursor.token {
            if let Ok(resolved) = self.origin.join(token) {
                return resolved.to_string();
            }
        }

        let year = if partition.year == "?" {
            UNKNOWN_YEAR_SENTINEL
        } else {
            &partition.year
        };

        format!(
            "{}search.html?SUBDOM_INIT=ALL_ALL&DTS_SUBDOM=ALL_ALL&DTS_DOM=ALL\
             &lang={lang}&locale={lang}&type=advanced\
             &wh0=andCOMPOSE%3D{alpha3}%2C{manifestation}\
             &DB_TYPE_OF_ACT=&typeOfActStatus=OTHER\
             &FM_CODED={category}&DD_YEAR={year}&page={page}&qid={qid}",
            self.origin,
            lang = self.language,
            alpha3 = self.alpha3,
            manifestation = MANIFESTATION_CLAUSE,
            category = partition.category,
            year = year,
            page = cursor.index,
            qid = chrono::Utc::now().timestamp(),
        )
    }

    /// Resolve a document endpoint from a listing page, rewriting the
    /// origin's `AUTO` language segment to the configured language.
    pub fn document_url(&self, listing_href: &str) -> String {
        let localized =
            listing_href.replace("AUTO", &format!("{}/ALL", self.language.to_uppercase()));
        self.origin
            .join(&localized)
            .map(|u| u.to_string())
            .unwrap_or(localized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SearchUrlBuilder {
        SearchUrlBuilder::new("https://eur-lex.europa.eu", "en").unwrap()
    }

    #[test]
    fn test_content_language_lookup() {
        assert_eq!(content_language("en"), Some("ENG"));
        assert_eq!(content_language("it"), Some("ITA"));
        assert_eq!(content_language("xx"), None);
    }

    #[test]
    fn test_rejects_unknown_language() {
        assert!(SearchUrlBuilder::new("https://eur-lex.europa.eu", "zz").is_err());
    }

    #[test]
    fn test_listing_url_carries_partition_and_page() {
        let url = builder().listing_url(
            &Partition::new("en", "2020", "REG"),
            &PageCursor::first(),
        );
        assert!(url.starts_with("https://eur-lex.europa.eu/search.html?"));
        assert!(url.contains("DD_YEAR=2020"));
        assert!(url.contains("FM_CODED=REG"));
        assert!(url.contains("page=1"));
        assert!(url.contains("lang=en"));
        assert!(url.contains("COMPOSE%3DENG"));
    }

    #[test]
    fn test_listing_url_prefers_cursor_token() {
        let cursor = PageCursor::first().next("./search.html?page=2&DD_YEAR=2020");
        let url = builder().listing_url(&Partition::new("en", "2020", "REG"), &cursor);
        assert_eq!(
            url,
            "https://eur-lex.europa.eu/search.html?page=2&DD_YEAR=2020"
        );
    }

    #[test]
    fn test_unknown_year_uses_sentinel() {
        let url = builder().listing_url(&Partition::new("en", "?", "REG"), &PageCursor::first());
        assert!(url.contains("DD_YEAR=FV_OTHER"));
    }

    #[test]
    fn test_document_url_localizes_auto_segment() {
        let url = builder().document_url("./legal-content/AUTO/?uri=CELEX:32020R0001");
        assert_eq!(
            url,
            "https://eur-lex.europa.eu/legal-content/EN/ALL/?uri=CELEX:32020R0001"
        );
    }
}
