// src/services/parser.rs

//! HTML extraction for listing and document pages.
//!
//! Parsing is strict about page shape: a page that carries neither results
//! nor the origin's empty-results marker is reported as unrecognized, so the
//! caller can tell a site redesign apart from an exhausted result set.

use scraper::{ElementRef, Html, Selector};

use crate::models::DocumentRef;
use crate::models::ParsedDocument;
use crate::utils::{document_id, hashed_id};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No result rows and no results container. The page markup does not
    /// look like a listing page at all.
    #[error("listing page markup not recognized")]
    UnrecognizedListing,

    /// Neither a text container nor a document frame was found.
    #[error("document page markup not recognized")]
    UnrecognizedDocument,

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// One parsed listing page.
#[derive(Debug)]
pub struct Listing {
    pub items: Vec<DocumentRef>,
    /// Href of the next-page arrow, if any. None means the last page.
    pub next: Option<String>,
}

fn sel(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{css}: {e:?}")))
}

fn clean_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .replace('\u{2019}', "'")
        .replace('\u{b4}', "'")
}

/// Extract document references and the next-page link from a listing page.
pub fn parse_listing(body: &[u8]) -> Result<Listing, ParseError> {
    let html = Html::parse_document(&String::from_utf8_lossy(body));

    let result_sel = sel("div.SearchResult")?;
    let skip_sel = sel("a.not-linkable-portion")?;
    let title_sel = sel("h2 a.title")?;
    let any_anchor_sel = sel("h2 a")?;
    let label_sel = sel("span.label")?;

    let mut items = Vec::new();
    for result in html.select(&result_sel) {
        if result.select(&skip_sel).next().is_some() {
            continue;
        }
        let Some(anchor) = result
            .select(&title_sel)
            .next()
            .or_else(|| result.select(&any_anchor_sel).next())
        else {
            continue;
        };

        let href = anchor.value().attr("href").unwrap_or_default();
        // The `name` attribute carries the canonical document endpoint; the
        // href is only the listing-local link.
        let url = anchor.value().attr("name").unwrap_or(href).to_string();
        if url.is_empty() {
            continue;
        }

        let id = document_id(href).unwrap_or_else(|| hashed_id(&url));
        let title = clean_text(anchor.text().collect::<String>().trim());
        let labels = result
            .select(&label_sel)
            .map(|l| l.text().collect::<String>().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        items.push(DocumentRef {
            id,
            title,
            url,
            labels,
        });
    }

    if items.is_empty() {
        // Distinguish "no more results" from "not a listing page".
        let marker_sel = sel(".SearchResultsCount, .no-results")?;
        if html.select(&marker_sel).next().is_none() {
            return Err(ParseError::UnrecognizedListing);
        }
    }

    let next = next_page_href(&html)?;
    Ok(Listing { items, next })
}

/// The next-page arrow is an icon inside an anchor; the anchor's href is the
/// opaque continuation token.
fn next_page_href(html: &Html) -> Result<Option<String>, ParseError> {
    let arrow_sel = sel("i.fa-angle-right")?;
    for icon in html.select(&arrow_sel) {
        // Skip the last-page double arrow.
        if icon.value().classes().any(|c| c == "fa-angle-double-right") {
            continue;
        }
        if let Some(parent) = icon.parent().and_then(ElementRef::wrap) {
            if let Some(href) = parent.value().attr("href") {
                return Ok(Some(href.to_string()));
            }
        }
    }
    Ok(None)
}

/// Extract EuroVoc classifiers and normalized full text from a document page.
pub fn parse_document(body: &[u8]) -> Result<ParsedDocument, ParseError> {
    let html = Html::parse_document(&String::from_utf8_lossy(body));

    let eurovoc_classifiers = eurovoc(&html)?;
    let mut pieces: Vec<String> = Vec::new();

    let texte_only_sel = sel("div#TexteOnly txt_te")?;
    let tab_content_sel = sel("div#document1 div.tabContent")?;

    if let Some(text_element) = html.select(&texte_only_sel).next() {
        // Old-layout pages put the title in a <strong> above the text body.
        let strong_sel = sel("div#document1 div.tabContent strong")?;
        if let Some(strong) = html.select(&strong_sel).next() {
            pieces.push(clean_text(&strong.text().collect::<String>()));
        }
        collect_children(text_element, &mut pieces)?;
    } else if let Some(tab) = html.select(&tab_content_sel).next() {
        let inner = tab
            .children()
            .filter_map(ElementRef::wrap)
            .find(|c| c.value().name() == "div");
        if let Some(inner) = inner {
            collect_children(inner, &mut pieces)?;
        }
    } else if eurovoc_classifiers.is_empty() {
        return Err(ParseError::UnrecognizedDocument);
    }

    Ok(ParsedDocument {
        eurovoc_classifiers,
        full_text: normalize(pieces),
    })
}

fn eurovoc(html: &Html) -> Result<Vec<String>, ParseError> {
    let classifier_sel = sel("div#PPClass_Contents ul li a")?;
    let mut codes = Vec::new();
    for anchor in html.select(&classifier_sel) {
        if let Some(href) = anchor.value().attr("href") {
            if let Some(tail) = href.split("DC_CODED=").nth(1) {
                let code = tail.split('&').next().unwrap_or(tail).trim();
                if !code.is_empty() {
                    codes.push(code.to_string());
                }
            }
        }
    }
    Ok(codes)
}

/// Walk the direct children of the text container, flattening paragraphs and
/// table rows. An <hr> becomes a separator so the preamble before the first
/// rule can be dropped.
fn collect_children(root: ElementRef<'_>, pieces: &mut Vec<String>) -> Result<(), ParseError> {
    let p_sel = sel("p")?;
    let tr_sel = sel("tr")?;

    for child in root.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "p" => pieces.push(clean_text(&child.text().collect::<String>())),
            "div" => {
                for p in child.select(&p_sel) {
                    pieces.push(clean_text(&p.text().collect::<String>()));
                }
            }
            "table" => {
                for tr in child.select(&tr_sel) {
                    pieces.push(clean_text(&tr.text().collect::<String>()));
                }
            }
            "hr" => pieces.push("[SEP]".to_string()),
            _ => {}
        }
    }
    Ok(())
}

/// Join pieces, drop everything before the first separator, and collapse
/// whitespace.
fn normalize(pieces: Vec<String>) -> String {
    let joined = pieces.join(" ");
    let body = match joined.split_once("[SEP]") {
        Some((_, tail)) => tail.replace("[SEP]", ""),
        None => joined,
    };
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}
