//! Remote catalog resolution.
//!
//! Each dataset kind has a listing tab on the portal (`index.php?opcao=opt_NN`)
//! linking to its downloadable file. File names and link text drift between
//! releases and mix encodings, so matching is done on accent-folded, lower-cased
//! text. When several anchors qualify the first one in document order wins.

use common::{DatasetKind, IngestError, Result};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::{fetch_cancellable, Fetcher};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static anchor selector"));

const CSV_MARKER: &str = ".csv";

/// How a kind recognises its download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRule {
    /// Target must contain `.csv` and any of the markers.
    Markers(&'static [&'static str]),
    /// Target must contain this exact file name.
    FileName(&'static str),
}

impl AnchorRule {
    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Production => AnchorRule::Markers(&["producao"]),
            DatasetKind::Commercialization => AnchorRule::Markers(&["comercio", "comercializacao"]),
            DatasetKind::Processing => AnchorRule::Markers(&["processa"]),
            DatasetKind::Import => AnchorRule::FileName("ImpVinhos.csv"),
            DatasetKind::Export => AnchorRule::FileName("expvinho.csv"),
        }
    }

    fn matches(&self, href: &str) -> bool {
        let target = fold_text(href);
        match self {
            AnchorRule::Markers(markers) => {
                target.contains(CSV_MARKER) && markers.iter().any(|m| target.contains(m))
            }
            AnchorRule::FileName(name) => target.contains(&fold_text(name)),
        }
    }

    fn describe(&self) -> String {
        match self {
            AnchorRule::Markers(markers) => format!("a .csv link containing one of {:?}", markers),
            AnchorRule::FileName(name) => format!("a link to {}", name),
        }
    }
}

/// A link scraped from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// The file a kind should be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub label: String,
    pub url: Url,
}

/// Folds accents to ASCII and lower-cases, so `Produção` and `PRODUCAO` compare equal.
pub fn fold_text(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Every `<a href>` in document order.
pub fn parse_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(Anchor {
                href: href.to_string(),
                text: element.text().collect::<String>().trim().to_string(),
            })
        })
        .collect()
}

/// First anchor accepted by the kind's rule.
pub fn select_anchor(kind: DatasetKind, anchors: &[Anchor]) -> Option<&Anchor> {
    let rule = AnchorRule::for_kind(kind);
    anchors.iter().find(|a| rule.matches(&a.href))
}

/// The portal serves a mix of UTF-8 and Latin-1 pages.
fn page_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::mem::decode_latin1(bytes).into_owned(),
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    base_url: Url,
}

impl Catalog {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn listing_url(&self, kind: DatasetKind) -> Result<Url> {
        self.base_url
            .join(&format!("index.php?opcao={}", kind.listing_option()))
            .map_err(|e| IngestError::network(self.base_url.as_str(), e))
    }

    /// Picks the download for `kind` from an already fetched listing page.
    pub fn resolve_from_page(&self, kind: DatasetKind, html: &str) -> Result<RemoteFile> {
        let anchors = parse_anchors(html);
        debug!(%kind, anchors = anchors.len(), "scanned listing page");

        let rule = AnchorRule::for_kind(kind);
        let anchor = select_anchor(kind, &anchors).ok_or_else(|| {
            IngestError::NotFound(format!(
                "no {} on the {} listing page ({} links scanned)",
                rule.describe(),
                kind,
                anchors.len()
            ))
        })?;

        let url = self
            .base_url
            .join(&anchor.href)
            .map_err(|e| IngestError::NotFound(format!("unusable link '{}': {}", anchor.href, e)))?;

        Ok(RemoteFile {
            label: anchor.text.clone(),
            url,
        })
    }

    /// Fetches the kind's listing page and resolves its download link.
    pub async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        kind: DatasetKind,
        cancel: &CancellationToken,
    ) -> Result<RemoteFile> {
        let listing = self.listing_url(kind)?;
        let bytes = fetch_cancellable(fetcher, &listing, cancel).await?;
        if bytes.is_empty() {
            warn!(%kind, url = %listing, "listing page is empty");
            return Err(IngestError::network(listing.as_str(), "empty listing page"));
        }

        let remote = self.resolve_from_page(kind, &page_text(&bytes))?;
        info!(%kind, label = %remote.label, url = %remote.url, "resolved remote file");
        Ok(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(Url::parse("http://portal.test/").unwrap())
    }

    // -------------------------------------------------------------------------
    // TEXT FOLDING
    // -------------------------------------------------------------------------

    #[test]
    fn test_fold_text_strips_accents_and_case() {
        assert_eq!(fold_text("Produção"), "producao");
        assert_eq!(fold_text("COMERCIALIZAÇÃO"), "comercializacao");
        assert_eq!(fold_text("ImpVinhos.csv"), "impvinhos.csv");
    }

    // -------------------------------------------------------------------------
    // ANCHOR SELECTION
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_anchors_skips_links_without_href() {
        let html = r#"<a name="top">x</a><a href="download/Producao.csv"> DOWNLOAD </a>"#;
        let anchors = parse_anchors(html);
        assert_eq!(
            anchors,
            vec![Anchor {
                href: "download/Producao.csv".into(),
                text: "DOWNLOAD".into()
            }]
        );
    }

    #[test]
    fn test_first_matching_anchor_wins() {
        let html = r#"
            <a href="index.php?opcao=opt_02">Produção</a>
            <a href="download/Producao.csv">Produção 1970-2023</a>
            <a href="download/ProducaoOld.csv">Produção antiga</a>
        "#;
        let remote = catalog().resolve_from_page(DatasetKind::Production, html).unwrap();
        assert_eq!(remote.url.as_str(), "http://portal.test/download/Producao.csv");
        assert_eq!(remote.label, "Produção 1970-2023");
    }

    #[test]
    fn test_marker_without_csv_is_ignored() {
        let html = r#"<a href="download/producao.pdf">PDF</a>"#;
        let err = catalog()
            .resolve_from_page(DatasetKind::Production, html)
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_commercialization_accepts_either_marker() {
        let html = r#"<a href="download/Comercio.csv">Comércio</a>"#;
        let remote = catalog()
            .resolve_from_page(DatasetKind::Commercialization, html)
            .unwrap();
        assert!(remote.url.as_str().ends_with("Comercio.csv"));
    }

    #[test]
    fn test_processing_marker_matches_prefix() {
        let html = r#"<a href="download/ProcessaViniferas.csv">Viníferas</a>"#;
        let remote = catalog()
            .resolve_from_page(DatasetKind::Processing, html)
            .unwrap();
        assert_eq!(remote.label, "Viníferas");
    }

    #[test]
    fn test_export_finds_named_file() {
        let html = r#"
            <a href="download/ImpVinhos.csv">Importação</a>
            <a href="download/ExpVinho.csv">Exportação de vinhos</a>
        "#;
        let remote = catalog().resolve_from_page(DatasetKind::Export, html).unwrap();
        assert_eq!(remote.url.as_str(), "http://portal.test/download/ExpVinho.csv");
    }

    #[test]
    fn test_export_missing_file_is_not_found() {
        let html = r#"<a href="download/ExpEspumantes.csv">Espumantes</a>"#;
        let err = catalog().resolve_from_page(DatasetKind::Export, html).unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_page_without_anchors_is_not_found() {
        let err = catalog()
            .resolve_from_page(DatasetKind::Import, "<html><body>manutenção</body></html>")
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn test_absolute_href_is_kept() {
        let html = r#"<a href="https://mirror.test/files/ImpVinhos.csv">mirror</a>"#;
        let remote = catalog().resolve_from_page(DatasetKind::Import, html).unwrap();
        assert_eq!(remote.url.as_str(), "https://mirror.test/files/ImpVinhos.csv");
    }

    #[test]
    fn test_listing_url() {
        let url = catalog().listing_url(DatasetKind::Processing).unwrap();
        assert_eq!(url.as_str(), "http://portal.test/index.php?opcao=opt_03");
    }

    #[test]
    fn test_latin1_page_text() {
        assert_eq!(page_text(b"Produ\xe7\xe3o"), "Produção");
        assert_eq!(page_text("Produção".as_bytes()), "Produção");
    }
}
