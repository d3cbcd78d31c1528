//! Deck rendering end to end.
//!
//! Tests that rasterise a page need a pdfium library (see `PDFIUM_LIB_PATH`)
//! and print `SKIP` when none can be bound. The others run anywhere.

mod common;

use common::PdfBuilder;
use paperdeck::pdf::bind_pdfium;
use paperdeck::pdf::preview::{render_first_page, PREVIEW_FILE};
use paperdeck::{render_deck, DeckConfig, DeckError, PaperRecord, Summary};
use std::path::Path;

macro_rules! require_pdfium {
    () => {
        match bind_pdfium() {
            Ok(pdfium) => pdfium,
            Err(e) => {
                eprintln!("SKIP: {e}");
                return;
            }
        }
    };
}

fn test_record() -> PaperRecord {
    let mut record = PaperRecord::new("Test", "2023", "1");
    record.summary = Summary {
        title_jp: Some("テスト".into()),
        keywords: Some("ml".into()),
        problem: Some("P".into()),
        method: Some("M".into()),
        result: Some("R".into()),
    };
    record
}

fn deck_config(records: &Path, output: &Path, keywords: &[&str]) -> DeckConfig {
    DeckConfig::builder()
        .records_dir(records)
        .output(output)
        .keywords(keywords.iter().copied())
        .build()
        .unwrap()
}

#[test]
fn non_matching_records_are_left_out() {
    let tmp = tempfile::tempdir().unwrap();
    let records = tmp.path().join("papers");
    let paper = records.join("2401.00001v1");
    PaperRecord::new("Graph neural networks for traffic", "2024", "2401.00001v1")
        .save(&paper)
        .unwrap();
    let output = tmp.path().join("deck.md");

    // no PDF on disk: a match would fail, so success proves the record was skipped
    let stats = render_deck(&deck_config(&records, &output, &["quantum"])).unwrap();

    assert_eq!(stats.records_found, 1);
    assert_eq!(stats.records_included, 0);
    assert_eq!(stats.image_slides, 0);
    let deck = std::fs::read_to_string(&output).unwrap();
    assert!(deck.starts_with("---\nmarp: true\n"));
    assert!(deck.contains("# quantum on arXiv"));
    assert!(!deck.contains("_class: title"));
}

#[test]
fn matching_record_without_pdf_aborts() {
    let tmp = tempfile::tempdir().unwrap();
    let records = tmp.path().join("papers");
    test_record().save(&records.join("1")).unwrap();
    let output = tmp.path().join("deck.md");

    let err = render_deck(&deck_config(&records, &output, &["TEST"])).unwrap_err();

    assert!(matches!(err, DeckError::PdfNotFound { .. }), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn missing_records_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let err = render_deck(&deck_config(
        &tmp.path().join("nope"),
        &tmp.path().join("deck.md"),
        &[],
    ))
    .unwrap_err();
    assert!(matches!(err, DeckError::RecordsDirNotFound { .. }), "{err:?}");
}

#[test]
fn malformed_record_aborts() {
    let tmp = tempfile::tempdir().unwrap();
    let records = tmp.path().join("papers");
    std::fs::create_dir_all(records.join("broken")).unwrap();
    std::fs::write(records.join("broken/paper.json"), "{ not json").unwrap();

    let err = render_deck(&deck_config(&records, &tmp.path().join("deck.md"), &[])).unwrap_err();
    assert!(matches!(err, DeckError::RecordParse { .. }), "{err:?}");
}

/// One test for everything pdfium touches, so two bindings never live at once.
#[test]
fn preview_and_single_paper_deck() {
    let tmp = tempfile::tempdir().unwrap();
    let records = tmp.path().join("papers");
    let paper = records.join("1");
    test_record().save(&paper).unwrap();

    // one 300x300 image: too small on both sides, so no figure slides
    let pdf_path = paper.join("paper.pdf");
    let mut pdf = PdfBuilder::new();
    let logo = pdf.noisy_image(300, 300);
    pdf.page(&[logo]);
    pdf.save(&pdf_path);

    {
        let pdfium = require_pdfium!();
        let page = render_first_page(&pdfium, &pdf_path, 2.0).unwrap();
        assert_eq!((page.width(), page.height()), (1224, 1584));

        let band = paperdeck::crop_top_band(&page);
        assert_eq!((band.width(), band.height()), (1224, 792));
    }

    let output = tmp.path().join("deck.md");
    let stats = render_deck(&deck_config(&records, &output, &[])).unwrap();

    assert_eq!(stats.records_included, 1);
    assert_eq!(stats.image_slides, 0);
    assert!(paper.join(PREVIEW_FILE).exists());

    let deck = std::fs::read_to_string(&output).unwrap();
    assert!(deck.contains("# Papers on arXiv\nautomatically generated by paperdeck\n"));
    assert!(deck.contains("<!-- _class: title -->\n# テスト\nTest\n[2023] ml 1\n"));
    assert!(deck.contains("__課題__ P\n__手法__ M\n__結果__ R\n"));
    assert!(deck.contains(&format!("![width:1400]({}/{})", paper.display(), PREVIEW_FILE)));
    assert_eq!(deck.matches("![width:").count(), 1);
}
