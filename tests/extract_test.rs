//! End-to-end extraction tests against synthesized PDF documents.

use lopdf::dictionary;
use untable::storage::{FsBlobStore, MemoryRecordStore};
use untable::{
    detect_format_from_bytes, extract_tables, Error, ExtractionOutcome, ExtractionPipeline,
    PdfSource, UploadedDocument,
};

/// Build a one-page PDF whose content stream positions text with `Tm`,
/// forming the given rows as columns at fixed X positions.
fn pdf_with_table(rows: &[&[&str]]) -> Vec<u8> {
    let column_x = [100.0, 300.0, 450.0];
    let mut ops = String::from("BT /F1 12 Tf\n");
    let mut y = 700.0;
    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            ops.push_str(&format!(
                "1 0 0 1 {} {} Tm ({}) Tj\n",
                column_x[col], y, cell
            ));
        }
        y -= 20.0;
    }
    ops.push_str("ET");

    build_pdf(ops.as_bytes())
}

fn build_pdf(content: &[u8]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(lopdf::Object::Stream(lopdf::Stream::new(
        dictionary! {},
        content.to_vec(),
    )));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        },
    });
    doc.objects.insert(
        pages_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_detect_format_of_synthesized_pdf() {
    let data = pdf_with_table(&[&["A", "B"], &["1", "2"]]);
    let format = detect_format_from_bytes(&data).unwrap();
    assert_eq!(format.version, "1.5");
}

#[test]
fn test_source_loads_and_counts_pages() {
    let data = pdf_with_table(&[&["A", "B"], &["1", "2"]]);
    let source = PdfSource::from_bytes(&data).unwrap();
    assert_eq!(source.page_count(), 1);
}

#[test]
fn test_extract_tables_from_aligned_text() {
    let data = pdf_with_table(&[
        &["Name", "Age"],
        &["Alice", "30"],
        &["Bob", "25"],
        &["Carol", "41"],
    ]);

    let tables = extract_tables(&data).unwrap();
    assert_eq!(tables.len(), 1);

    let table = &tables[0];
    assert_eq!(table.header, vec!["Name", "Age"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows[0], vec!["Alice", "30"]);
    assert_eq!(table.rows[2], vec!["Carol", "41"]);
}

#[test]
fn test_extract_tables_three_columns() {
    let data = pdf_with_table(&[
        &["City", "Country", "Population"],
        &["Oslo", "Norway", "700000"],
        &["Lyon", "France", "520000"],
    ]);

    let tables = extract_tables(&data).unwrap();
    assert_eq!(tables[0].header, vec!["City", "Country", "Population"]);
    assert_eq!(tables[0].column_count(), 3);
}

#[test]
fn test_prose_only_pdf_finds_nothing() {
    let data = build_pdf(
        b"BT /F1 12 Tf 1 0 0 1 72 700 Tm (A single running line of prose.) Tj ET",
    );
    let err = extract_tables(&data).unwrap_err();
    assert!(matches!(err, Error::NoTablesFound));
}

#[test]
fn test_not_a_pdf_is_rejected() {
    let err = extract_tables(b"just some text").unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn test_pipeline_end_to_end_with_fs_store() {
    let dir = tempfile::tempdir().unwrap();
    let records = MemoryRecordStore::new();
    let blobs = FsBlobStore::new(dir.path());
    let pipeline = ExtractionPipeline::new(&records, &blobs);

    let data = pdf_with_table(&[&["Item", "Qty"], &["Bolt", "40"], &["Nut", "35"]]);
    let doc = UploadedDocument::new(data, "inventory.pdf");

    let outcome = pipeline.process(&doc).unwrap();
    let ExtractionOutcome::Success { hash, artifact, .. } = outcome else {
        panic!("expected success");
    };

    let path = dir.path().join(artifact.as_str());
    assert!(path.exists());
    let csv = std::fs::read_to_string(path).unwrap();
    assert_eq!(csv, "Item,Qty\nBolt,40\nNut,35\n");
    assert_eq!(artifact.as_str(), format!("csv/{}.csv", hash));
}
