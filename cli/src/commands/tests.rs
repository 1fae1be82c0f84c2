use std::sync::Arc;

use super::*;
use recipe_core::ocr::TesseractRecognizer;
use recipe_core::{Config, Label, Settings};

const CARD: &str = "Pancakes\n2 cups flour\n1 tsp salt\nStep 1: Mix the dry ingredients\nThen fry";

/// Create a test AppState with a temporary data directory
fn create_test_state(temp_dir: &Path) -> recipe_core::AppState {
    let data_dir = temp_dir.join("data");
    let config = Config {
        settings_file: data_dir.join("settings.json"),
        data_dir,
    };
    recipe_core::AppState::new(config).unwrap()
}

/// Importer whose OCR always fails; text files never reach it
fn create_test_importer(state: &recipe_core::AppState) -> Importer {
    let recognizer = Arc::new(TesseractRecognizer::with_program("/nonexistent/tesseract", "eng"));
    state.importer(recognizer, None)
}

fn write_png(path: &Path) {
    image::RgbImage::new(4, 4).save(path).unwrap();
}

// ============================================================================
// Segment / Classify Command Tests
// ============================================================================

#[tokio::test]
async fn test_segment_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("recipe.txt");
    std::fs::write(&path, CARD).unwrap();

    let segmented = segment(&path).await.unwrap();
    assert_eq!(segmented.ingredients, vec!["2 cups flour", "1 tsp salt"]);
    assert_eq!(
        segmented.instructions,
        vec!["Step 1: Mix the dry ingredients", "Then fry"]
    );
}

#[tokio::test]
async fn test_segment_missing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    assert!(segment(&temp_dir.path().join("missing.txt")).await.is_err());
}

#[tokio::test]
async fn test_classify_command_uses_heuristics_by_default() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let path = temp_dir.path().join("recipe.txt");
    std::fs::write(&path, CARD).unwrap();

    let lines = classify(&importer, &path, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0].label, Label::Unknown);
    assert_eq!(lines[1].label, Label::Ingredient);
    assert_eq!(lines[4].label, Label::Instruction);
}

#[tokio::test]
async fn test_classify_unreachable_backend_falls_back() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut state = create_test_state(temp_dir.path());
    state.settings = Settings {
        backend: recipe_core::BackendConfig::Remote {
            endpoint: "http://127.0.0.1:1".to_string(),
        },
        ..Settings::default()
    };
    let importer = create_test_importer(&state);

    let path = temp_dir.path().join("recipe.txt");
    std::fs::write(&path, CARD).unwrap();

    let lines = classify(&importer, &path, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(lines[1].label, Label::Ingredient);
}

// ============================================================================
// Import Command Tests
// ============================================================================

#[tokio::test]
async fn test_import_text_with_cover() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let text = temp_dir.path().join("recipe.txt");
    std::fs::write(&text, CARD).unwrap();
    let cover = temp_dir.path().join("cover.png");
    write_png(&cover);

    let options = ImportOptions {
        files: vec![text],
        category: Some("Breakfast".to_string()),
        cover: Some(cover),
    };
    let reports = import(&importer, options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(reports[0].error.is_none());
    assert_eq!(reports[0].recipes.len(), 1);
    assert_eq!(state.store.list_categories().await.unwrap(), vec!["Breakfast"]);
}

#[tokio::test]
async fn test_import_reports_each_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let text = temp_dir.path().join("recipe.txt");
    std::fs::write(&text, CARD).unwrap();
    let unsupported = temp_dir.path().join("recipe.docx");
    std::fs::write(&unsupported, "whatever").unwrap();

    let options = ImportOptions {
        files: vec![unsupported, text],
        ..ImportOptions::default()
    };
    let reports = import(&importer, options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(matches!(
        reports[0].error,
        Some(CommandError::UnsupportedFile { .. })
    ));
    // No cover for the text file
    assert!(matches!(
        reports[1].error,
        Some(CommandError::MissingImage { .. })
    ));
    assert!(state.store.list_categories().await.unwrap().is_empty());

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["error"]["code"], "unsupported_file");
}

#[tokio::test]
async fn test_import_image_without_ocr_recognizes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let card = temp_dir.path().join("card.png");
    write_png(&card);

    let options = ImportOptions {
        files: vec![card],
        ..ImportOptions::default()
    };
    let reports = import(&importer, options, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(
        reports[0].error,
        Some(CommandError::NothingRecognized { .. })
    ));
}

#[tokio::test]
async fn test_import_bad_cover_fails_command() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let options = ImportOptions {
        files: vec![temp_dir.path().join("recipe.txt")],
        category: None,
        cover: Some(temp_dir.path().join("missing.png")),
    };
    assert!(import(&importer, options, &CancellationToken::new())
        .await
        .is_err());
}

#[tokio::test]
async fn test_import_cancelled_before_start() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state = create_test_state(temp_dir.path());
    let importer = create_test_importer(&state);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let options = ImportOptions {
        files: vec![temp_dir.path().join("recipe.txt")],
        ..ImportOptions::default()
    };
    let reports = import(&importer, options, &cancel).await.unwrap();
    assert!(reports.is_empty());
}
