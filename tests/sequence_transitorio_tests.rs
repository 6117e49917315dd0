use std::collections::HashSet;

use reglamento_articles::{
    append_transitorios, classify_transitorio_token, segment_articles, segment_transitorios, sequence_articles,
    ArticleNumber, ExtractConfig, NumberError, Ordinal, TransitorioToken,
};

#[test]
fn article_number_parsing() {
    assert_eq!("14".parse::<ArticleNumber>(), Ok(ArticleNumber { base: 14, ordinal: Ordinal::None }));
    assert_eq!("14 bis".parse::<ArticleNumber>(), Ok(ArticleNumber { base: 14, ordinal: Ordinal::Bis }));
    assert_eq!("14BIS".parse::<ArticleNumber>(), Ok(ArticleNumber { base: 14, ordinal: Ordinal::Bis }));
    assert_eq!("14 ter".parse::<ArticleNumber>(), Ok(ArticleNumber { base: 14, ordinal: Ordinal::Ter }));
    assert!(matches!("bis".parse::<ArticleNumber>(), Err(NumberError::MissingBase(_))));
    assert!(matches!("14 quater".parse::<ArticleNumber>(), Err(NumberError::UnknownOrdinal(_))));
    assert_eq!(Ordinal::Ter.rank(), 2);
}

#[test]
fn sorted_numerically_with_ordinals_and_dense_index() {
    let text = "\
ARTÍCULO 10. Décimo.\nTexto del décimo artículo.
ARTÍCULO 2 ter. Segundo ter.\nTexto del segundo ter.
ARTÍCULO 2. Segundo.\nTexto del segundo artículo.
ARTÍCULO 1. Primero.\nTexto del primer artículo.
ARTÍCULO 2 bis. Segundo bis.\nTexto del segundo bis.";
    let (arts, _) = segment_articles(text, &ExtractConfig::default());
    let records = sequence_articles(arts);

    let numbers: Vec<&str> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers, vec!["1", "2", "2 bis", "2 ter", "10"]);
    let idx: Vec<usize> = records.iter().map(|r| r.sequence_index).collect();
    assert_eq!(idx, vec![1, 2, 3, 4, 5]);
}

#[test]
fn transitorio_tokens_classified() {
    assert_eq!(classify_transitorio_token("IV"), TransitorioToken::Roman("IV".into()));
    assert_eq!(classify_transitorio_token("xii"), TransitorioToken::Roman("xii".into()));
    assert_eq!(classify_transitorio_token("ÚNICO"), TransitorioToken::Sole("ÚNICO".into()));
    assert_eq!(classify_transitorio_token("Unico"), TransitorioToken::Sole("Unico".into()));
    assert_eq!(classify_transitorio_token("IIII"), TransitorioToken::Unparseable("IIII".into()));
    assert_eq!(classify_transitorio_token("Il"), TransitorioToken::Unparseable("Il".into()));
}

#[test]
fn transitorios_segmented_in_order_and_truncated() {
    let text = "\
ARTÍCULO 40. Último.\nTexto del último artículo.
TRANSITORIOS
TRANSITORIO I.- Las solicitudes en trámite continúan.
12
TRANSITORIO II.- Se deroga el reglamento anterior.
NOTAS FINALES
Publicado en La Gaceta.
TRANSITORIO III
Sí.";
    let (provisions, stats) = segment_transitorios(text, &ExtractConfig::default());
    assert!(stats.section_found);
    assert_eq!(stats.headings, 3);
    assert_eq!(stats.short_skipped, 1);
    assert_eq!(provisions.len(), 2);
    assert_eq!(provisions[0].number, "T-I");
    assert_eq!(provisions[0].title, "Transitorio I");
    assert_eq!(provisions[0].body, "Las solicitudes en trámite continúan.");
    assert_eq!(provisions[1].number, "T-II");
    assert_eq!(provisions[1].body, "Se deroga el reglamento anterior.");
}

#[test]
fn unparseable_transitorio_surfaced_not_emitted() {
    let text = "TRANSITORIOS\nTRANSITORIO I. Primera disposición.\nTRANSITORIO Il. Lectura dudosa del OCR.\nTRANSITORIO III. Tercera disposición.";
    let (provisions, stats) = segment_transitorios(text, &ExtractConfig::default());
    let numbers: Vec<&str> = provisions.iter().map(|p| p.number.as_str()).collect();
    assert_eq!(numbers, vec!["T-I", "T-III"]);
    assert_eq!(provisions[0].body, "Primera disposición.");
    assert_eq!(stats.unparseable, vec!["Il".to_string()]);
}

#[test]
fn no_transitorio_section() {
    let (provisions, stats) = segment_transitorios("ARTÍCULO 1. Objeto.\nTexto.", &ExtractConfig::default());
    assert!(provisions.is_empty());
    assert!(!stats.section_found);
}

#[test]
fn transitorios_appended_after_sorted_articles() {
    let text = "\
ARTÍCULO 3. Tercero.\nTexto del tercer artículo.
ARTÍCULO 1. Primero.\nTexto del primer artículo.
TRANSITORIOS
TRANSITORIO II. Segunda transitoria aplicable.
TRANSITORIO I. Primera transitoria aplicable.";
    let cfg = ExtractConfig::default();
    let (arts, _) = segment_articles(text, &cfg);
    let mut records = sequence_articles(arts);
    let (provisions, _) = segment_transitorios(text, &cfg);
    append_transitorios(&mut records, provisions);

    let numbers: Vec<&str> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers, vec!["1", "3", "T-II", "T-I"]);

    let indices: HashSet<usize> = records.iter().map(|r| r.sequence_index).collect();
    assert_eq!(indices, (1..=records.len()).collect::<HashSet<_>>());
}

#[test]
fn prose_line_starting_with_transitorio_is_not_a_heading() {
    let text = "TRANSITORIOS\nTRANSITORIO I\nDurante el período\ntransitorio establecido en este reglamento, la Comisión seguirá funcionando.\nTRANSITORIO II. Se deroga el reglamento anterior.";
    let (provisions, stats) = segment_transitorios(text, &ExtractConfig::default());
    assert_eq!(stats.headings, 2);
    assert!(stats.unparseable.is_empty());
    assert_eq!(provisions[0].number, "T-I");
    assert_eq!(
        provisions[0].body,
        "Durante el período\ntransitorio establecido en este reglamento, la Comisión seguirá funcionando."
    );
    assert_eq!(provisions[1].number, "T-II");
}
