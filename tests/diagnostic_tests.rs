//! Error classification and diagnostic rendering.

mod common;

use arbor::builder::{make_finish_node, Builder};
use arbor::list::ListBuilder;
use arbor::node::{Initargs, Kind, Relation, Span};
use arbor::{err_ctx, err_msg, BuilderError, ErrorType};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};

fn render(err: &BuilderError) -> String {
    let mut out = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .with_width(200)
        .render_report(&mut out, err)
        .unwrap();
    out
}

/// A second `one` right node on a literal that spans `[4, 5)` of `1 + 2 3`.
fn second_operand_error() -> BuilderError {
    let mut builder = ListBuilder::new();
    let rel = Relation::one("operand");
    let leaf = make_finish_node(&mut builder, "literal", Initargs::new().with("value", 3)).unwrap();
    let left = builder.make_node(&Kind::from("negate"), Initargs::new()).unwrap();
    let left = builder.relate(&rel, left, leaf.clone(), Initargs::new()).unwrap();
    builder
        .relate(&rel, left, leaf, Initargs::new().with_bounds(Span::new(6, 7)))
        .unwrap_err()
}

#[cfg(test)]
mod classification_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn macros_build_the_named_variant() {
        let err: BuilderError = err_msg!(DuplicateKey, "key {} repeated", "x");
        assert_eq!(err.error_type(), ErrorType::DuplicateKey);
        assert_eq!(err.message(), "key x repeated");
        assert_eq!(err.to_string(), "Duplicate key: key x repeated");
        assert_eq!(err.span(), None);

        let err: BuilderError = err_ctx!(KindMismatch, "wrong kind", Some(Span::new(1, 2)), "finish with the made kind");
        assert_eq!(err.error_type(), ErrorType::KindMismatch);
        assert_eq!(err.span(), Some(Span::new(1, 2)));
        assert_eq!(
            err.help().map(|h| h.to_string()).as_deref(),
            Some("finish with the made kind")
        );
    }

    #[test]
    fn error_codes_name_the_classification() {
        let err: BuilderError = err_msg!(UnknownNode, "gone");
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("arbor::UnknownNode"));
        assert_eq!(ErrorType::Visit.to_string(), "Visit");
    }

    #[test]
    fn builder_errors_carry_node_bounds() {
        let err = second_operand_error();
        assert_eq!(err.error_type(), ErrorType::Cardinality);
        assert_eq!(err.span(), Some(Span::new(6, 7)));
        assert!(err.help().is_some());
    }

    #[test]
    fn config_errors_keep_their_cause() {
        let err = arbor::schema::Schema::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(std::error::Error::source(&err).is_some());
    }
}

#[cfg(test)]
mod rendering_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labels_need_source_text() {
        let err = second_operand_error();
        assert!(err.labels().is_none());
        let err = err.with_source("input", "-1 + 2 3");
        let labels: Vec<_> = err.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 6);
        assert_eq!(labels[0].len(), 1);
    }

    #[test]
    fn report_shows_code_message_and_snippet() {
        let err = second_operand_error().with_source("input", "-1 + 2 3");
        let report = render(&err);
        assert!(report.contains("arbor::Cardinality"), "{}", report);
        assert!(report.contains("already has a right node"), "{}", report);
        assert!(report.contains("-1 + 2 3"), "{}", report);
    }

    #[test]
    fn empty_spans_still_label_one_column() {
        let err: BuilderError = err_ctx!(InvalidState, "cut short", Some(Span::new(3, 3)));
        let err = err.with_source("input", "abcdef");
        let label = err.labels().unwrap().next().unwrap();
        assert_eq!((label.offset(), label.len()), (3, 1));
    }
}
