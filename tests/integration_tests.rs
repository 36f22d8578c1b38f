use std::path::Path;

use haskell_debugger::diagnostics::{
    parse_build_output, BatchStatus, DiagnosticsEngine, DocumentStore, Severity,
};
use haskell_debugger::parser;
use haskell_debugger::simulator::{parse_utxo_json, select_best_utxo, SimulatorError, Utxo};

#[cfg(test)]
mod extractor_tests {
    use super::*;

    #[test]
    fn test_extracts_definitions_in_order() {
        let source = "\
module Demo where

inc x = x + 1
process (Just v) acc = start
  more cont
main = inc 1
";

        let functions = parser::extract_functions(source);

        assert_eq!(functions.len(), 3, "Should find 3 definitions");
        assert_eq!(functions[0].name, "inc");
        assert_eq!(functions[1].name, "process");
        assert_eq!(functions[2].name, "main");
    }

    #[test]
    fn test_parenthesized_args_stay_one_token() {
        let source = "process (Just v) acc = go v acc\n";
        let functions = parser::extract_functions(source);

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].args, vec!["(Just v)", "acc"]);
    }

    #[test]
    fn test_body_collects_indented_continuations() {
        let source = "\
run x = first x
    second x
    third

next = 0
";
        let functions = parser::extract_functions(source);

        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].body, vec!["first x", "second x", "third"]);
        assert_eq!(functions[1].body, vec!["0"]);
    }

    #[test]
    fn test_keyword_lines_are_skipped() {
        let source = "\
data Color = Red | Blue
type Name = String
import Data.List
double x = x * 2
";
        let functions = parser::extract_functions(source);

        assert_eq!(functions.len(), 1, "Only the value definition counts");
        assert_eq!(functions[0].name, "double");
    }

    #[test]
    fn test_zero_argument_definition() {
        let functions = parser::extract_functions("answer = 42\n");

        assert_eq!(functions.len(), 1);
        assert!(functions[0].args.is_empty());
        assert_eq!(functions[0].body, vec!["42"]);
    }

    #[test]
    fn test_argument_splitting_depth() {
        let args = parser::extract_arguments("(Left (a, b)) x y");
        assert_eq!(args, vec!["(Left (a, b))", "x", "y"]);
    }
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    #[test]
    fn test_word_splitting_respects_strings_and_parens() {
        let words = parser::extract_words("func \"str lit\" (nested (p)) arg");

        assert!(words.contains(&"func".to_string()));
        assert!(words.contains(&"arg".to_string()));
        assert!(words.contains(&"\"str lit\"".to_string()));
        assert!(words.contains(&"(nested (p))".to_string()));
    }

    #[test]
    fn test_operator_tokens_are_dropped() {
        let words = parser::extract_words("f . g -> h = x");

        assert!(!words.contains(&".".to_string()));
        assert!(!words.contains(&"->".to_string()));
        assert!(!words.contains(&"=".to_string()));
        assert!(words.contains(&"f".to_string()));
    }

    #[test]
    fn test_splice_region_is_extracted() {
        let words = parser::extract_words("compile [|| validator ctx ||]");

        assert_eq!(words, vec!["validator", "ctx"]);
    }

    #[test]
    fn test_find_definition_line_is_one_based() {
        let source = "-- comment\nfoo :: Int\nfoo = 1\nbar = foo\n";

        assert_eq!(parser::find_function_definition_line(source, "foo"), 3);
        assert_eq!(parser::find_function_definition_line(source, "bar"), 4);
        assert_eq!(parser::find_function_definition_line(source, "missing"), 0);

        // Idempotent over unchanged text.
        assert_eq!(parser::find_function_definition_line(source, "foo"), 3);
    }

    #[test]
    fn test_caller_name() {
        assert_eq!(parser::caller_name("main = double 5"), "double");
        assert_eq!(parser::caller_name("no definition here"), "<unknown>");
    }

    #[test]
    fn test_module_name() {
        let source = "{-# LANGUAGE OverloadedStrings #-}\nmodule Data.Demo (run) where\n";
        assert_eq!(parser::module_name(source), Some("Data.Demo".to_string()));

        assert_eq!(parser::module_name("main = pure ()\n"), None);
    }
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    fn engine() -> DiagnosticsEngine {
        DiagnosticsEngine::new("/ws")
    }

    #[test]
    fn test_batch_with_two_headers() {
        let mut engine = engine();

        let status = engine.process_chunk(
            "src/Lib.hs:10:1: error: MyError\n   | ctx\nsrc/Lib.hs:12:1: warning: Next\n",
        );

        assert_eq!(status, BatchStatus::Diagnostics);

        let diags = &engine.diagnostics()[Path::new("/ws/src/Lib.hs")];
        assert_eq!(diags.len(), 2);

        assert_eq!(diags[0].line, 9);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].message, "MyError", "gutter line must be stripped");

        assert_eq!(diags[1].line, 11);
        assert_eq!(diags[1].severity, Severity::Warning);
        assert_eq!(diags[1].message, "Next");
    }

    #[test]
    fn test_partial_line_carries_over_chunks() {
        let mut engine = engine();

        let status = engine.process_chunk("src/Lib.hs:10:1: err");
        assert_eq!(status, BatchStatus::Quiet, "half a header is not a batch");

        let status = engine.process_chunk("or: Boom\n\n");
        assert_eq!(status, BatchStatus::Diagnostics);

        let diags = &engine.diagnostics()[Path::new("/ws/src/Lib.hs")];
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Boom");
    }

    #[test]
    fn test_all_good_clears_everything() {
        let mut engine = engine();

        engine.process_chunk("src/Lib.hs:3:1: error: Boom\n\n");
        assert!(!engine.diagnostics().is_empty());

        let status = engine.process_chunk("All good (1 module, at 10:00:00)\n");
        assert_eq!(status, BatchStatus::AllGood);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_batches_replace_not_merge() {
        let mut engine = engine();

        engine.process_chunk("src/A.hs:1:1: error: First\n\n");
        engine.process_chunk("src/B.hs:1:1: error: Second\n\n");

        assert!(
            !engine.diagnostics().contains_key(Path::new("/ws/src/A.hs")),
            "diagnostics from earlier batches must disappear"
        );
        assert!(engine.diagnostics().contains_key(Path::new("/ws/src/B.hs")));
    }

    #[test]
    fn test_import_lines_get_wide_range() {
        let mut engine = engine();
        engine
            .documents_mut()
            .insert("/ws/src/Lib.hs", "import Data.Missing (gone)\nmain = ()\n");

        engine.process_chunk("src/Lib.hs:1:8: error: Could not find module\n\n");

        let diag = &engine.diagnostics()[Path::new("/ws/src/Lib.hs")][0];
        assert_eq!(diag.col_start, 0);
        assert_eq!(diag.col_end, "import Data.Missing (gone)".len());
        assert!(diag.message.starts_with("Import error: "));
    }

    #[test]
    fn test_range_extends_to_next_whitespace() {
        let mut engine = engine();
        engine
            .documents_mut()
            .insert("/ws/src/Lib.hs", "main = undefined more\n");

        engine.process_chunk("src/Lib.hs:1:8: error: Boom\n\n");

        let diag = &engine.diagnostics()[Path::new("/ws/src/Lib.hs")][0];
        assert_eq!(diag.col_start, 7);
        assert_eq!(diag.col_end, "main = undefined".len());
    }

    #[test]
    fn test_unknown_document_falls_back_to_single_char() {
        let mut engine = engine();

        engine.process_chunk("src/Other.hs:4:6: warning: Shadow\n\n");

        let diag = &engine.diagnostics()[Path::new("/ws/src/Other.hs")][0];
        assert_eq!(diag.col_start, 5);
        assert_eq!(diag.col_end, 6);
    }

    #[test]
    fn test_standalone_parser_needs_documents() {
        let output = "\
src/Main.hs:10:5: error:
    Variable not in scope: x
    In the expression: x + 1
src/Ghost.hs:1:1: error:
    Nobody has this file open
";

        let mut docs = DocumentStore::new();
        let body = format!("{}    x + 1", "\n".repeat(9));
        docs.insert("/ws/src/Main.hs", body);

        let parse = parse_build_output(output, Path::new("/ws"), &docs);

        assert_eq!(parse.diagnostics.len(), 1, "undocumented files are dropped");

        let diags = &parse.diagnostics[Path::new("/ws/src/Main.hs")];
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Variable not in scope: x"));
        assert_eq!(diags[0].col_start, 4);
        assert_eq!(diags[0].col_end, 5);

        let first = parse.first_error.expect("an error should be flagged");
        assert_eq!(first.path, Path::new("/ws/src/Main.hs"));
        assert_eq!(first.line, 9);
    }
}

#[cfg(test)]
mod simulator_tests {
    use super::*;

    #[test]
    fn test_select_best_utxo_takes_largest() {
        let utxos = vec![
            Utxo {
                tx_hash: "abc".to_string(),
                index: 0,
                lovelace: 1000,
            },
            Utxo {
                tx_hash: "def".to_string(),
                index: 1,
                lovelace: 5_000_000,
            },
            Utxo {
                tx_hash: "ghi".to_string(),
                index: 2,
                lovelace: 2000,
            },
        ];

        let best = select_best_utxo(&utxos).expect("non-empty set");
        assert_eq!(best, &utxos[1]);
    }

    #[test]
    fn test_select_best_utxo_rejects_empty() {
        let err = select_best_utxo(&[]).unwrap_err();
        assert!(matches!(err, SimulatorError::NoSpendableUtxos));
        assert!(err.to_string().contains("No spendable UTxOs"));
    }

    #[test]
    fn test_parse_utxo_json_skips_reference_scripts() {
        let json = r#"{
            "tx1#0": { "value": { "lovelace": 1000000 }, "referenceScript": null },
            "tx2#1": { "value": { "lovelace": 5000000 }, "referenceScript": null },
            "txWithRef#0": { "value": { "lovelace": 2000000 }, "referenceScript": {} }
        }"#;

        let utxos = parse_utxo_json(json).expect("valid JSON");

        assert_eq!(utxos.len(), 2);
        assert!(utxos.contains(&Utxo {
            tx_hash: "tx1".to_string(),
            index: 0,
            lovelace: 1_000_000,
        }));
        assert!(utxos.contains(&Utxo {
            tx_hash: "tx2".to_string(),
            index: 1,
            lovelace: 5_000_000,
        }));
    }

    #[test]
    fn test_parse_utxo_json_skips_zero_lovelace() {
        let json = r#"{
            "tx1#0": { "value": { "lovelace": 0 }, "referenceScript": null },
            "tx2#0": { "value": {}, "referenceScript": null }
        }"#;

        let utxos = parse_utxo_json(json).expect("valid JSON");
        assert!(utxos.is_empty());
    }
}
