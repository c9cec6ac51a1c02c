//! Integration tests for renbuild
//!
//! These tests verify that the components work together correctly

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use renbuild::format::{IndentChange, IndentTracker};
use renbuild::rules::{compile_pattern, glob_to_regex, Anchor};
use renbuild::{BuildError, Config, Engine, ErrorCategory, LocatedError, Stats};

const MASTER: &str = "/game/story.rps";

fn build_with(config: Config, script: &str) -> (Engine, Result<Stats, LocatedError>) {
    let mut engine = Engine::in_memory(config).unwrap();
    let result = engine.run_reader(Path::new(MASTER), Cursor::new(script));
    (engine, result)
}

fn build(script: &str) -> Engine {
    let (engine, result) = build_with(Config::default(), script);
    result.unwrap_or_else(|e| panic!("build failed: {e}"));
    engine
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_label_with_narration() {
    let engine = build(":: start\n    Hello world\n");
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label start:\n    \"Hello world\"\n"
    );
    assert_eq!(
        engine.output("control.rpy").unwrap(),
        "label _control_:\n    call start\n    return\n"
    );
}

#[test]
fn test_line_rule_with_named_group() {
    let engine = build(":l Good {name} = Hello, {0}!\nGood Bob\n");
    assert_eq!(engine.output("story.rpy").unwrap(), "Hello, Bob!\n");
}

#[test]
fn test_nvl_block_then_plain_narration() {
    let engine = build(":: start\n    :nvl:\n        It was dark.\n    It was light.\n");
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label start:\n    NVL \"It was dark.\"\n    \"It was light.\"\n"
    );
}

// =============================================================================
// Flow control
// =============================================================================

#[test]
fn test_empty_label_has_no_control_entry() {
    let engine = build(":: empty\n:: full\n    Text\n:: trailing\n");
    assert_eq!(engine.control_calls(), ["full"]);
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label empty:\nlabel full:\n    \"Text\"\nlabel trailing:\n"
    );
}

#[test]
fn test_control_entries_in_label_order() {
    let engine = build(":: b\n    One\n:: a\n    Two\n    Three\n:: c\n    # plain comment\n");
    assert_eq!(engine.control_calls(), ["b", "a"]);
}

#[test]
fn test_local_label_uses_root_of_dotted_label() {
    let engine = build(":: ch1.intro\n    A\n:: .sub\n    B\n");
    assert_eq!(engine.control_calls(), ["ch1.intro", "ch1.sub"]);
    assert!(engine
        .output("control.rpy")
        .unwrap()
        .contains("    call ch1.sub\n"));
}

#[test]
fn test_tab_inside_narration_is_kept() {
    let engine = build(":: start\n\ta\tb\n");
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label start:\n    \"a\tb\"\n"
    );
}

#[test]
fn test_passthrough_comment_does_not_count_as_content() {
    let engine = build(":: start\n    ## note\n");
    assert!(engine.control_calls().is_empty());
    assert!(engine.output("control.rpy").is_none());
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label start:\n    ## note\n"
    );
}

#[test]
fn test_ignored_labels() {
    let engine = build(":: pick_choice\n    A\n:: x_ignore_y\n    B\n:: kept\n    C\n");
    assert_eq!(engine.control_calls(), ["kept"]);
}

#[test]
fn test_no_control_file_when_disabled() {
    let config = Config {
        create_flow_control_file: false,
        ..Default::default()
    };
    let (engine, result) = build_with(config, ":: start\n    Hi\n");
    result.unwrap();
    assert!(engine.output("control.rpy").is_none());
    assert_eq!(engine.outputs().len(), 1);
}

// =============================================================================
// Rules
// =============================================================================

#[test]
fn test_first_registered_rule_wins() {
    let script = ":l Hi * = \"broad\"\n:l Hi Bob = \"narrow\"\nHi Bob\n";
    assert_eq!(build(script).output("story.rpy").unwrap(), "\"broad\"\n");

    let script = ":l Hi Bob = \"narrow\"\n:l Hi * = \"broad\"\nHi Bob\nHi Amy\n";
    assert_eq!(
        build(script).output("story.rpy").unwrap(),
        "\"narrow\"\n\"broad\"\n"
    );
}

#[test]
fn test_line_rules_before_prefix_rules() {
    let script = ":p e = eileen\n:l e waves = show eileen wave\ne waves\ne Hi\n";
    assert_eq!(
        build(script).output("story.rpy").unwrap(),
        "show eileen wave\neileen \"Hi\"\n"
    );
}

#[test]
fn test_pattern_compilation_is_idempotent() {
    for glob in ["Good {name}", "a.b (c) [d]", "\\{x\\} * + ?", "^cost$ | {}"] {
        let first = glob_to_regex(glob);
        assert_eq!(first, glob_to_regex(glob));
        let a = compile_pattern(glob, Anchor::FullLine).unwrap();
        let b = compile_pattern(glob, Anchor::FullLine).unwrap();
        assert_eq!(a.as_str(), b.as_str());
    }
}

#[test]
fn test_group_count_mismatch_is_fatal() {
    let (_, result) = build_with(Config::default(), ":l Hello = Hi {0}\nHello\n");
    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Substitution);
    assert_eq!(err.location, "story.rps|2 ");
}

#[test]
fn test_newline_expansion() {
    let script = ":l both = show a\\nshow b\nboth\n";
    assert_eq!(
        build(script).output("story.rpy").unwrap(),
        "show a\nshow b\n"
    );
}

// =============================================================================
// Indentation
// =============================================================================

#[test]
fn test_single_drop_to_zero() {
    let mut tracker = IndentTracker::new();
    let mut increases = 0;
    for leading in [0, 2, 5, 9, 10] {
        if tracker.update(leading) == IndentChange::Increase {
            increases += 1;
        }
    }
    assert_eq!(
        tracker.update(0),
        IndentChange::Decrease {
            popped: increases,
            aligned: true
        }
    );
    assert_eq!(tracker.depth(), 0);
}

#[test]
fn test_dedent_between_levels_is_rejected() {
    let (_, result) = build_with(Config::default(), ":m:\n    A:\n        :r\n   B\n");
    let err = result.unwrap_err();
    assert!(matches!(err.error, BuildError::InconsistentIndent { .. }));
    assert_eq!(err.to_string().split(' ').next(), Some("story.rps|4"));
}

#[test]
fn test_label_body_is_optional() {
    let engine = build(":: a\n:: b\n    Text\n");
    assert_eq!(
        engine.output("story.rpy").unwrap(),
        "label a:\nlabel b:\n    \"Text\"\n"
    );
}

// =============================================================================
// File chain
// =============================================================================

#[test]
fn test_import_relative_to_importing_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("parts/shared")).unwrap();
    fs::write(
        dir.path().join("story.rps"),
        ":import parts/one.rps\n:: start\n    e Hi\n",
    )
    .unwrap();
    fs::write(dir.path().join("parts/one.rps"), ":import shared/rules.rps\n").unwrap();
    fs::write(dir.path().join("parts/shared/rules.rps"), ":p e = eileen\n").unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    let stats = engine.run(&dir.path().join("story.rps")).unwrap();

    assert_eq!(stats.input_files, 3);
    assert_eq!(
        fs::read_to_string(dir.path().join("story.rpy")).unwrap(),
        "label start:\n    eileen \"Hi\"\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("control.rpy")).unwrap(),
        "label _control_:\n    call start\n    return\n"
    );
}

#[test]
fn test_imported_file_has_its_own_indentation() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("story.rps"),
        ":: start\n    :nvl:\n        :import aside.rps\n        Back\n",
    )
    .unwrap();
    fs::write(dir.path().join("aside.rps"), "Aside\n").unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    engine.run(&dir.path().join("story.rps")).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("story.rpy")).unwrap(),
        "label start:\n\"Aside\"\n    NVL \"Back\"\n"
    );
}

#[test]
fn test_import_cycle_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rps"), ":import b.rps\n").unwrap();
    fs::write(dir.path().join("b.rps"), "B\n:import a.rps\n").unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    let err = engine.run(&dir.path().join("a.rps")).unwrap_err();
    assert!(matches!(err.error, BuildError::ImportCycle(_)));
    assert_eq!(err.location, "b.rps|2 ");
    // Output written before the failure is flushed
    assert_eq!(
        fs::read_to_string(dir.path().join("a.rpy")).unwrap(),
        "\"B\"\n"
    );
}

#[test]
fn test_missing_import() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.rps"), "One\n:import nowhere.rps\nTwo\n").unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    let err = engine.run(&dir.path().join("story.rps")).unwrap_err();
    assert!(matches!(err.error, BuildError::InputNotFound(_)));
    assert_eq!(err.category(), ErrorCategory::Resource);

    let config = Config {
        abort_on_error: false,
        ..Default::default()
    };
    let out = tempfile::tempdir().unwrap();
    let config = Config {
        output_path: out.path().to_path_buf(),
        ..config
    };
    let mut engine = Engine::new(config).unwrap();
    let stats = engine.run(&dir.path().join("story.rps")).unwrap();
    assert_eq!(stats.errors, 1);
    assert_eq!(
        fs::read_to_string(out.path().join("story.rpy")).unwrap(),
        "\"One\"\n\"Two\"\n"
    );
}

#[test]
fn test_missing_master_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = Engine::new(Config::default()).unwrap();
    let err = engine.run(&dir.path().join("absent.rps")).unwrap_err();
    assert!(matches!(err.error, BuildError::InputNotFound(_)));
    assert!(engine.outputs().is_empty());
}

#[test]
fn test_break_inside_import_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("story.rps"), "One\n:import stop.rps\nNever\n").unwrap();
    fs::write(dir.path().join("stop.rps"), "Two\n:break\nNever\n").unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    engine.run(&dir.path().join("story.rps")).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("story.rpy")).unwrap(),
        "\"One\"\n\"Two\"\n"
    );
}

// =============================================================================
// Output routing
// =============================================================================

#[test]
fn test_output_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("story.rps"),
        ":config output_path = \"build/game\"\n:: start\n    Hi\n:file extra/side.rpy\nSide\n",
    )
    .unwrap();

    let mut engine = Engine::new(Config::default()).unwrap();
    engine.run(&dir.path().join("story.rps")).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("build/game/story.rpy")).unwrap(),
        "label start:\n    \"Hi\"\n"
    );
    assert!(dir.path().join("build/game/control.rpy").is_file());
    // Paths with a directory resolve against the master input's directory
    assert_eq!(
        fs::read_to_string(dir.path().join("extra/side.rpy")).unwrap(),
        "\"Side\"\n"
    );
}

#[test]
fn test_redirect_before_first_write() {
    let engine = build(":file first.rpy\n:: start\n    Hi\n");
    assert!(engine.output("story.rpy").is_none());
    assert_eq!(
        engine.output("first.rpy").unwrap(),
        "label start:\n    \"Hi\"\n"
    );
}

#[test]
fn test_stats() {
    let script = "\
:p e = eileen
:l Good {x} = \"Hi {0}\"
:: start
    e Hello
    Good day
    Plain
";
    let (_, result) = build_with(Config::default(), script);
    let stats = result.unwrap();
    assert_eq!(stats.input_files, 1);
    assert_eq!(stats.input_lines, 6);
    assert_eq!(stats.directives, 3);
    assert_eq!(stats.rules_registered, 2);
    assert_eq!(stats.prefix_replacements, 1);
    assert_eq!(stats.line_replacements, 1);
    assert_eq!(stats.narration_lines, 1);
    assert_eq!(stats.labels, 1);
    assert_eq!(stats.control_calls, 1);
    assert_eq!(stats.output_files, 2);
    assert_eq!(stats.output_lines, 7);
}
