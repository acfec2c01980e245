// Yantra fixture runner
// Discovers all YAML fixtures in tests/fixtures/, runs each grammar over its input,
// and compares the values found with the expected ones. Reports pass/fail with
// colorized output. Integrates with cargo test.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use num_bigint::BigInt;
use serde::Deserialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;
use yantra::grammar::GrammarFile;
use yantra::value::hex;
use yantra::Engine;

/// One grammar run over one input.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    name: String,
    grammar: GrammarFile,
    /// Hex digits; whitespace is ignored.
    input: String,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    values: Option<Vec<ExpectedValue>>,
    #[serde(default)]
    no_match: bool,
    /// Expected error type, e.g. `evaluation`.
    #[serde(default)]
    error: Option<String>,
}

/// A value by full name and hex bytes, in parse order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpectedValue {
    name: String,
    hex: String,
}

fn discover_fixtures(root: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn load_fixtures(path: &Path) -> Vec<Fixture> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixtures in {}: {}", path.display(), e))
}

fn decode_hex(text: &str) -> Vec<u8> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    digits
        .chunks(2)
        .map(|pair| {
            let pair: String = pair.iter().collect();
            u8::from_str_radix(&pair, 16).unwrap_or_else(|_| panic!("bad hex byte {pair:?}"))
        })
        .collect()
}

/// Runs one fixture; `Err` carries a description of the mismatch.
fn check(fixture: &Fixture) -> Result<(), String> {
    let root = fixture.grammar.build().map_err(|e| format!("grammar: {e}"))?;
    let outcome = Engine::new().parse_bytes(&root, decode_hex(&fixture.input));

    if let Some(expected) = &fixture.error {
        return match outcome {
            Err(e) if e.error_type().as_str() == expected => Ok(()),
            Err(e) => Err(format!("expected {expected} error, got {}: {e}", e.error_type())),
            Ok(_) => Err(format!("expected {expected} error, parse returned normally")),
        };
    }
    let outcome = outcome.map_err(|e| format!("unexpected error: {e}"))?;
    let state = match (outcome, fixture.no_match) {
        (None, true) => return Ok(()),
        (Some(_), true) => return Err("expected no match".to_string()),
        (None, false) => return Err("grammar did not match".to_string()),
        (Some(state), false) => state,
    };

    if let Some(offset) = fixture.offset {
        if *state.offset() != BigInt::from(offset) {
            return Err(format!("expected offset {offset}, got {}", state.offset()));
        }
    }
    if let Some(expected) = &fixture.values {
        let actual: Vec<(String, String)> = state
            .order()
            .values()
            .iter()
            .map(|v| (v.name().to_string(), hex(&v.value().bytes().unwrap_or_default())))
            .collect();
        let expected: Vec<(String, String)> = expected
            .iter()
            .map(|v| (v.name.clone(), v.hex.to_lowercase()))
            .collect();
        if actual != expected {
            return Err(format!("expected values {expected:?}\n  actual values   {actual:?}"));
        }
    }
    Ok(())
}

#[test]
fn fixture_grammars() {
    let files = discover_fixtures("tests/fixtures");
    assert!(!files.is_empty(), "No fixtures found in tests/fixtures/");

    let mut failed = 0;
    let mut total = 0;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    for file in files {
        let file_name = file.file_name().unwrap().to_string_lossy().to_string();
        for fixture in load_fixtures(&file) {
            total += 1;
            match check(&fixture) {
                Ok(()) => {
                    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
                    let _ = writeln!(stdout, "PASS: {file_name}: {}", fixture.name);
                }
                Err(reason) => {
                    failed += 1;
                    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
                    let _ = writeln!(stdout, "FAIL: {file_name}: {}", fixture.name);
                    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(false));
                    let _ = writeln!(stdout, "  {reason}");
                }
            }
            let _ = stdout.reset();
        }
    }

    assert_eq!(failed, 0, "{failed} of {total} fixtures failed");
}
