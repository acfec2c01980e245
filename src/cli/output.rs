//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for pretty-printing, colorizing output,
//! formatting errors, and generating JSON. By centralizing output logic here,
//! we ensure a consistent user experience across all commands.

use std::io::{self, Write};

use miette::Report;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde_json::{json, Value as Json};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::graph::{Items, ParseGraph, ParseItem, ParseValue};
use crate::value::hex;
use crate::{YantraError, YantraResult};

/// Values up to this many bytes are also shown as numbers.
const NUMERIC_DISPLAY_LIMIT: usize = 8;

// ============================================================================
// CORE OUTPUT FUNCTIONS: User-facing CLI output utilities
// ============================================================================

/// Prints the parse graph as an indented, colored tree.
pub fn print_tree(graph: &ParseGraph) -> YantraResult<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_tree(&mut stdout, graph)
}

/// Prints every value as one JSON document.
pub fn print_json(graph: &ParseGraph) -> YantraResult<()> {
    let document = to_json(graph)?;
    let text = serde_json::to_string_pretty(&document)
        .map_err(|error| crate::err_msg!(Internal, "cannot render JSON: {}", error))?;
    println!("{text}");
    Ok(())
}

/// Prints an error with its diagnostic code, help and source snippet.
pub fn print_error(error: YantraError) {
    eprintln!("{:?}", Report::new(error));
}

pub fn print_no_match() {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = writeln!(stderr, "no match");
    let _ = stderr.reset();
}

pub fn print_check_ok(root: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = write!(stdout, "ok");
    let _ = stdout.reset();
    let _ = writeln!(stdout, ": root {root}");
}

/// Writes the tree oldest item first; nested graphs are indented under their token.
pub fn write_tree(out: &mut impl WriteColor, graph: &ParseGraph) -> YantraResult<()> {
    let chronological = graph.reversed();
    let mut stack: Vec<(Items<'_>, usize)> = vec![(chronological.items(), 0)];
    while let Some((items, depth)) = stack.last_mut() {
        let depth = *depth;
        let Some(item) = items.next() else {
            stack.pop();
            continue;
        };
        let indent = "  ".repeat(depth);
        match item {
            ParseItem::Value(value) => write_value(out, &indent, value)?,
            ParseItem::Graph(nested) => {
                let label = nested
                    .definition()
                    .map_or_else(|| "graph".to_string(), ToString::to_string);
                colored(out, Color::Yellow, &format!("{indent}{label}"))?;
                newline(out)?;
                stack.push((nested.items(), depth + 1));
            }
            ParseItem::Reference(reference) => {
                colored(
                    out,
                    Color::Cyan,
                    &format!("{indent}-> {} @{}", reference.definition(), reference.location()),
                )?;
                newline(out)?;
            }
        }
    }
    Ok(())
}

/// Every value, oldest first, plus the back-references recorded on cycles.
pub fn to_json(graph: &ParseGraph) -> YantraResult<Json> {
    let values = graph
        .values()
        .iter()
        .map(value_to_json)
        .collect::<YantraResult<Vec<_>>>()?;
    let mut references: Vec<Json> = graph
        .walk()
        .filter_map(ParseItem::as_reference)
        .map(|reference| {
            json!({
                "definition": reference.definition().to_string(),
                "offset": number(reference.location()),
            })
        })
        .collect();
    references.reverse();
    Ok(json!({ "values": values, "references": references }))
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn value_to_json(value: &ParseValue) -> YantraResult<Json> {
    let bytes = value.value().bytes()?;
    let mut record = json!({
        "name": value.name(),
        "offset": number(value.slice().offset()),
        "length": bytes.len(),
        "hex": hex(&bytes),
    });
    if bytes.len() <= NUMERIC_DISPLAY_LIMIT {
        record["number"] = number(&value.value().as_numeric()?);
    }
    Ok(record)
}

/// JSON numbers where they fit, decimal strings beyond.
fn number(value: &BigInt) -> Json {
    match (value.to_u64(), value.to_i64()) {
        (Some(unsigned), _) => json!(unsigned),
        (None, Some(signed)) => json!(signed),
        _ => json!(value.to_string()),
    }
}

fn write_value(out: &mut impl WriteColor, indent: &str, value: &ParseValue) -> YantraResult<()> {
    let bytes = value.value().bytes()?;
    colored(out, Color::Green, &format!("{indent}{}", value.name()))?;
    let mut line = format!(" @{} [{}] = 0x{}", value.slice().offset(), bytes.len(), hex(&bytes));
    if bytes.len() <= NUMERIC_DISPLAY_LIMIT {
        line.push_str(&format!(" ({})", value.value().as_numeric()?));
    }
    write!(out, "{line}").map_err(write_failed)?;
    newline(out)
}

fn colored(out: &mut impl WriteColor, color: Color, text: &str) -> YantraResult<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))
        .map_err(write_failed)?;
    write!(out, "{text}").map_err(write_failed)?;
    out.reset().map_err(write_failed)
}

fn newline(out: &mut impl WriteColor) -> YantraResult<()> {
    writeln!(out).map_err(write_failed)
}

fn write_failed(cause: io::Error) -> YantraError {
    crate::err_io!("cannot write output", cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::expression::ValueExpr;
    use crate::token::Token;
    use termcolor::NoColor;

    fn parsed() -> ParseGraph {
        let root = Token::seq(
            "packet",
            vec![
                Token::def("len", ValueExpr::con_int(1)).unwrap(),
                Token::def("data", ValueExpr::reference("len")).unwrap(),
            ],
        )
        .unwrap();
        Engine::new()
            .parse_bytes(&root, vec![0x02, 0xAA, 0xBB])
            .unwrap()
            .unwrap()
            .order()
            .clone()
    }

    #[test]
    fn test_tree_lists_values_in_order() {
        let mut out = NoColor::new(Vec::new());
        write_tree(&mut out, &parsed()).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "seq(packet)");
        assert_eq!(lines[1], "  packet.len @0 [1] = 0x02 (2)");
        assert_eq!(lines[2], "  packet.data @1 [2] = 0xaabb (43707)");
    }

    #[test]
    fn test_json_records() {
        let document = to_json(&parsed()).unwrap();
        assert_eq!(document["values"][1]["name"], "packet.data");
        assert_eq!(document["values"][1]["offset"], 1);
        assert_eq!(document["values"][1]["hex"], "aabb");
        assert_eq!(document["references"].as_array().unwrap().len(), 0);
    }
}
