use crate::prelude::*;
use crate::source::{self, Analyzed, MethodFilter, Source};
use clap::ArgMatches;
use lw_analysis::registers::{Assignment, Interference};
use lw_ast::{Loc, PrettyPrinter, StmtHeader};
use nu_ansi_term::Color;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};

/// Live variables before one statement.
#[derive(Debug, Serialize)]
pub struct LiveSetReport<'a> {
    pub id: NodeId,
    pub loc: Loc,
    pub stmt: String,
    pub live: &'a BTreeSet<String>,
}

/// Analysis results of one method.
#[derive(Debug, Serialize)]
pub struct UnitReport<'a> {
    pub class: &'a str,
    pub method: &'a str,
    pub blocks: usize,
    pub iterations: usize,
    pub statements: Vec<LiveSetReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registers: Option<Assignment>,
}

impl<'a> UnitReport<'a> {
    #[must_use]
    pub fn new(class: &'a Class, liveness: &'a Liveness, registers: Option<usize>) -> Self {
        let method = liveness.method();
        let statements = method
            .statements()
            .into_iter()
            .filter_map(|stmt| {
                liveness
                    .result_map()
                    .get(stmt.id)
                    .map(|live| LiveSetReport {
                        id: stmt.id,
                        loc: stmt.loc,
                        stmt: StmtHeader(stmt).to_string(),
                        live,
                    })
            })
            .collect();
        Self {
            class: &class.name,
            method: &method.name,
            blocks: liveness.cfg().nb_blocks(),
            iterations: liveness.iterations(),
            statements,
            registers: registers.map(|k| Interference::of_liveness(liveness).assign(k)),
        }
    }
}

pub fn run(args: &ArgMatches) -> LwResult<()> {
    init_logger(args);

    let source = Source::from_args(args)?;
    let filter = MethodFilter::from_args(args)?;
    let options = source::options_from_args(args)?;
    log::info!("analyzing {} with {} worklist order", source.name(), options.order);

    let methods = filter.select(source.program());
    let analyzed = source::analyze_methods(&methods, &options);
    let registers = args.get_one::<usize>("registers").copied();

    let mut out: Box<dyn Write> = match args.get_one::<String>("output") {
        Some(fname) => Box::new(File::create(fname)?),
        None => Box::new(io::stdout().lock()),
    };
    if args.get_flag("json") {
        write_json(&mut out, &analyzed, registers)?;
    } else {
        write_annotated(&mut out, &analyzed, !args.get_flag("no-color"), registers)?;
    }
    out.flush()?;

    source::check_failures(&analyzed)
}

fn write_json<W: Write>(
    out: &mut W,
    analyzed: &[Analyzed],
    registers: Option<usize>,
) -> LwResult<()> {
    let reports: Vec<UnitReport> = analyzed
        .iter()
        .filter_map(|(class, _, res)| {
            res.as_ref()
                .ok()
                .map(|l| UnitReport::new(class, l, registers))
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &reports)?;
    writeln!(out)?;
    Ok(())
}

fn live_set_note(live: &BTreeSet<String>) -> String {
    let names: Vec<&str> = live.iter().map(String::as_str).collect();
    format!("live: {{{}}}", names.join(", "))
}

/// Renders a method with the set of live variables above each
/// statement.
#[must_use]
pub fn annotated_method(liveness: &Liveness, color: bool) -> String {
    let map = liveness.result_map();
    let printer = PrettyPrinter::with_annotations(|stmt: &Stmt| {
        map.get(stmt.id).map(|live| {
            let note = live_set_note(live);
            if color {
                Color::Cyan.paint(note).to_string()
            } else {
                note
            }
        })
    });
    printer.print_method(liveness.method())
}

fn write_annotated<W: Write>(
    out: &mut W,
    analyzed: &[Analyzed],
    color: bool,
    registers: Option<usize>,
) -> LwResult<()> {
    for (class, method, res) in analyzed {
        let header = format!("[*] {}", method.descriptor(class));
        match res {
            Ok(liveness) => {
                if color {
                    writeln!(out, "{}", Color::Green.paint(header))?;
                } else {
                    writeln!(out, "{header}")?;
                }
                write!(out, "{}", annotated_method(liveness, color))?;
                if let Some(k) = registers {
                    let assignment = Interference::of_liveness(liveness).assign(k);
                    writeln!(out, "// registers ({k}): {assignment}")?;
                    if assignment.nb_spilled() > 0 {
                        log::warn!(
                            "{}: {} variable(s) spilled with {k} registers",
                            method.descriptor(class),
                            assignment.nb_spilled()
                        );
                    }
                }
                for (id, block) in liveness.cfg().iter_blocks() {
                    if block.is_dead() && !block.is_empty() {
                        log::warn!(
                            "{}: unreachable code in block {}",
                            method.descriptor(class),
                            id.index()
                        );
                    }
                }
            }
            Err(err) => {
                if color {
                    writeln!(out, "{}", Color::Red.paint(format!("{header}: {err}")))?;
                } else {
                    writeln!(out, "{header}: {err}")?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "class Fac { int compute(int n) { int r; r = 1; while (0 < n) { r = r * n; n = n - 1; } return r; } }";

    #[test]
    fn annotated_output() {
        let program = parse(PROGRAM).unwrap();
        let liveness = Liveness::compute(&program.classes[0].methods[0], &Options::default()).unwrap();
        let text = annotated_method(&liveness, false);
        assert_eq!(
            text,
            "public int compute(int n) {\n    int r;\n    // live: {n}\n    r = 1;\n    // live: {n, r}\n    while (0 < n)\n    {\n        // live: {n, r}\n        r = r * n;\n        // live: {n, r}\n        n = n - 1;\n    }\n    // live: {r}\n    return r;\n}\n"
        );
    }

    #[test]
    fn json_report() {
        let program = parse(PROGRAM).unwrap();
        let source = Source::from_text("test", PROGRAM).unwrap();
        let methods = MethodFilter::default().select(source.program());
        let analyzed = source::analyze_methods(&methods, &Options::default());
        let mut buf = Vec::new();
        write_json(&mut buf, &analyzed, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["class"], "Fac");
        assert_eq!(value[0]["method"], "compute");
        let stmts = value[0]["statements"].as_array().unwrap();
        assert_eq!(stmts.len(), program.classes[0].methods[0].statements().len() - 1);
        assert_eq!(stmts[0]["stmt"], "r = 1;");
        assert_eq!(stmts[0]["live"], serde_json::json!(["n"]));
        assert_eq!(stmts[0]["loc"]["line"], 1);
        assert!(value[0].get("registers").is_none());
    }

    #[test]
    fn register_assignment() {
        let source = Source::from_text("test", PROGRAM).unwrap();
        let methods = MethodFilter::default().select(source.program());
        let analyzed = source::analyze_methods(&methods, &Options::default());

        let mut buf = Vec::new();
        write_annotated(&mut buf, &analyzed, false, Some(2)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("[*] Fac.compute\n"));
        assert!(text.ends_with("}\n// registers (2): n: r0, r: r1\n"));

        let mut buf = Vec::new();
        write_json(&mut buf, &analyzed, Some(1)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["registers"]["n"], serde_json::json!({"register": 0}));
        assert_eq!(value[0]["registers"]["r"], "spilled");
    }
}
