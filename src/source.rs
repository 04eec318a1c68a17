use crate::prelude::*;
use clap::ArgMatches;
use lw_analysis::errors::AnalysisResult;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::io::{self, Read};

/// A parsed input program, read from a file or from standard input.
pub struct Source {
    name: String,
    program: Program,
}

impl Source {
    /// Reads and parses the given file, `-` standing for standard
    /// input.
    pub fn open(path: &str) -> LwResult<Self> {
        let text = if path == "-" {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        } else {
            fs::read_to_string(path)?
        };
        Self::from_text(path, &text)
    }

    pub fn from_text(name: &str, text: &str) -> LwResult<Self> {
        let program = parse(text)?;
        log::debug!(
            "{name}: {} classes, {} methods",
            program.classes.len(),
            program.nb_methods()
        );
        Ok(Self {
            name: name.to_string(),
            program,
        })
    }

    /// Opens the `--input` argument, standard input when absent.
    pub fn from_args(args: &ArgMatches) -> LwResult<Self> {
        let path = args
            .get_one::<String>("input")
            .map_or("-", String::as_str);
        Self::open(path)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// Class and method names regex filters.
#[derive(Debug, Default)]
pub struct MethodFilter {
    class: Option<Regex>,
    method: Option<Regex>,
}

impl MethodFilter {
    pub fn new(class: Option<&str>, method: Option<&str>) -> LwResult<Self> {
        Ok(Self {
            class: class.map(Regex::new).transpose()?,
            method: method.map(Regex::new).transpose()?,
        })
    }

    pub fn from_args(args: &ArgMatches) -> LwResult<Self> {
        let filter = Self::new(
            args.get_one::<String>("filter-class").map(String::as_str),
            args.get_one::<String>("filter-method").map(String::as_str),
        )?;
        log::debug!(
            "filtering on class pattern {:?}, method pattern {:?}",
            filter.class,
            filter.method
        );
        Ok(filter)
    }

    #[must_use]
    pub fn matches(&self, class: &Class, method: &Method) -> bool {
        self.class.as_ref().map_or(true, |r| r.is_match(&class.name))
            && self.method.as_ref().map_or(true, |r| r.is_match(&method.name))
    }

    /// Selected methods of the program, in source order.
    #[must_use]
    pub fn select<'p>(&self, program: &'p Program) -> Vec<(&'p Class, &'p Method)> {
        program
            .iter_methods()
            .filter(|(class, method)| self.matches(class, method))
            .collect()
    }
}

/// Builds analysis options from `--order`.
pub fn options_from_args(args: &ArgMatches) -> LwResult<Options> {
    let mut options = Options::default();
    if let Some(order) = args.get_one::<String>("order") {
        options.order = order.parse().map_err(LwError::BadArguments)?;
    }
    Ok(options)
}

/// A method with its analysis result.
pub type Analyzed<'p> = (&'p Class, &'p Method, AnalysisResult<Liveness<'p>>);

/// Analyzes methods in parallel, results are in the same order as
/// the given methods.
#[must_use]
pub fn analyze_methods<'p>(
    methods: &[(&'p Class, &'p Method)],
    options: &Options,
) -> Vec<Analyzed<'p>> {
    methods
        .par_iter()
        .map(|&(class, method)| {
            log::info!("analyzing {}", method.descriptor(class));
            (class, method, Liveness::compute(method, options))
        })
        .collect()
}

/// Logs analysis failures and a summary line.
pub fn check_failures(analyzed: &[Analyzed]) -> LwResult<()> {
    let mut failed = 0;
    for (class, method, res) in analyzed {
        if let Err(err) = res {
            log::error!("{}: {err}", method.descriptor(class));
            failed += 1;
        }
    }
    let total = analyzed.len();
    log::info!("analyzed methods: {} / {total}", total - failed);
    if failed > 0 {
        Err(LwError::FailedMethods { failed, total })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "class Main { public static void main(String[] args) { } } \
                           class Fac { int compute(int n) { return n; } int reset() { return 0; } }";

    #[test]
    fn filters() {
        let source = Source::from_text("test", PROGRAM).unwrap();
        let all = MethodFilter::default().select(source.program());
        assert_eq!(all.len(), 3);

        let filter = MethodFilter::new(Some("^Fac$"), None).unwrap();
        let names: Vec<_> = filter
            .select(source.program())
            .iter()
            .map(|(class, method)| method.descriptor(class))
            .collect();
        assert_eq!(names, ["Fac.compute", "Fac.reset"]);

        let filter = MethodFilter::new(None, Some("^(main|reset)$")).unwrap();
        assert_eq!(filter.select(source.program()).len(), 2);
    }

    #[test]
    fn parallel_analysis_keeps_order() {
        let source = Source::from_text(
            "test",
            "class A { int f() { return 1; } int g() { break; } int h() { x = 1; return x; } }",
        )
        .unwrap();
        let methods = MethodFilter::default().select(source.program());
        let analyzed = analyze_methods(&methods, &Options::default());
        let names: Vec<_> = analyzed.iter().map(|(_, m, _)| m.name.as_str()).collect();
        assert_eq!(names, ["f", "g", "h"]);
        assert!(analyzed[1].2.is_err());
        assert!(matches!(
            check_failures(&analyzed),
            Err(LwError::FailedMethods { failed: 1, total: 3 })
        ));
    }

    #[test]
    fn bad_regex() {
        assert!(matches!(
            MethodFilter::new(Some("("), None),
            Err(LwError::Regex(_))
        ));
    }

    #[test]
    fn syntax_error() {
        assert!(matches!(
            Source::from_text("test", "class { }"),
            Err(LwError::Ast(_))
        ));
    }
}
