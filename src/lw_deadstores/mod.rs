use crate::prelude::*;
use crate::source::{self, Analyzed, MethodFilter, Source};
use clap::ArgMatches;
use lw_ast::{Loc, StmtHeader};
use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DeadStoreReport {
    pub method: String,
    pub loc: Loc,
    pub var: String,
    pub stmt: String,
    pub unreachable: bool,
}

impl std::fmt::Display for DeadStoreReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: value assigned to `{}` is never read: {}",
            self.method, self.loc, self.var, self.stmt
        )?;
        if self.unreachable {
            write!(f, " (unreachable)")?;
        }
        Ok(())
    }
}

#[must_use]
pub fn collect_reports(analyzed: &[Analyzed]) -> Vec<DeadStoreReport> {
    let mut reports = Vec::new();
    for (class, method, res) in analyzed {
        if let Ok(liveness) = res {
            for store in liveness.dead_stores() {
                reports.push(DeadStoreReport {
                    method: method.descriptor(class),
                    loc: store.stmt.loc,
                    var: store.var.to_string(),
                    stmt: StmtHeader(store.stmt).to_string(),
                    unreachable: store.unreachable,
                });
            }
        }
    }
    reports
}

pub fn run(args: &ArgMatches) -> LwResult<()> {
    init_logger(args);

    let source = Source::from_args(args)?;
    let filter = MethodFilter::from_args(args)?;

    let methods = filter.select(source.program());
    let analyzed = source::analyze_methods(&methods, &Options::default());
    let reports = collect_reports(&analyzed);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{report}");
        }
    }
    log::info!("{} dead store(s) found", reports.len());

    source::check_failures(&analyzed)
}
