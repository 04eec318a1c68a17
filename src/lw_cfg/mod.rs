use crate::prelude::*;
use crate::source::{self, MethodFilter, Source};
use clap::ArgMatches;
use lw_analysis::stats::CfgStats;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn run(args: &ArgMatches) -> LwResult<()> {
    init_logger(args);

    let source = Source::from_args(args)?;
    let filter = MethodFilter::from_args(args)?;
    let options = source::options_from_args(args)?;

    let methods = filter.select(source.program());
    let analyzed = source::analyze_methods(&methods, &options);

    let mut total = CfgStats::default();
    for (class, method, res) in &analyzed {
        let Ok(liveness) = res else {
            continue;
        };
        println!("[*] {}", method.descriptor(class));

        if let Some(cfg_dir) = &args.get_one::<String>("output") {
            let path = write_cfg_file(cfg_dir, &class.name, &method.name, liveness)?;
            log::info!("dot output written in {:?}", path);
        } else {
            for line in liveness.to_string().lines() {
                println!("    {line}");
            }
        }

        let stats = CfgStats::of_liveness(liveness);
        if args.get_flag("stats") {
            for line in stats.to_string().lines() {
                println!("    {line}");
            }
        }
        total += stats;
    }

    if args.get_flag("stats") {
        println!("[*] total");
        for line in total.to_string().lines() {
            println!("    {line}");
        }
    }

    source::check_failures(&analyzed)
}

fn write_cfg_file<P: AsRef<Path>>(
    base_dir: P,
    class_name: &str,
    method_name: &str,
    liveness: &Liveness,
) -> LwResult<PathBuf> {
    // prepare directory (base_dir/class_name)
    let mut dir = base_dir.as_ref().to_path_buf();
    dir.push(class_name);
    create_dir_all(&dir)?;

    // write file
    dir.push(method_name);
    dir.set_extension("dot");
    let mut file = File::create(&dir)?;
    file.write_all(liveness.to_dot().as_bytes())?;

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn dot_file_layout() {
        let program = parse("class A { int f(int n) { return n; } }").unwrap();
        let liveness = Liveness::compute(&program.classes[0].methods[0], &Options::default()).unwrap();
        let base = env::temp_dir().join(format!("lw-cfg-test-{}", std::process::id()));
        let path = write_cfg_file(&base, "A", "f", &liveness).unwrap();
        assert_eq!(path, base.join("A").join("f.dot"));
        let dot = fs::read_to_string(&path).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("IN: {n}"));
        fs::remove_dir_all(base).unwrap();
    }
}
