use clap::ArgMatches;
use clap_complete::{generate, Shell};
use liveworks::prelude::*;
use liveworks::{cli, lw_cfg, lw_deadstores, lw_liveness};
use std::io;

fn main() -> LwResult<()> {
    let args = cli::liveworks().get_matches();

    match &args.subcommand() {
        Some(("cfg", cmd_args)) => lw_cfg::run(cmd_args),
        Some(("deadstores", cmd_args)) => lw_deadstores::run(cmd_args),
        Some(("liveness", cmd_args)) => lw_liveness::run(cmd_args),
        Some(("gen-completions", sub_args)) => subcommand_gen_completions(sub_args),
        Some((subcommand, _)) => Err(LwError::BadArguments(format!(
            "unknown subcommand '{subcommand}'"
        ))),
        None => Err(LwError::BadArguments("missing subcommand".to_string())),
    }
}

fn subcommand_gen_completions(sub_args: &ArgMatches) -> LwResult<()> {
    let generator = *sub_args
        .get_one::<Shell>("shell")
        .ok_or_else(|| LwError::BadArguments("--shell needed".to_string()))?;
    let mut cmd = cli::liveworks();
    let cmd_name = cmd.get_name().to_string();
    generate(generator, &mut cmd, cmd_name, &mut io::stdout());
    Ok(())
}
