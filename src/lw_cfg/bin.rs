use liveworks::prelude::LwResult;
use liveworks::{cli, lw_cfg};

fn main() -> LwResult<()> {
    let args = cli::cfg().get_matches();
    lw_cfg::run(&args)
}
