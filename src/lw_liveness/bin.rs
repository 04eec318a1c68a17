use liveworks::prelude::LwResult;
use liveworks::{cli, lw_liveness};

fn main() -> LwResult<()> {
    let args = cli::liveness().get_matches();
    lw_liveness::run(&args)
}
