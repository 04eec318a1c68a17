use liveworks::prelude::LwResult;
use liveworks::{cli, lw_deadstores};

fn main() -> LwResult<()> {
    let args = cli::deadstores().get_matches();
    lw_deadstores::run(&args)
}
