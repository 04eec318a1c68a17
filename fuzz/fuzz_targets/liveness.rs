#![no_main]
use libfuzzer_sys::fuzz_target;
use lw_analysis::errors::AnalysisError;
use lw_analysis::liveness::Liveness;
use lw_analysis::Options;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(program) = lw_ast::parse(text) else {
        return;
    };
    for (_, method) in program.iter_methods() {
        match Liveness::compute(method, &Options::default()) {
            Ok(liveness) => {
                let again = liveness.recompute(&Options::default()).unwrap();
                assert_eq!(again.result_map(), liveness.result_map());
            }
            Err(AnalysisError::UnsupportedConstruct { .. }) => (),
            Err(err) => panic!("{err}"),
        }
    }
});
