#![no_main]

use ccroute::engine::{Engine, EngineClassifier};
use ccroute::rewrite::rewrite;
use ccroute::target::is_target;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Treat NUL-separated input as an argument vector
    if let Ok(input) = std::str::from_utf8(data) {
        let argv: Vec<String> = input.split('\0').map(str::to_string).collect();

        let engine = EngineClassifier::new().classify(&argv);
        if engine == Engine::Unknown {
            assert!(!is_target(engine, &argv));
        }

        let once = rewrite(Engine::V8, &argv);
        assert!(once.len() <= argv.len());
        assert_eq!(rewrite(Engine::V8, &once), once);
    }
});
