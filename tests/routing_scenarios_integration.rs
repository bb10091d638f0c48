//! End-to-end routing scenarios
//!
//! Runs the whole pipeline (classify, filter, rewrite, select, log) for
//! realistic invocations from the three engine builds, stopping short of
//! `exec`.

use ccroute::invocation_log::{AppendLog, InvocationLog, MemoryLog};
use ccroute::{Engine, Reason, Router, RouterConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn router(engine: Option<Engine>) -> Router {
    let mut config = RouterConfig::relative_to(Path::new("/src/engines/compiler"));
    config.toolchain_dir = PathBuf::from("/src/fuzz/afl");
    config.engine = engine;
    Router::new(config)
}

fn route_and_log(router: &Router, args: &[String], log: &mut MemoryLog) -> ccroute::Invocation {
    let invocation = router.route(args).unwrap();
    log.append(&invocation.record()).unwrap();
    invocation
}

/// V8 unit, no pin: instrumented, incompatible flag dropped
#[test]
fn test_scenario_v8_unit_without_pin() {
    let mut log = MemoryLog::default();
    let inv = route_and_log(
        &router(None),
        &argv(&[
            "clang",
            "-c",
            "foo/third_party/v8/x.cc",
            "-o",
            "x.o",
            "-fcomplete-member-pointers",
        ]),
        &mut log,
    );

    assert_eq!(inv.engine, Engine::V8);
    assert!(inv.verdict.instrument);
    assert_eq!(inv.program, "/src/fuzz/afl/afl-clang-fast");
    assert_eq!(
        inv.argv,
        argv(&[
            "/src/fuzz/afl/afl-clang-fast",
            "-c",
            "foo/third_party/v8/x.cc",
            "-o",
            "x.o",
        ])
    );
    assert_eq!(
        log.lines,
        vec!["/src/fuzz/afl/afl-clang-fast -c foo/third_party/v8/x.cc -o x.o".to_string()]
    );
}

/// ChakraCore thread-context unit: plain clang++, arguments untouched
#[test]
fn test_scenario_chakra_thread_context() {
    let original = argv(&[
        "clang++",
        "-c",
        "/src/ChakraCore/lib/Runtime/Base/ThreadContext.cpp",
    ]);
    let mut log = MemoryLog::default();
    let inv = route_and_log(&router(Some(Engine::ChakraCore)), &original, &mut log);

    assert_eq!(inv.engine, Engine::ChakraCore);
    assert!(!inv.verdict.instrument);
    assert_eq!(inv.program, "clang++");
    assert_eq!(inv.argv, original);
    assert_eq!(log.lines, vec![original.join(" ")]);
}

/// ChakraCore units other than the thread context are instrumented
#[test]
fn test_scenario_chakra_other_unit() {
    let inv = router(Some(Engine::ChakraCore))
        .route(&argv(&[
            "clang++",
            "-fuse-ld=lld",
            "-c",
            "/src/ChakraCore/lib/Backend/Lower.cpp",
        ]))
        .unwrap();
    assert!(inv.verdict.instrument);
    assert_eq!(inv.program, "/src/fuzz/afl/afl-clang-fast++");
    // Rewrite rules only exist for V8
    assert_eq!(inv.argv[1], "-fuse-ld=lld");
}

/// JSC unified source: signature token decides
#[test]
fn test_scenario_jsc_unified_source() {
    let dir = TempDir::new().unwrap();
    let with_token = dir.path().join("unified_source.cpp");
    fs::write(
        &with_token,
        "#include \"bytecode/CodeBlock.cpp\"\n#include \"runtime/JSObject.cpp\"\n",
    )
    .unwrap();
    let without_token = dir.path().join("unified_runtime.cpp");
    fs::write(&without_token, "#include \"runtime/JSObject.cpp\"\n").unwrap();

    let router = router(Some(Engine::Jsc));

    let inv = router
        .route(&argv(&["clang", "-c", with_token.to_str().unwrap()]))
        .unwrap();
    assert!(inv.verdict.instrument);
    assert_eq!(inv.program, "/src/fuzz/afl/afl-clang-fast");
    assert!(matches!(
        inv.verdict.reason,
        Reason::JscSignature { ref token, .. } if token == "bytecode"
    ));

    let inv = router
        .route(&argv(&["clang", "-c", without_token.to_str().unwrap()]))
        .unwrap();
    assert!(!inv.verdict.instrument);
    assert_eq!(inv.program, "clang");
}

/// JSC unit whose source vanished: plain compiler, no panic
#[test]
fn test_scenario_jsc_missing_source() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("UnifiedSource42.cpp");
    let inv = router(Some(Engine::Jsc))
        .route(&argv(&["clang++", "-c", missing.to_str().unwrap()]))
        .unwrap();
    assert!(!inv.verdict.instrument);
    assert_eq!(inv.program, "clang++");
}

/// JSC link step: instrumented so the AFL runtime gets linked in
#[test]
fn test_scenario_jsc_link_step() {
    let inv = router(None)
        .route(&argv(&[
            "clang++",
            "-o",
            "bin/jsc",
            "Source/JavaScriptCore/shell/jsc.o",
            "lib/libJavaScriptCore.a",
        ]))
        .unwrap();
    assert_eq!(inv.engine, Engine::Jsc);
    assert!(inv.verdict.instrument);
    assert_eq!(inv.verdict.reason, Reason::JscLinkStep);
    assert_eq!(inv.program, "/src/fuzz/afl/afl-clang-fast++");
}

/// Unrelated builds (configure probes, host tools) stay on the plain compiler
#[test]
fn test_scenario_unknown_build() {
    let inv = router(None)
        .route(&argv(&["/usr/local/proxy/clang", "-c", "conftest.c", "-fuse-ld=lld"]))
        .unwrap();
    assert_eq!(inv.engine, Engine::Unknown);
    assert!(!inv.verdict.instrument);
    assert_eq!(inv.argv, argv(&["clang", "-c", "conftest.c", "-fuse-ld=lld"]));
}

/// The pin is checked before any argument is inspected
#[test]
fn test_pin_beats_fingerprint() {
    let inv = router(Some(Engine::ChakraCore))
        .route(&argv(&[
            "clang++",
            "-c",
            "/src/v8/third_party/Runtime/Base/ThreadContext.cpp",
            "-fcomplete-member-pointers",
        ]))
        .unwrap();
    assert_eq!(inv.engine, Engine::ChakraCore);
    assert!(!inv.verdict.instrument);
    assert!(inv.argv.contains(&"-fcomplete-member-pointers".to_string()));
}

/// Records from several routers land as whole lines in the shared log
#[test]
fn test_append_log_collects_one_line_per_invocation() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("proxy.log");
    let router = router(None);

    let invocations = [
        argv(&["clang", "-c", "third_party/v8/a.cc", "-Wno-c99-designator"]),
        argv(&["clang++", "-c", "hello.cc"]),
    ];
    for args in &invocations {
        let inv = router.route(args).unwrap();
        let mut log = AppendLog::open(&log_path).unwrap();
        log.append(&inv.record()).unwrap();
    }

    let contents = fs::read_to_string(&log_path).unwrap();
    assert_eq!(
        contents,
        "/src/fuzz/afl/afl-clang-fast -c third_party/v8/a.cc\nclang++ -c hello.cc\n"
    );
}
