//! Shared test utilities for skm.

pub mod fixtures;

/// Table-driven test case structure.
#[derive(Debug, Clone)]
pub struct TestCase<I, E> {
    pub name: &'static str,
    pub input: I,
    pub expected: E,
    pub should_panic: bool,
}

/// Run table-driven tests, printing each case so failures are easy to place.
pub fn run_table_tests<I, E, F>(cases: Vec<TestCase<I, E>>, test_fn: F)
where
    I: std::fmt::Debug + Clone,
    E: std::fmt::Debug + PartialEq,
    F: Fn(I) -> E,
{
    for case in cases {
        println!("[TEST] {} <- {:?}", case.name, case.input);

        let input = case.input.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test_fn(input)));

        if case.should_panic {
            assert!(result.is_err(), "case '{}' expected panic", case.name);
            continue;
        }

        let Ok(actual) = result else {
            panic!("case '{}' panicked unexpectedly", case.name);
        };
        assert_eq!(actual, case.expected, "case '{}' failed", case.name);
    }
}
