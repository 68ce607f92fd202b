//! Whole-script integration tests: the §8 scenarios driven through the
//! actual command-language parser and driver, not the `Coordinator` API
//! directly (that level is covered by `crates/coordinator/tests`).

use repcrec_cli::repl::run_lines;
use repcrec_coordinator::Coordinator;

fn run(script: &str) -> String {
    let mut coordinator = Coordinator::new();
    let mut out: Vec<u8> = Vec::new();
    run_lines(&mut coordinator, script.as_bytes(), &mut out);
    String::from_utf8(out).expect("output is valid utf8")
}

#[test]
fn scenario_1_symmetric_deadlock() {
    let output = run(
        "begin(T1)\n\
         begin(T2)\n\
         W(T1,x1,101)\n\
         W(T2,x2,202)\n\
         R(T1,x2)\n\
         R(T2,x1)\n\
         end(T1)\n\
         end(T2)\n\
         dump()\n",
    );
    assert!(output.contains("T2 aborts (deadlock)"));
    assert!(output.contains("T1 commits"));
    assert!(output.contains("x1: 101"));
}

#[test]
fn scenario_2_read_only_after_commit() {
    let output = run(
        "begin(T1)\n\
         W(T1,x6,66)\n\
         end(T1)\n\
         beginRO(T2)\n\
         R(T2,x6)\n\
         dump()\n",
    );
    assert!(output.contains("T1 commits"));
    assert!(output.contains("T2: x6 = 66"));
    assert!(output.contains("x6: 66"));
}

#[test]
fn scenario_3_site_failure_aborts_transaction() {
    let output = run(
        "begin(T1)\n\
         W(T1,x8,88)\n\
         fail(9)\n\
         end(T1)\n\
         dump()\n",
    );
    assert!(output.contains("T1 aborts (site failure)"));
    assert!(output.contains("x8: 80"));
}

#[test]
fn scenario_4_non_replicated_readable_after_recovery() {
    let output = run(
        "begin(T1)\n\
         R(T1,x1)\n\
         fail(2)\n\
         recover(2)\n\
         R(T1,x1)\n\
         end(T1)\n",
    );
    assert!(output.contains("T1: x1 = 10"));
    assert!(output.contains("T1 commits"));
}

#[test]
fn scenario_5_replicated_copy_unavailable_until_next_commit() {
    let output = run(
        "beginRO(T1)\n\
         fail(1)\n\
         recover(1)\n\
         R(T1,x2)\n\
         end(T1)\n",
    );
    assert!(output.contains("T1: x2 = 20"));
    assert!(output.contains("T1 commits"));
}

#[test]
fn scenario_6_promotion_blocks_then_proceeds() {
    let output = run(
        "begin(T1)\n\
         begin(T2)\n\
         R(T1,x4)\n\
         R(T2,x4)\n\
         W(T1,x4,44)\n\
         end(T2)\n\
         end(T1)\n\
         dump()\n",
    );
    assert!(output.contains("T2 commits"));
    assert!(output.contains("T1 writes x4 = 44"));
    assert!(output.contains("T1 commits"));
    assert!(output.contains("x4: 44"));
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let output = run(
        "// a header comment\n\
         \n\
         begin(T1) // inline comment\n\
         dump()\n",
    );
    assert!(output.contains("T1 begins"));
}

#[test]
fn terminator_line_halts_remaining_input() {
    let output = run(
        "begin(T1)\n\
         === stop here ===\n\
         W(T1,x2,999)\n",
    );
    assert!(output.contains("T1 begins"));
    assert!(!output.contains("writes"));
}

#[test]
fn invalid_command_is_reported_but_does_not_halt_the_script() {
    let output = run("nonsense(T1)\nbegin(T1)\ndump()\n");
    assert!(output.contains("ERROR"));
    assert!(output.contains("T1 begins"));
}
