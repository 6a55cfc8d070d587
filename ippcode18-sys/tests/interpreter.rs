//! End-to-end tests that exercise the XML loader and the interpreter
//! together, the way the teacher project's `vm::test` module builds a
//! `VirtualMachine` over an in-memory buffer and asserts on its output.

use std::io::Cursor;

use ippcode18_sys::loader;
use ippcode18_sys::vm::{ExitType, VirtualMachine};

fn run(xml: &str, input: &str) -> (String, String, i32) {
    let program = loader::load(xml).expect("program should load");
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut vm = VirtualMachine::new(program, Cursor::new(input.as_bytes().to_vec()), &mut stdout, &mut stderr)
            .expect("vm should construct");
        vm.run()
    };
    let code = match exit {
        ExitType::Ok => 0,
        ExitType::Error(e) => e.exit_code(),
    };
    (String::from_utf8(stdout).unwrap(), String::from_utf8(stderr).unwrap(), code)
}

fn run_expect_load_error(xml: &str) -> i32 {
    loader::load(xml).expect_err("program should fail to load").exit_code()
}

#[test]
fn scenario_arithmetic() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
    <instruction order="2" opcode="MOVE"><arg1 type="var">GF@a</arg1><arg2 type="int">10</arg2></instruction>
    <instruction order="3" opcode="DEFVAR"><arg1 type="var">GF@b</arg1></instruction>
    <instruction order="4" opcode="MOVE"><arg1 type="var">GF@b</arg1><arg2 type="int">3</arg2></instruction>
    <instruction order="5" opcode="DEFVAR"><arg1 type="var">GF@c</arg1></instruction>
    <instruction order="6" opcode="IDIV"><arg1 type="var">GF@c</arg1><arg2 type="var">GF@a</arg2><arg3 type="var">GF@b</arg3></instruction>
    <instruction order="7" opcode="WRITE"><arg1 type="var">GF@c</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "");
    assert_eq!(stdout, "3\n");
    assert_eq!(code, 0);
}

#[test]
fn scenario_forward_jump() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="JUMP"><arg1 type="label">end</arg1></instruction>
    <instruction order="2" opcode="WRITE"><arg1 type="string">X</arg1></instruction>
    <instruction order="3" opcode="LABEL"><arg1 type="label">end</arg1></instruction>
    <instruction order="4" opcode="WRITE"><arg1 type="string">Y</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "");
    assert_eq!(stdout, "Y\n");
    assert_eq!(code, 0);
}

#[test]
fn scenario_call_return() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="CALL"><arg1 type="label">f</arg1></instruction>
    <instruction order="2" opcode="WRITE"><arg1 type="string">after</arg1></instruction>
    <instruction order="3" opcode="JUMP"><arg1 type="label">done</arg1></instruction>
    <instruction order="4" opcode="LABEL"><arg1 type="label">f</arg1></instruction>
    <instruction order="5" opcode="WRITE"><arg1 type="string">in</arg1></instruction>
    <instruction order="6" opcode="RETURN"></instruction>
    <instruction order="7" opcode="LABEL"><arg1 type="label">done</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "");
    assert_eq!(stdout, "in\nafter\n");
    assert_eq!(code, 0);
}

#[test]
fn scenario_frame_lifecycle() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="CREATEFRAME"></instruction>
    <instruction order="2" opcode="DEFVAR"><arg1 type="var">TF@v</arg1></instruction>
    <instruction order="3" opcode="MOVE"><arg1 type="var">TF@v</arg1><arg2 type="int">7</arg2></instruction>
    <instruction order="4" opcode="PUSHFRAME"></instruction>
    <instruction order="5" opcode="WRITE"><arg1 type="var">LF@v</arg1></instruction>
    <instruction order="6" opcode="POPFRAME"></instruction>
    <instruction order="7" opcode="WRITE"><arg1 type="var">TF@v</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "");
    assert_eq!(stdout, "7\n7\n");
    assert_eq!(code, 0);
}

#[test]
fn scenario_type_error() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@a</arg1></instruction>
    <instruction order="2" opcode="MOVE"><arg1 type="var">GF@a</arg1><arg2 type="int">1</arg2></instruction>
    <instruction order="3" opcode="DEFVAR"><arg1 type="var">GF@b</arg1></instruction>
    <instruction order="4" opcode="MOVE"><arg1 type="var">GF@b</arg1><arg2 type="string">hi</arg2></instruction>
    <instruction order="5" opcode="ADD"><arg1 type="var">GF@a</arg1><arg2 type="var">GF@a</arg2><arg3 type="var">GF@b</arg3></instruction>
</program>"#;
    let (_, _, code) = run(xml, "");
    assert_eq!(code, 53);
}

#[test]
fn scenario_division_by_zero() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@q</arg1></instruction>
    <instruction order="2" opcode="IDIV"><arg1 type="var">GF@q</arg1><arg2 type="int">5</arg2><arg3 type="int">0</arg3></instruction>
</program>"#;
    let (_, _, code) = run(xml, "");
    assert_eq!(code, 57);
}

#[test]
fn reads_input_and_writes_string() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="DEFVAR"><arg1 type="var">GF@name</arg1></instruction>
    <instruction order="2" opcode="READ"><arg1 type="var">GF@name</arg1><arg2 type="type">string</arg2></instruction>
    <instruction order="3" opcode="WRITE"><arg1 type="var">GF@name</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "Alice\n");
    assert_eq!(stdout, "Alice\n");
    assert_eq!(code, 0);
}

#[test]
fn dprint_and_write_interleave_on_separate_streams() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="DPRINT"><arg1 type="string">debug</arg1></instruction>
    <instruction order="2" opcode="WRITE"><arg1 type="string">out</arg1></instruction>
</program>"#;
    let (stdout, stderr, code) = run(xml, "");
    assert_eq!(stdout, "out\n");
    assert_eq!(stderr, "debug");
    assert_eq!(code, 0);
}

#[test]
fn extra_return_without_call_fails_56() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="RETURN"></instruction>
</program>"#;
    let (_, _, code) = run(xml, "");
    assert_eq!(code, 56);
}

#[test]
fn string_escape_decoded_on_load() {
    let xml = r#"<program language="IPPcode18">
    <instruction order="1" opcode="WRITE"><arg1 type="string">a\032b</arg1></instruction>
</program>"#;
    let (stdout, _, code) = run(xml, "");
    assert_eq!(stdout, "a b\n");
    assert_eq!(code, 0);
}

#[test]
fn wrong_language_attribute_rejected_at_load() {
    let xml = r#"<program language="notIPPcode18"></program>"#;
    assert_eq!(run_expect_load_error(xml), 52);
}

#[test]
fn reordered_instructions_with_same_orders_behave_identically() {
    let forward = r#"<program language="IPPcode18">
    <instruction order="1" opcode="WRITE"><arg1 type="string">A</arg1></instruction>
    <instruction order="2" opcode="WRITE"><arg1 type="string">B</arg1></instruction>
</program>"#;
    let reversed = r#"<program language="IPPcode18">
    <instruction order="2" opcode="WRITE"><arg1 type="string">B</arg1></instruction>
    <instruction order="1" opcode="WRITE"><arg1 type="string">A</arg1></instruction>
</program>"#;
    let (a, _, _) = run(forward, "");
    let (b, _, _) = run(reversed, "");
    assert_eq!(a, b);
    assert_eq!(a, "A\nB\n");
}
