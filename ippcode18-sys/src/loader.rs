use quick_xml::events::Event;
use quick_xml::Reader;

use crate::operand::{Operand, OperandKind};
use crate::program::{Instruction, Opcode, Program};
use crate::vm::error::{ErrorKind, RuntimeError};

fn malformed(detail: impl Into<String>) -> RuntimeError {
    RuntimeError::with_detail(ErrorKind::MalformedProgram, detail.into())
}

/// Decodes the IPPcode18 `\ddd` string escape (three decimal digits per
/// escaped Unicode code point), eagerly at load time per the language's
/// string-literal convention.
fn decode_escapes(raw: &str) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = (0..3).filter_map(|_| chars.next_if(char::is_ascii_digit)).collect();
        if digits.len() != 3 {
            return Err(malformed(format!("invalid escape in string literal `{raw}`")));
        }
        let code: u32 = digits.parse().map_err(|_| malformed(format!("invalid escape in string literal `{raw}`")))?;
        let ch = char::from_u32(code).ok_or_else(|| malformed(format!("invalid escape code point in `{raw}`")))?;
        out.push(ch);
    }
    Ok(out)
}

fn attr_value(e: &quick_xml::events::BytesStart, name: &str) -> Result<String, RuntimeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(err.to_string()))?;
        if attr.key.as_ref() == name.as_bytes() {
            return attr
                .unescape_value()
                .map(|v| v.into_owned())
                .map_err(|err| malformed(err.to_string()));
        }
    }
    Err(malformed(format!("missing `{name}` attribute")))
}

/// Parses a program from an IPPcode18 XML document. The in-memory tree walk
/// is hand-rolled on top of `quick_xml`'s pull parser (the crate itself is
/// an interchangeable choice of XML reader, per the specification).
pub fn load(xml: &str) -> Result<Program, RuntimeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut seen_root = false;
    let mut instructions: Vec<Instruction> = Vec::new();
    let mut seen_orders: Vec<u32> = Vec::new();

    // Active `instruction` element being built, and which arg slot (by tag
    // name, `arg1..arg3`) is currently open.
    let mut current: Option<(u32, Opcode, Vec<(u8, OperandKind, String)>)> = None;
    let mut current_arg: Option<(u8, OperandKind, String)> = None;

    let open_element = |e: &quick_xml::events::BytesStart,
                         seen_root: &mut bool,
                         seen_orders: &mut Vec<u32>,
                         current: &mut Option<(u32, Opcode, Vec<(u8, OperandKind, String)>)>,
                         current_arg: &mut Option<(u8, OperandKind, String)>|
     -> Result<(), RuntimeError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        if name.eq_ignore_ascii_case("program") {
            let language = attr_value(e, "language")?;
            if !language.eq_ignore_ascii_case("IPPcode18") {
                return Err(RuntimeError::with_detail(ErrorKind::LexicalOrSemantic, format!("unexpected language `{language}`")));
            }
            *seen_root = true;
        } else if name.eq_ignore_ascii_case("instruction") {
            let order_raw = attr_value(e, "order")?;
            let order: u32 = order_raw
                .parse()
                .ok()
                .filter(|&o: &u32| o > 0)
                .ok_or_else(|| malformed(format!("invalid order `{order_raw}`")))?;
            if seen_orders.contains(&order) {
                return Err(malformed(format!("duplicate instruction order {order}")));
            }
            seen_orders.push(order);
            let opcode_name = attr_value(e, "opcode")?;
            let opcode =
                Opcode::from_name(&opcode_name).ok_or_else(|| malformed(format!("unknown opcode `{opcode_name}`")))?;
            *current = Some((order, opcode, Vec::new()));
        } else if name.to_ascii_lowercase().starts_with("arg") {
            let slot: u8 = name[3..].parse().map_err(|_| malformed(format!("invalid argument element `{name}`")))?;
            let kind_raw = attr_value(e, "type")?;
            let kind =
                OperandKind::from_tag(&kind_raw).ok_or_else(|| malformed(format!("unknown operand type `{kind_raw}`")))?;
            *current_arg = Some((slot, kind, String::new()));
        } else {
            return Err(malformed(format!("unexpected element `{name}`")));
        }
        Ok(())
    };

    let close_element = |name: &str,
                          current: &mut Option<(u32, Opcode, Vec<(u8, OperandKind, String)>)>,
                          current_arg: &mut Option<(u8, OperandKind, String)>,
                          instructions: &mut Vec<Instruction>|
     -> Result<(), RuntimeError> {
        if name.to_ascii_lowercase().starts_with("arg") {
            if let Some((slot, kind, text)) = current_arg.take() {
                let decoded = if kind == OperandKind::Str { decode_escapes(&text)? } else { text };
                if let Some((_, _, args)) = current.as_mut() {
                    args.push((slot, kind, decoded));
                }
            }
        } else if name.eq_ignore_ascii_case("instruction") {
            if let Some((order, opcode, mut args)) = current.take() {
                args.sort_by_key(|(slot, _, _)| *slot);
                if args.len() != opcode.arity() {
                    return Err(malformed(format!(
                        "{opcode:?} at order {order} expects {expected} operand(s), got {actual}",
                        expected = opcode.arity(),
                        actual = args.len()
                    )));
                }
                let operands = args.into_iter().map(|(_, kind, raw)| Operand::new(kind, raw)).collect();
                instructions.push(Instruction { order, opcode, operands });
            }
        }
        Ok(())
    };

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| malformed(e.to_string()))? {
            Event::Start(e) => {
                open_element(&e, &mut seen_root, &mut seen_orders, &mut current, &mut current_arg)?;
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                open_element(&e, &mut seen_root, &mut seen_orders, &mut current, &mut current_arg)?;
                close_element(&name, &mut current, &mut current_arg, &mut instructions)?;
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = current_arg.as_mut() {
                    text.push_str(&t.unescape().map_err(|e| malformed(e.to_string()))?);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                close_element(&name, &mut current, &mut current_arg, &mut instructions)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(malformed("missing `program` root element with `language` attribute"));
    }

    Ok(Program::new(instructions))
}
