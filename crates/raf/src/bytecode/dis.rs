//! Disassembler: renders a chunk as a human-readable listing.

use crate::bytecode::chunk::{Chunk, Const};

/// Renders the chunk header, constant pool, and instruction stream, then
/// recursively the chunk of every function prototype in the pool.
pub(crate) fn disassemble(chunk: &Chunk) -> String {
    let mut out = String::new();
    out.push_str(&format!("== {} ==\n", chunk.name));

    out.push_str("Constants:\n");
    for (i, constant) in chunk.consts.iter().enumerate() {
        out.push_str(&format!("  [{i:03}] {constant}\n"));
    }

    out.push_str("Code:\n");
    for (ip, ins) in chunk.code.iter().enumerate() {
        let loc = if ins.line != 0 || ins.col != 0 {
            format!("{}:{}", ins.line, ins.col)
        } else {
            "-".to_owned()
        };
        let op = ins.op.to_string();
        match (ins.a, ins.b) {
            (None, _) => out.push_str(&format!("{ip:04}  {loc:>6}  {op}\n")),
            (Some(a), None) => out.push_str(&format!("{ip:04}  {loc:>6}  {op:<14} {a}\n")),
            (Some(a), Some(b)) => out.push_str(&format!("{ip:04}  {loc:>6}  {op:<14} {a} {b}\n")),
        }
    }

    for constant in &chunk.consts {
        if let Const::Proto(proto) = constant {
            out.push('\n');
            out.push_str(&disassemble(&proto.chunk));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        bytecode::{chunk::Proto, op::Opcode},
        value::Value,
    };

    #[test]
    fn listing_contains_header_constants_and_code() {
        let mut chunk = Chunk::new("<module>", "".into(), None);
        let k = chunk.add_const(Const::Value(Value::Int(42)));
        chunk.emit(Opcode::Const, Some(k as i32), None, 1, 1);
        chunk.emit(Opcode::Ret, None, None, 0, 0);

        let listing = disassemble(&chunk);
        assert!(listing.starts_with("== <module> ==\n"));
        assert!(listing.contains("  [000] 42\n"));
        assert!(listing.contains("0000     1:1  CONST          0\n"));
        assert!(listing.contains("0001       -  RET\n"));
    }

    #[test]
    fn nested_function_chunks_are_listed() {
        let inner = Chunk::new("<fn f>", "".into(), None);
        let mut outer = Chunk::new("<module>", "".into(), None);
        outer.add_const(Const::Proto(Rc::new(Proto {
            name: "f".to_owned(),
            params: vec![],
            chunk: Rc::new(inner),
        })));

        let listing = disassemble(&outer);
        assert!(listing.contains("  [000] <fn f>\n"));
        assert!(listing.contains("== <fn f> ==\n"));
    }
}
