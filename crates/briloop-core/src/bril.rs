//! Bril JSON frontend.
//!
//! Parses the textual JSON form of a Bril program and forms basic blocks: a
//! label starts a new block, and `jmp`/`br`/`ret` ends the current one.
//! Label operands are resolved to block ids in a second pass, so forward
//! references work.

use std::collections::HashMap;

use serde::Deserialize;

use crate::entity::{EntityRef, PrimaryMap};
use crate::error::CoreError;
use crate::ir::{
    Block, BlockId, Constant, EffectOp, Function, Inst, Module, Param, Terminator, Type, ValueOp,
};

#[derive(Debug, Deserialize)]
struct JsonProgram {
    functions: Vec<JsonFunction>,
}

#[derive(Debug, Deserialize)]
struct JsonFunction {
    name: String,
    #[serde(default)]
    args: Vec<Param>,
    #[serde(rename = "type")]
    return_ty: Option<Type>,
    #[serde(default)]
    instrs: Vec<JsonInstr>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonInstr {
    Label { label: String },
    Op(JsonOp),
}

#[derive(Debug, Deserialize)]
struct JsonOp {
    op: String,
    dest: Option<String>,
    #[serde(rename = "type")]
    ty: Option<Type>,
    value: Option<serde_json::Value>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    funcs: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
}

/// A terminator whose targets are still label names.
enum PendingTerm {
    Jmp(String),
    Br(String, String, String),
    Ret(Option<String>),
}

struct PendingBlock {
    label: Option<String>,
    insts: Vec<Inst>,
    term: Option<PendingTerm>,
}

/// Parses a Bril program from its JSON text.
pub fn parse_program(text: &str) -> Result<Module, CoreError> {
    let program: JsonProgram =
        serde_json::from_str(text).map_err(|e| CoreError::MalformedProgram {
            detail: format!("invalid Bril JSON: {e}"),
        })?;

    let mut module = Module::new();
    for func in program.functions {
        module.functions.push(convert_function(func)?);
    }
    Ok(module)
}

fn convert_function(func: JsonFunction) -> Result<Function, CoreError> {
    let malformed = |detail: String| CoreError::MalformedProgram { detail };

    // Pass 1: split the instruction stream into blocks.
    let mut pending: Vec<PendingBlock> = Vec::new();
    let mut current = PendingBlock {
        label: None,
        insts: Vec::new(),
        term: None,
    };
    for instr in func.instrs {
        match instr {
            JsonInstr::Label { label } => {
                // A label always opens a fresh block, even right after one.
                pending.push(current);
                current = PendingBlock {
                    label: Some(label),
                    insts: Vec::new(),
                    term: None,
                };
            }
            JsonInstr::Op(op) => {
                if let Some(term) = convert_terminator(&func.name, &op)? {
                    current.term = Some(term);
                    pending.push(current);
                    current = PendingBlock {
                        label: None,
                        insts: Vec::new(),
                        term: None,
                    };
                } else {
                    current.insts.push(convert_inst(&func.name, op)?);
                }
            }
        }
    }
    pending.push(current);

    // Drop the synthetic unlabeled blocks that split points leave empty,
    // keeping the entry even when empty (a function may begin with a label).
    pending.retain(|b| {
        b.label.is_some() || !b.insts.is_empty() || b.term.is_some()
    });
    if pending.is_empty() {
        pending.push(PendingBlock {
            label: None,
            insts: Vec::new(),
            term: None,
        });
    }

    // Pass 2: resolve label operands.
    let mut labels: HashMap<&str, BlockId> = HashMap::new();
    for (i, block) in pending.iter().enumerate() {
        if let Some(label) = &block.label {
            if labels.insert(label.as_str(), BlockId::new(i)).is_some() {
                return Err(malformed(format!(
                    "function @{}: duplicate label .{label}",
                    func.name
                )));
            }
        }
    }
    let resolve = |label: &str| -> Result<BlockId, CoreError> {
        labels
            .get(label)
            .copied()
            .ok_or_else(|| CoreError::MalformedCfg {
                function: func.name.clone(),
                detail: format!("branch to unknown label .{label}"),
            })
    };

    let mut blocks: PrimaryMap<BlockId, Block> = PrimaryMap::with_capacity(pending.len());
    for block in &pending {
        let term = match &block.term {
            Some(PendingTerm::Jmp(target)) => Some(Terminator::Jmp {
                target: resolve(target)?,
            }),
            Some(PendingTerm::Br(cond, then_label, else_label)) => Some(Terminator::Br {
                cond: cond.clone(),
                then_target: resolve(then_label)?,
                else_target: resolve(else_label)?,
            }),
            Some(PendingTerm::Ret(value)) => Some(Terminator::Ret {
                value: value.clone(),
            }),
            None => None,
        };
        blocks.push(Block {
            label: block.label.clone(),
            insts: block.insts.clone(),
            term,
        });
    }

    Ok(Function {
        name: func.name,
        params: func.args,
        return_ty: func.return_ty,
        blocks,
        entry: BlockId::new(0),
    })
}

fn convert_terminator(func: &str, op: &JsonOp) -> Result<Option<PendingTerm>, CoreError> {
    let malformed = |detail: String| CoreError::MalformedProgram { detail };
    match op.op.as_str() {
        "jmp" => match op.labels.as_slice() {
            [target] => Ok(Some(PendingTerm::Jmp(target.clone()))),
            _ => Err(malformed(format!(
                "function @{func}: jmp takes exactly one label"
            ))),
        },
        "br" => {
            let cond = op.args.first().ok_or_else(|| {
                malformed(format!("function @{func}: br needs a condition argument"))
            })?;
            match op.labels.as_slice() {
                [then_label, else_label] => Ok(Some(PendingTerm::Br(
                    cond.clone(),
                    then_label.clone(),
                    else_label.clone(),
                ))),
                _ => Err(malformed(format!(
                    "function @{func}: br takes exactly two labels"
                ))),
            }
        }
        "ret" => Ok(Some(PendingTerm::Ret(op.args.first().cloned()))),
        _ => Ok(None),
    }
}

fn convert_inst(func: &str, op: JsonOp) -> Result<Inst, CoreError> {
    let malformed = |detail: String| CoreError::MalformedProgram { detail };
    let opcode = op.op.as_str();

    if opcode == "const" {
        let dest = op
            .dest
            .ok_or_else(|| malformed(format!("function @{func}: const without dest")))?;
        let ty = op
            .ty
            .ok_or_else(|| malformed(format!("function @{func}: const {dest} without type")))?;
        let raw = op
            .value
            .ok_or_else(|| malformed(format!("function @{func}: const {dest} without value")))?;
        let value = match (ty, &raw) {
            (Type::Int, serde_json::Value::Number(n)) if n.is_i64() => {
                Constant::Int(n.as_i64().unwrap_or_default())
            }
            (Type::Bool, serde_json::Value::Bool(b)) => Constant::Bool(*b),
            // Bril float literals may be written without a decimal point.
            (Type::Float, serde_json::Value::Number(n)) => {
                Constant::Float(n.as_f64().unwrap_or_default())
            }
            _ => {
                return Err(malformed(format!(
                    "function @{func}: const {dest} has a {ty} type but value {raw}"
                )));
            }
        };
        return Ok(Inst::Const { dest, ty, value });
    }

    let value_op = match opcode {
        "add" => Some(ValueOp::Add),
        "sub" => Some(ValueOp::Sub),
        "mul" => Some(ValueOp::Mul),
        "div" => Some(ValueOp::Div),
        "eq" => Some(ValueOp::Eq),
        "lt" => Some(ValueOp::Lt),
        "gt" => Some(ValueOp::Gt),
        "le" => Some(ValueOp::Le),
        "ge" => Some(ValueOp::Ge),
        "not" => Some(ValueOp::Not),
        "and" => Some(ValueOp::And),
        "or" => Some(ValueOp::Or),
        "id" => Some(ValueOp::Id),
        // `call` with a dest is a value op, without one an effect.
        "call" if op.dest.is_some() => Some(ValueOp::Call),
        _ => None,
    };
    if let Some(value_op) = value_op {
        let dest = op.dest.ok_or_else(|| {
            malformed(format!("function @{func}: {opcode} without dest"))
        })?;
        let ty = op.ty.ok_or_else(|| {
            malformed(format!("function @{func}: {opcode} {dest} without type"))
        })?;
        return Ok(Inst::Value {
            op: value_op,
            dest,
            ty,
            args: op.args,
            funcs: op.funcs,
        });
    }

    let effect_op = match opcode {
        "print" => EffectOp::Print,
        "call" => EffectOp::Call,
        "nop" => EffectOp::Nop,
        _ => {
            return Err(malformed(format!(
                "function @{func}: unsupported opcode `{opcode}`"
            )));
        }
    };
    Ok(Inst::Effect {
        op: effect_op,
        args: op.args,
        funcs: op.funcs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn parses_blocks_and_resolves_labels() {
        let text = r#"{
          "functions": [{
            "name": "main",
            "instrs": [
              {"op": "const", "dest": "c", "type": "bool", "value": true},
              {"op": "br", "args": ["c"], "labels": ["then", "else"]},
              {"label": "then"},
              {"op": "const", "dest": "x", "type": "int", "value": 1},
              {"op": "jmp", "labels": ["done"]},
              {"label": "else"},
              {"op": "const", "dest": "x", "type": "int", "value": 2},
              {"label": "done"},
              {"op": "print", "args": ["x"]}
            ]
          }]
        }"#;

        let module = parse_program(text).unwrap();
        let func = module.function_by_name("main").unwrap();
        assert_eq!(func.blocks.len(), 4);

        let entry = &func.blocks[func.entry];
        assert_eq!(entry.insts.len(), 1);
        let Some(Terminator::Br {
            then_target,
            else_target,
            ..
        }) = &entry.term
        else {
            panic!("entry should end in br");
        };
        assert_eq!(func.blocks[*then_target].label.as_deref(), Some("then"));
        assert_eq!(func.blocks[*else_target].label.as_deref(), Some("else"));

        // `else` has no terminator: it falls through to `done`.
        let else_block = &func.blocks[*else_target];
        assert!(else_block.term.is_none());
        assert_eq!(
            func.blocks[BlockId::new(else_target.index() + 1)]
                .label
                .as_deref(),
            Some("done")
        );
    }

    #[test]
    fn function_header_round_trips() {
        let text = r#"{
          "functions": [{
            "name": "f",
            "args": [{"name": "n", "type": "int"}],
            "type": "int",
            "instrs": [{"op": "ret", "args": ["n"]}]
          }]
        }"#;
        let module = parse_program(text).unwrap();
        let func = module.function_by_name("f").unwrap();
        assert_eq!(func.params.len(), 1);
        assert_eq!(func.params[0].name, "n");
        assert_eq!(func.params[0].ty, Type::Int);
        assert_eq!(func.return_ty, Some(Type::Int));
    }

    #[test]
    fn unknown_label_is_a_cfg_error() {
        let text = r#"{
          "functions": [{
            "name": "f",
            "instrs": [{"op": "jmp", "labels": ["nowhere"]}]
          }]
        }"#;
        assert!(matches!(
            parse_program(text),
            Err(CoreError::MalformedCfg { .. })
        ));
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let text = r#"{
          "functions": [{
            "name": "f",
            "instrs": [{"op": "alloc", "dest": "p", "type": "int", "args": ["n"]}]
          }]
        }"#;
        assert!(matches!(
            parse_program(text),
            Err(CoreError::MalformedProgram { .. })
        ));
    }

    #[test]
    fn const_value_must_match_type() {
        let text = r#"{
          "functions": [{
            "name": "f",
            "instrs": [{"op": "const", "dest": "x", "type": "int", "value": true}]
          }]
        }"#;
        assert!(matches!(
            parse_program(text),
            Err(CoreError::MalformedProgram { .. })
        ));
    }

    #[test]
    fn call_with_dest_is_a_value_op() {
        let text = r#"{
          "functions": [{
            "name": "f",
            "instrs": [
              {"op": "call", "dest": "r", "type": "int", "funcs": ["g"], "args": []},
              {"op": "call", "funcs": ["g"], "args": []}
            ]
          }]
        }"#;
        let module = parse_program(text).unwrap();
        let func = module.function_by_name("f").unwrap();
        let block = &func.blocks[func.entry];
        assert!(matches!(
            block.insts[0],
            Inst::Value {
                op: ValueOp::Call,
                ..
            }
        ));
        assert!(matches!(
            block.insts[1],
            Inst::Effect {
                op: EffectOp::Call,
                ..
            }
        ));
    }
}
