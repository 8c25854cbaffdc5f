//! Briloop JSON backend.
//!
//! Serializes a structured module into the block-structured Bril dialect:
//! `while` statements with a synthesized always-true guard, `if` statements
//! with `tru`/`fals` arms, nameless `block` statements, and `break`/
//! `continue` whose target depth is a synthesized integer constant passed as
//! the argument. Synthesized variable names are fresh per function.

use serde_json::{json, Map, Value};

use crate::ir::{Constant, Inst, Param, Stmt, StructuredFunction, StructuredModule, Type};

/// Fresh names for synthesized guards and depth constants, per function.
struct NameGen {
    next: u32,
}

impl NameGen {
    fn new() -> Self {
        NameGen { next: 0 }
    }

    fn fresh(&mut self) -> String {
        let name = format!("__v{}", self.next);
        self.next += 1;
        name
    }
}

/// Serializes a structured module to the Briloop JSON object.
pub fn emit_module(module: &StructuredModule) -> Value {
    json!({
        "functions": module
            .functions
            .iter()
            .map(emit_function)
            .collect::<Vec<Value>>(),
    })
}

/// Serializes a structured module to a JSON string.
pub fn emit_module_string(module: &StructuredModule, pretty: bool) -> String {
    let value = emit_module(module);
    if pretty {
        // Serialization of an in-memory value cannot fail.
        serde_json::to_string_pretty(&value).unwrap_or_default()
    } else {
        value.to_string()
    }
}

fn emit_function(func: &StructuredFunction) -> Value {
    let mut names = NameGen::new();
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(func.name));
    obj.insert(
        "args".to_string(),
        json!(func.params.iter().map(emit_param).collect::<Vec<Value>>()),
    );
    if let Some(ty) = func.return_ty {
        obj.insert("type".to_string(), json!(type_name(ty)));
    }
    obj.insert("instrs".to_string(), json!(emit_seq(&func.body, &mut names)));
    Value::Object(obj)
}

fn emit_param(param: &Param) -> Value {
    json!({ "name": param.name, "type": type_name(param.ty) })
}

fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::Int => "int",
        Type::Bool => "bool",
        Type::Float => "float",
    }
}

fn emit_seq(stmts: &[Stmt], names: &mut NameGen) -> Vec<Value> {
    let mut out = Vec::new();
    for stmt in stmts {
        match stmt {
            Stmt::Op(inst) => out.push(emit_inst(inst)),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                out.push(json!({
                    "op": "if",
                    "args": [cond],
                    "tru": emit_seq(then_body, names),
                    "fals": emit_seq(else_body, names),
                }));
            }
            Stmt::Loop { body } => {
                // `while` needs a guard variable; the loop exits only
                // through `break`, so the guard is a constant true.
                let guard = names.fresh();
                out.push(json!({
                    "op": "const",
                    "dest": guard,
                    "type": "bool",
                    "value": true,
                }));
                out.push(json!({
                    "op": "while",
                    "args": [guard],
                    "body": emit_seq(body, names),
                }));
            }
            Stmt::Block { body } => {
                out.push(json!({
                    "op": "block",
                    "body": emit_seq(body, names),
                }));
            }
            Stmt::Break { depth } => {
                let var = names.fresh();
                out.push(json!({
                    "op": "const",
                    "dest": var,
                    "type": "int",
                    "value": depth,
                }));
                out.push(json!({ "op": "break", "args": [var] }));
            }
            Stmt::Continue { depth } => {
                let var = names.fresh();
                out.push(json!({
                    "op": "const",
                    "dest": var,
                    "type": "int",
                    "value": depth,
                }));
                out.push(json!({ "op": "continue", "args": [var] }));
            }
            Stmt::Ret { value } => {
                out.push(match value {
                    Some(v) => json!({ "op": "ret", "args": [v] }),
                    None => json!({ "op": "ret" }),
                });
            }
        }
    }
    out
}

fn emit_inst(inst: &Inst) -> Value {
    match inst {
        Inst::Const { dest, ty, value } => {
            let value = match value {
                Constant::Int(v) => json!(v),
                Constant::Bool(v) => json!(v),
                Constant::Float(v) => json!(v),
            };
            json!({
                "op": "const",
                "dest": dest,
                "type": type_name(*ty),
                "value": value,
            })
        }
        Inst::Value {
            op,
            dest,
            ty,
            args,
            funcs,
        } => {
            let mut obj = Map::new();
            obj.insert("op".to_string(), json!(op.name()));
            obj.insert("dest".to_string(), json!(dest));
            obj.insert("type".to_string(), json!(type_name(*ty)));
            obj.insert("args".to_string(), json!(args));
            if !funcs.is_empty() {
                obj.insert("funcs".to_string(), json!(funcs));
            }
            Value::Object(obj)
        }
        Inst::Effect { op, args, funcs } => {
            let mut obj = Map::new();
            obj.insert("op".to_string(), json!(op.name()));
            obj.insert("args".to_string(), json!(args));
            if !funcs.is_empty() {
                obj.insert("funcs".to_string(), json!(funcs));
            }
            Value::Object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(body: Vec<Stmt>) -> StructuredModule {
        StructuredModule {
            functions: vec![StructuredFunction {
                name: "f".to_string(),
                params: vec![],
                return_ty: None,
                body,
            }],
        }
    }

    fn instrs(module: &StructuredModule) -> Vec<Value> {
        emit_module(module)["functions"][0]["instrs"]
            .as_array()
            .cloned()
            .unwrap()
    }

    #[test]
    fn loop_gets_a_true_guard() {
        let module = func(vec![Stmt::Loop {
            body: vec![Stmt::Break { depth: 0 }],
        }]);
        let instrs = instrs(&module);

        assert_eq!(instrs[0]["op"], "const");
        assert_eq!(instrs[0]["dest"], "__v0");
        assert_eq!(instrs[0]["type"], "bool");
        assert_eq!(instrs[0]["value"], true);
        assert_eq!(instrs[1]["op"], "while");
        assert_eq!(instrs[1]["args"][0], "__v0");

        let body = instrs[1]["body"].as_array().unwrap();
        assert_eq!(body[0]["op"], "const");
        assert_eq!(body[0]["value"], 0);
        assert_eq!(body[1]["op"], "break");
        assert_eq!(body[1]["args"][0], body[0]["dest"]);
    }

    #[test]
    fn if_arms_are_tru_and_fals() {
        let module = func(vec![Stmt::Block {
            body: vec![Stmt::If {
                cond: "c".to_string(),
                then_body: vec![Stmt::Break { depth: 1 }],
                else_body: vec![Stmt::Continue { depth: 1 }],
            }],
        }]);
        let instrs = instrs(&module);

        assert_eq!(instrs[0]["op"], "block");
        let body = instrs[0]["body"].as_array().unwrap();
        assert_eq!(body[0]["op"], "if");
        assert_eq!(body[0]["args"][0], "c");

        let tru = body[0]["tru"].as_array().unwrap();
        assert_eq!(tru[1]["op"], "break");
        assert_eq!(tru[0]["value"], 1);
        let fals = body[0]["fals"].as_array().unwrap();
        assert_eq!(fals[1]["op"], "continue");
        assert_eq!(fals[0]["value"], 1);
    }

    #[test]
    fn synthesized_names_are_function_local() {
        let mut module = func(vec![Stmt::Loop {
            body: vec![Stmt::Break { depth: 0 }],
        }]);
        module.functions.push(StructuredFunction {
            name: "g".to_string(),
            params: vec![],
            return_ty: None,
            body: vec![Stmt::Loop {
                body: vec![Stmt::Break { depth: 0 }],
            }],
        });

        let emitted = emit_module(&module);
        for f in emitted["functions"].as_array().unwrap() {
            assert_eq!(f["instrs"][0]["dest"], "__v0");
        }
    }

    #[test]
    fn return_type_is_omitted_for_void() {
        let module = func(vec![Stmt::Ret { value: None }]);
        let emitted = emit_module(&module);
        assert!(emitted["functions"][0].get("type").is_none());
        assert_eq!(emitted["functions"][0]["instrs"][0], json!({"op": "ret"}));
    }
}
