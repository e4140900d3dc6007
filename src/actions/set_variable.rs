//! SetVariable：对目标变量施加一次类型检查过的运算
//!
//! 负载：u16 前缀目标名 + 1 字节运算码 + 运算体。
//! 运算体：set/add/subtract/divide/multiply/modulo → 操作数；not → 空；
//! insert → u32 下标 + 操作数；delete → u32 下标；replace → u16 前缀 search + u16 前缀 replacement。
//! 操作数：1 字节种类（0 内联值 / 1 引用变量）+ 类型化值或 u16 前缀变量名。
//!
//! 执行是原子的：先计算新值，全部检查通过后才写回。

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionId, Followup};
use crate::codec::{put_u16_prefixed, ByteReader};
use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::{MutableState, SessionState, Variable, VariableType};

/// 操作数：内联值或另一个变量的引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Inline(Variable),
    Reference(String),
}

impl Operand {
    fn resolve<'a>(&'a self, state: &'a MutableState) -> Result<&'a Variable, RuntimeError> {
        match self {
            Operand::Inline(v) => Ok(v),
            Operand::Reference(name) => state.variable(name),
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match self {
            Operand::Inline(v) => {
                out.push(0);
                v.encode_into(out)
            }
            Operand::Reference(name) => {
                out.push(1);
                put_u16_prefixed(out, name.as_bytes(), "operand reference")
            }
        }
    }

    fn decode_from(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        match r.read_u8("operand kind")? {
            0 => Ok(Operand::Inline(Variable::decode_from(r)?)),
            1 => Ok(Operand::Reference(r.read_str_u16("operand reference")?)),
            other => Err(DecodeError::InvalidOperandKind(other)),
        }
    }
}

/// 变量运算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableOperation {
    /// 任意类型，操作数类型须与目标一致
    Set(Operand),
    /// int 加法 / string 拼接
    Add(Operand),
    Subtract(Operand),
    Divide(Operand),
    Multiply(Operand),
    Modulo(Operand),
    /// bool 取反
    Not,
    /// 数组在 index 处插入
    Insert { index: u32, value: Operand },
    /// 数组删除 index 处元素
    Delete { index: u32 },
    /// 字符串替换第一次出现的 search
    Replace { search: String, replace: String },
}

impl VariableOperation {
    pub fn code(&self) -> u8 {
        match self {
            VariableOperation::Set(_) => 0,
            VariableOperation::Add(_) => 1,
            VariableOperation::Subtract(_) => 2,
            VariableOperation::Divide(_) => 3,
            VariableOperation::Multiply(_) => 4,
            VariableOperation::Modulo(_) => 5,
            VariableOperation::Not => 6,
            VariableOperation::Insert { .. } => 7,
            VariableOperation::Delete { .. } => 8,
            VariableOperation::Replace { .. } => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariableOperation::Set(_) => "set",
            VariableOperation::Add(_) => "add",
            VariableOperation::Subtract(_) => "subtract",
            VariableOperation::Divide(_) => "divide",
            VariableOperation::Multiply(_) => "multiply",
            VariableOperation::Modulo(_) => "modulo",
            VariableOperation::Not => "not",
            VariableOperation::Insert { .. } => "insert",
            VariableOperation::Delete { .. } => "delete",
            VariableOperation::Replace { .. } => "replace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVariable {
    pub target: String,
    pub operation: VariableOperation,
}

impl SetVariable {
    pub fn new(target: impl Into<String>, operation: VariableOperation) -> Self {
        Self {
            target: target.into(),
            operation,
        }
    }

    fn mismatch(&self, expected: impl Into<String>, found: VariableType) -> RuntimeError {
        RuntimeError::TypeMismatch {
            variable: self.target.clone(),
            expected: expected.into(),
            found,
        }
    }

    /// 整数二元运算（subtract / divide / multiply / modulo / add 的 int 分支）
    fn int_op(
        &self,
        current: &Variable,
        operand: &Variable,
        f: fn(i64, i64) -> Option<i64>,
    ) -> Result<Variable, RuntimeError> {
        let Variable::Int(a) = current else {
            return Err(self.mismatch("int", current.type_tag()));
        };
        let Variable::Int(b) = operand else {
            return Err(self.mismatch("int", operand.type_tag()));
        };
        f(*a, *b)
            .map(Variable::Int)
            .ok_or_else(|| RuntimeError::ArithmeticOverflow(self.target.clone()))
    }

    /// 除法类运算：两侧均为 int 且除数为 0 时报 DivideByZero
    fn int_div(
        &self,
        current: &Variable,
        operand: &Variable,
        f: fn(i64, i64) -> Option<i64>,
    ) -> Result<Variable, RuntimeError> {
        if let (Variable::Int(_), Variable::Int(0)) = (current, operand) {
            return Err(RuntimeError::DivideByZero(self.target.clone()));
        }
        self.int_op(current, operand, f)
    }

    /// 计算新值，不修改状态
    fn apply(&self, state: &MutableState) -> Result<Variable, RuntimeError> {
        let current = state.variable(&self.target)?;
        match &self.operation {
            VariableOperation::Set(operand) => {
                let value = operand.resolve(state)?;
                if value.type_tag() != current.type_tag() {
                    return Err(self.mismatch(current.type_tag().to_string(), value.type_tag()));
                }
                Ok(value.clone())
            }
            VariableOperation::Add(operand) => {
                let value = operand.resolve(state)?;
                match (current, value) {
                    (Variable::Int(_), _) => self.int_op(current, value, i64::checked_add),
                    (Variable::String(a), Variable::String(b)) => {
                        Ok(Variable::String(format!("{a}{b}")))
                    }
                    (Variable::String(_), other) => Err(self.mismatch("string", other.type_tag())),
                    (other, _) => Err(self.mismatch("int or string", other.type_tag())),
                }
            }
            VariableOperation::Subtract(operand) => {
                self.int_op(current, operand.resolve(state)?, i64::checked_sub)
            }
            VariableOperation::Multiply(operand) => {
                self.int_op(current, operand.resolve(state)?, i64::checked_mul)
            }
            VariableOperation::Divide(operand) => {
                self.int_div(current, operand.resolve(state)?, i64::checked_div)
            }
            VariableOperation::Modulo(operand) => {
                self.int_div(current, operand.resolve(state)?, i64::checked_rem)
            }
            VariableOperation::Not => match current {
                Variable::Bool(b) => Ok(Variable::Bool(!b)),
                other => Err(self.mismatch("bool", other.type_tag())),
            },
            VariableOperation::Insert { index, value } => {
                let Variable::Array(items) = current else {
                    return Err(self.mismatch("array", current.type_tag()));
                };
                let index = *index as usize;
                if index > items.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        variable: self.target.clone(),
                        index,
                        len: items.len(),
                    });
                }
                let mut items = items.clone();
                items.insert(index, value.resolve(state)?.clone());
                Ok(Variable::Array(items))
            }
            VariableOperation::Delete { index } => {
                let Variable::Array(items) = current else {
                    return Err(self.mismatch("array", current.type_tag()));
                };
                let index = *index as usize;
                if index >= items.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        variable: self.target.clone(),
                        index,
                        len: items.len(),
                    });
                }
                let mut items = items.clone();
                items.remove(index);
                Ok(Variable::Array(items))
            }
            VariableOperation::Replace { search, replace } => match current {
                Variable::String(s) => Ok(Variable::String(s.replacen(search.as_str(), replace, 1))),
                other => Err(self.mismatch("string", other.type_tag())),
            },
        }
    }
}

impl Action for SetVariable {
    const ID: ActionId = ActionId::SetVariable;

    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        put_u16_prefixed(&mut out, self.target.as_bytes(), "variable target")?;
        out.push(self.operation.code());
        match &self.operation {
            VariableOperation::Set(operand)
            | VariableOperation::Add(operand)
            | VariableOperation::Subtract(operand)
            | VariableOperation::Divide(operand)
            | VariableOperation::Multiply(operand)
            | VariableOperation::Modulo(operand) => operand.encode_into(&mut out)?,
            VariableOperation::Not => {}
            VariableOperation::Insert { index, value } => {
                out.extend_from_slice(&index.to_le_bytes());
                value.encode_into(&mut out)?;
            }
            VariableOperation::Delete { index } => out.extend_from_slice(&index.to_le_bytes()),
            VariableOperation::Replace { search, replace } => {
                put_u16_prefixed(&mut out, search.as_bytes(), "replace search")?;
                put_u16_prefixed(&mut out, replace.as_bytes(), "replace replacement")?;
            }
        }
        Ok(out)
    }

    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(payload);
        let target = r.read_str_u16("variable target")?;
        let operation = match r.read_u8("variable operation")? {
            0 => VariableOperation::Set(Operand::decode_from(&mut r)?),
            1 => VariableOperation::Add(Operand::decode_from(&mut r)?),
            2 => VariableOperation::Subtract(Operand::decode_from(&mut r)?),
            3 => VariableOperation::Divide(Operand::decode_from(&mut r)?),
            4 => VariableOperation::Multiply(Operand::decode_from(&mut r)?),
            5 => VariableOperation::Modulo(Operand::decode_from(&mut r)?),
            6 => VariableOperation::Not,
            7 => VariableOperation::Insert {
                index: r.read_u32("insert index")?,
                value: Operand::decode_from(&mut r)?,
            },
            8 => VariableOperation::Delete {
                index: r.read_u32("delete index")?,
            },
            9 => VariableOperation::Replace {
                search: r.read_str_u16("replace search")?,
                replace: r.read_str_u16("replace replacement")?,
            },
            other => return Err(DecodeError::InvalidOperation(other)),
        };
        r.expect_finished("set variable")?;
        Ok(Self { target, operation })
    }

    fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError> {
        let value = self.apply(&session.state).inspect_err(|e| {
            tracing::warn!(
                variable = %self.target,
                operation = self.operation.name(),
                error = %e,
                "set variable rejected"
            );
        })?;
        session.state.variables.insert(self.target.clone(), value);
        Ok(Followup::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> SessionState {
        let mut s = SessionState::new(Uuid::new_v4());
        s.state.declare("score", Variable::Int(10));
        s.state.declare("bonus", Variable::Int(3));
        s.state.declare("name", Variable::String("Ada".into()));
        s.state.declare("lit", Variable::Bool(false));
        s.state
            .declare("bag", Variable::Array(vec![Variable::Int(1), Variable::Int(2)]));
        s
    }

    fn run(target: &str, op: VariableOperation) -> (SessionState, Result<Followup, RuntimeError>) {
        let mut s = session();
        let result = SetVariable::new(target, op).execute(&mut s);
        (s, result)
    }

    fn inline(v: Variable) -> Operand {
        Operand::Inline(v)
    }

    #[test]
    fn test_every_operation_round_trips() {
        let ops = vec![
            VariableOperation::Set(inline(Variable::String("x".into()))),
            VariableOperation::Add(Operand::Reference("bonus".into())),
            VariableOperation::Subtract(inline(Variable::Int(-4))),
            VariableOperation::Divide(inline(Variable::Int(2))),
            VariableOperation::Multiply(inline(Variable::Int(5))),
            VariableOperation::Modulo(inline(Variable::Int(3))),
            VariableOperation::Not,
            VariableOperation::Insert {
                index: 1,
                value: inline(Variable::Array(vec![Variable::Bool(true)])),
            },
            VariableOperation::Delete { index: 0 },
            VariableOperation::Replace {
                search: "a".into(),
                replace: "b".into(),
            },
        ];
        for op in ops {
            let action = SetVariable::new("target", op);
            let bytes = action.encode().unwrap();
            assert_eq!(SetVariable::decode(&bytes).unwrap(), action);
        }
    }

    #[test]
    fn test_decode_rejects_trailing_and_bad_codes() {
        let mut bytes = SetVariable::new("lit", VariableOperation::Not).encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            SetVariable::decode(&bytes),
            Err(DecodeError::TrailingBytes { .. })
        ));

        let mut bad = Vec::new();
        put_u16_prefixed(&mut bad, b"x", "t").unwrap();
        bad.push(42);
        assert_eq!(
            SetVariable::decode(&bad).unwrap_err(),
            DecodeError::InvalidOperation(42)
        );
    }

    #[test]
    fn test_set_requires_matching_type() {
        let (s, r) = run("score", VariableOperation::Set(inline(Variable::Int(99))));
        r.unwrap();
        assert_eq!(s.state.variables["score"], Variable::Int(99));

        let (s, r) = run("score", VariableOperation::Set(Operand::Reference("name".into())));
        assert!(matches!(r, Err(RuntimeError::TypeMismatch { .. })));
        assert_eq!(s.state.variables["score"], Variable::Int(10));
    }

    #[test]
    fn test_add_int_and_string() {
        let (s, r) = run("score", VariableOperation::Add(Operand::Reference("bonus".into())));
        r.unwrap();
        assert_eq!(s.state.variables["score"], Variable::Int(13));

        let (s, r) = run("name", VariableOperation::Add(inline(Variable::String(" L.".into()))));
        r.unwrap();
        assert_eq!(s.state.variables["name"], Variable::String("Ada L.".into()));
    }

    #[test]
    fn test_add_on_bool_is_type_mismatch() {
        let (s, r) = run("lit", VariableOperation::Add(inline(Variable::Bool(true))));
        assert_eq!(
            r.unwrap_err(),
            RuntimeError::TypeMismatch {
                variable: "lit".into(),
                expected: "int or string".into(),
                found: VariableType::Bool,
            }
        );
        assert_eq!(s.state.variables["lit"], Variable::Bool(false));
    }

    #[test]
    fn test_int_only_operations() {
        let (s, _) = run("score", VariableOperation::Subtract(inline(Variable::Int(4))));
        assert_eq!(s.state.variables["score"], Variable::Int(6));
        let (s, _) = run("score", VariableOperation::Multiply(inline(Variable::Int(4))));
        assert_eq!(s.state.variables["score"], Variable::Int(40));
        let (s, _) = run("score", VariableOperation::Divide(inline(Variable::Int(4))));
        assert_eq!(s.state.variables["score"], Variable::Int(2));
        let (s, _) = run("score", VariableOperation::Modulo(inline(Variable::Int(4))));
        assert_eq!(s.state.variables["score"], Variable::Int(2));

        let (s, r) = run("name", VariableOperation::Subtract(inline(Variable::Int(1))));
        assert!(matches!(r, Err(RuntimeError::TypeMismatch { .. })));
        assert_eq!(s.state.variables["name"], Variable::String("Ada".into()));
    }

    #[test]
    fn test_divide_by_zero_and_overflow() {
        let (s, r) = run("score", VariableOperation::Divide(inline(Variable::Int(0))));
        assert_eq!(r.unwrap_err(), RuntimeError::DivideByZero("score".into()));
        assert_eq!(s.state.variables["score"], Variable::Int(10));

        let (_, r) = run("score", VariableOperation::Modulo(inline(Variable::String("0".into()))));
        assert!(matches!(r, Err(RuntimeError::TypeMismatch { .. })));

        let (_, r) = run("score", VariableOperation::Multiply(inline(Variable::Int(i64::MAX))));
        assert_eq!(r.unwrap_err(), RuntimeError::ArithmeticOverflow("score".into()));
    }

    #[test]
    fn test_not() {
        let (s, _) = run("lit", VariableOperation::Not);
        assert_eq!(s.state.variables["lit"], Variable::Bool(true));
        let (_, r) = run("score", VariableOperation::Not);
        assert!(matches!(r, Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_insert_and_delete() {
        let (s, _) = run(
            "bag",
            VariableOperation::Insert {
                index: 2,
                value: inline(Variable::Int(3)),
            },
        );
        assert_eq!(
            s.state.variables["bag"],
            Variable::Array(vec![Variable::Int(1), Variable::Int(2), Variable::Int(3)])
        );

        let (s, _) = run("bag", VariableOperation::Delete { index: 0 });
        assert_eq!(s.state.variables["bag"], Variable::Array(vec![Variable::Int(2)]));

        let (s, r) = run("bag", VariableOperation::Delete { index: 2 });
        assert_eq!(
            r.unwrap_err(),
            RuntimeError::IndexOutOfRange {
                variable: "bag".into(),
                index: 2,
                len: 2,
            }
        );
        assert_eq!(
            s.state.variables["bag"],
            Variable::Array(vec![Variable::Int(1), Variable::Int(2)])
        );

        let (_, r) = run(
            "bag",
            VariableOperation::Insert {
                index: 3,
                value: inline(Variable::Int(0)),
            },
        );
        assert!(matches!(r, Err(RuntimeError::IndexOutOfRange { index: 3, .. })));
    }

    #[test]
    fn test_replace_first_occurrence() {
        let mut s = session();
        s.state.declare("path", Variable::String("a-a-a".into()));
        SetVariable::new(
            "path",
            VariableOperation::Replace {
                search: "a".into(),
                replace: "b".into(),
            },
        )
        .execute(&mut s)
        .unwrap();
        assert_eq!(s.state.variables["path"], Variable::String("b-a-a".into()));
    }

    #[test]
    fn test_missing_target_and_reference() {
        let (_, r) = run("ghost", VariableOperation::Not);
        assert_eq!(r.unwrap_err(), RuntimeError::MissingVariable("ghost".into()));
        let (_, r) = run("score", VariableOperation::Add(Operand::Reference("ghost".into())));
        assert_eq!(r.unwrap_err(), RuntimeError::MissingVariable("ghost".into()));
    }
}
