//! 条件语句组：if / elif / else 链
//!
//! 一个语句组内的语句按顺序尝试，第一个条件成立的语句触发其键，其余跳过。
//! 条件是 AND 组的 OR：任一 AND 组成立即成立；AND 组内所有比较成立才成立。
//! 没有 AND 组的语句无条件成立（else 分支）。
//!
//! 二进制布局见 logic 模块文档。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::codec::{put_u16_prefixed, u8_len, ByteReader};
use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::{MutableState, Variable};

/// 比较运算符（编译后为位标志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
}

impl Operator {
    pub fn as_byte(self) -> u8 {
        match self {
            Operator::Eq => 1,
            Operator::Lt => 1 << 1,
            Operator::Gt => 1 << 2,
            Operator::Le => 1 << 3,
            Operator::Ge => 1 << 4,
            Operator::Ne => 1 << 5,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, DecodeError> {
        match b {
            1 => Ok(Operator::Eq),
            2 => Ok(Operator::Lt),
            4 => Ok(Operator::Gt),
            8 => Ok(Operator::Le),
            16 => Ok(Operator::Ge),
            32 => Ok(Operator::Ne),
            other => Err(DecodeError::InvalidOperator(other)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Le => "le",
            Operator::Ge => "ge",
            Operator::Ne => "ne",
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::Ne)
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Le => ord != Ordering::Greater,
            Operator::Ge => ord != Ordering::Less,
            Operator::Ne => ord != Ordering::Equal,
        }
    }
}

/// 变量与常量的一次比较
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub variable: String,
    pub operator: Operator,
    pub value: Variable,
}

impl Comparison {
    pub fn new(variable: impl Into<String>, operator: Operator, value: Variable) -> Self {
        Self {
            variable: variable.into(),
            operator,
            value,
        }
    }

    /// int / string 支持全部运算符；bool / array 只支持 eq、ne；类型不一致为 TypeMismatch
    pub fn evaluate(&self, state: &MutableState) -> Result<bool, RuntimeError> {
        let current = state.variable(&self.variable)?;
        let mismatch = |expected: String| RuntimeError::TypeMismatch {
            variable: self.variable.clone(),
            expected,
            found: current.type_tag(),
        };
        if current.type_tag() != self.value.type_tag() {
            return Err(mismatch(self.value.type_tag().to_string()));
        }
        let ord = match (current, &self.value) {
            (Variable::Int(a), Variable::Int(b)) => a.cmp(b),
            (Variable::String(a), Variable::String(b)) => a.cmp(b),
            (a, b) if self.operator.is_equality() => {
                if a == b {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }
            _ => {
                return Err(mismatch(format!(
                    "int or string for '{}'",
                    self.operator.name()
                )))
            }
        };
        Ok(self.operator.holds(ord))
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.push(self.operator.as_byte());
        put_u16_prefixed(out, self.variable.as_bytes(), "comparison variable")?;
        self.value.encode_into(out)
    }

    fn decode_from(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let operator = Operator::from_byte(r.read_u8("comparison operator")?)?;
        let variable = r.read_str_u16("comparison variable")?;
        let value = Variable::decode_from(r)?;
        Ok(Self {
            variable,
            operator,
            value,
        })
    }
}

/// AND 组
pub type AndGroup = Vec<Comparison>;

/// 条件：AND 组的 OR；为空表示无条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub any: Vec<AndGroup>,
}

impl Condition {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn all(comparisons: AndGroup) -> Self {
        Self {
            any: vec![comparisons],
        }
    }

    pub fn is_unconditional(&self) -> bool {
        self.any.is_empty()
    }

    pub fn evaluate(&self, state: &MutableState) -> Result<bool, RuntimeError> {
        if self.is_unconditional() {
            return Ok(true);
        }
        for group in &self.any {
            let mut holds = true;
            for comparison in group {
                if !comparison.evaluate(state)? {
                    holds = false;
                    break;
                }
            }
            if holds {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// 条件 + 触发时交给调用方的 action bundle 键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub condition: Condition,
    pub key: String,
}

impl Statement {
    pub fn new(condition: Condition, key: impl Into<String>) -> Self {
        Self {
            condition,
            key: key.into(),
        }
    }
}

/// 语句组（if / elif / else 链）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementGroup {
    pub statements: Vec<Statement>,
}

impl StatementGroup {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// 返回第一个成立语句的键；都不成立时返回 None
    pub fn evaluate(&self, state: &MutableState) -> Result<Option<&str>, RuntimeError> {
        for statement in &self.statements {
            if statement.condition.evaluate(state)? {
                return Ok(Some(statement.key.as_str()));
            }
        }
        Ok(None)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        out.push(u8_len(self.statements.len(), "statement count")?);
        for statement in &self.statements {
            put_u16_prefixed(&mut out, statement.key.as_bytes(), "statement key")?;
            out.push(u8_len(statement.condition.any.len(), "or group count")?);
            for group in &statement.condition.any {
                out.push(u8_len(group.len(), "comparison count")?);
                for comparison in group {
                    comparison.encode_into(&mut out)?;
                }
            }
        }
        Ok(out)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(payload);
        let count = r.read_u8("statement count")?;
        let mut statements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = r.read_str_u16("statement key")?;
            let or_count = r.read_u8("or group count")?;
            let mut any = Vec::with_capacity(or_count as usize);
            for _ in 0..or_count {
                let and_count = r.read_u8("comparison count")?;
                let mut group = Vec::with_capacity(and_count as usize);
                for _ in 0..and_count {
                    group.push(Comparison::decode_from(&mut r)?);
                }
                any.push(group);
            }
            statements.push(Statement::new(Condition { any }, key));
        }
        r.expect_finished("statement group")?;
        Ok(Self { statements })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::VariableType;
    use uuid::Uuid;

    fn state() -> MutableState {
        let mut s = MutableState::new(Uuid::new_v4());
        s.declare("score", Variable::Int(7));
        s.declare("name", Variable::String("bob".into()));
        s.declare("lit", Variable::Bool(true));
        s
    }

    #[test]
    fn test_int_operators() {
        let s = state();
        let cases = [
            (Operator::Eq, 7, true),
            (Operator::Eq, 8, false),
            (Operator::Lt, 8, true),
            (Operator::Lt, 7, false),
            (Operator::Gt, 6, true),
            (Operator::Le, 7, true),
            (Operator::Le, 6, false),
            (Operator::Ge, 7, true),
            (Operator::Ge, 8, false),
            (Operator::Ne, 7, false),
            (Operator::Ne, 1, true),
        ];
        for (op, value, expected) in cases {
            let c = Comparison::new("score", op, Variable::Int(value));
            assert_eq!(c.evaluate(&s).unwrap(), expected, "{op:?} {value}");
        }
    }

    #[test]
    fn test_string_and_bool_comparisons() {
        let s = state();
        assert!(Comparison::new("name", Operator::Lt, Variable::String("carl".into()))
            .evaluate(&s)
            .unwrap());
        assert!(Comparison::new("lit", Operator::Eq, Variable::Bool(true))
            .evaluate(&s)
            .unwrap());
        assert!(Comparison::new("lit", Operator::Ne, Variable::Bool(false))
            .evaluate(&s)
            .unwrap());
        assert!(matches!(
            Comparison::new("lit", Operator::Gt, Variable::Bool(false)).evaluate(&s),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_comparison_type_mismatch_and_missing() {
        let s = state();
        assert_eq!(
            Comparison::new("score", Operator::Eq, Variable::String("7".into()))
                .evaluate(&s)
                .unwrap_err(),
            RuntimeError::TypeMismatch {
                variable: "score".into(),
                expected: "string".into(),
                found: VariableType::Int,
            }
        );
        assert_eq!(
            Comparison::new("ghost", Operator::Eq, Variable::Int(0))
                .evaluate(&s)
                .unwrap_err(),
            RuntimeError::MissingVariable("ghost".into())
        );
    }

    #[test]
    fn test_or_of_ands() {
        let s = state();
        let condition = Condition {
            any: vec![
                vec![
                    Comparison::new("score", Operator::Gt, Variable::Int(5)),
                    Comparison::new("lit", Operator::Eq, Variable::Bool(false)),
                ],
                vec![Comparison::new("name", Operator::Eq, Variable::String("bob".into()))],
            ],
        };
        assert!(condition.evaluate(&s).unwrap());

        let condition = Condition::all(vec![
            Comparison::new("score", Operator::Gt, Variable::Int(5)),
            Comparison::new("lit", Operator::Eq, Variable::Bool(false)),
        ]);
        assert!(!condition.evaluate(&s).unwrap());
        assert!(Condition::always().evaluate(&s).unwrap());
    }

    #[test]
    fn test_first_match_wins() {
        let s = state();
        let group = StatementGroup::new(vec![
            Statement::new(
                Condition::all(vec![Comparison::new("score", Operator::Gt, Variable::Int(10))]),
                "if",
            ),
            Statement::new(
                Condition::all(vec![Comparison::new("score", Operator::Gt, Variable::Int(5))]),
                "elif",
            ),
            Statement::new(Condition::always(), "else"),
        ]);
        assert_eq!(group.evaluate(&s).unwrap(), Some("elif"));
        assert_eq!(StatementGroup::default().evaluate(&s).unwrap(), None);
    }

    #[test]
    fn test_group_encoding() {
        let group = StatementGroup::new(vec![
            Statement::new(
                Condition {
                    any: vec![
                        vec![Comparison::new("score", Operator::Ge, Variable::Int(3))],
                        vec![],
                    ],
                },
                "k1",
            ),
            Statement::new(Condition::always(), "k2"),
        ]);
        let bytes = group.encode().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(StatementGroup::decode(&bytes).unwrap(), group);
    }

    #[test]
    fn test_invalid_operator_byte() {
        assert_eq!(Operator::from_byte(3).unwrap_err(), DecodeError::InvalidOperator(3));
    }
}
