//! Evaluation of parameter declarations into [`Value`]s.
//!
//! Two classes of failure are kept apart. A malformed expression (wrong
//! arity, an operator where an operand belongs, arithmetic on a kind with no
//! defined coercion) is a structural error and aborts the render. Data that
//! merely has an unexpected shape (a missing variable, an unknown tag, a
//! non-array right side of `in`) degrades to `null`, `false` or zero.

use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    context::{Context, UserInfo},
    error::{StencilError, StencilResult},
    parameter::{Constant, Keyword, Operator, Parameter, ParameterDeclaration, TagCall},
    tag::{TagContext, TagRegistry},
    value::Value,
};

/// Resolves parameter declarations against a data environment and a tag
/// registry.
#[derive(Debug, Clone, Copy)]
pub struct ParameterResolver<'a> {
    data: &'a Context,
    tags: &'a TagRegistry,
    user_info: &'a UserInfo,
}

impl<'a> ParameterResolver<'a> {
    pub const fn new(data: &'a Context, tags: &'a TagRegistry, user_info: &'a UserInfo) -> Self {
        Self {
            data,
            tags,
            user_info,
        }
    }

    /// Resolves every declaration, left to right.
    pub fn resolve_all(&self, params: &[ParameterDeclaration]) -> StencilResult<Vec<Value>> {
        params.iter().map(|param| self.resolve(param)).collect()
    }

    pub fn resolve(&self, declaration: &ParameterDeclaration) -> StencilResult<Value> {
        match declaration {
            ParameterDeclaration::Expression(expression) => self.resolve_expression(expression),
            ParameterDeclaration::Parameter(param) => self.resolve_parameter(param),
            ParameterDeclaration::Tag(tag) => self.resolve_tag(tag),
        }
    }

    /// Invokes a tag with its parameters resolved. A tag missing from the
    /// registry resolves to `null`.
    pub fn resolve_tag(&self, call: &TagCall) -> StencilResult<Value> {
        let parameters = self.resolve_all(&call.params)?;
        let Some(tag) = self.tags.get(&call.name) else {
            tracing::trace!(tag = %call.name, "unknown tag resolved to null");
            return Ok(Value::Null);
        };

        let ctx = TagContext {
            parameters,
            data: self.data,
            body: call.body.as_deref(),
            user_info: self.user_info,
        };
        tag.render(&ctx).map_err(|source| StencilError::Tag {
            name: call.name.clone(),
            source,
        })
    }

    fn resolve_parameter(&self, param: &Parameter) -> StencilResult<Value> {
        match param {
            Parameter::Constant(Constant::Int(i)) => Ok(Value::Int(*i)),
            Parameter::Constant(Constant::Double(d)) => Ok(Value::Double(*d)),
            Parameter::StringLiteral(s) => Ok(Value::String(s.clone())),
            Parameter::Variable(path) => Ok(self.data.get_path(path).cloned().unwrap_or_default()),
            Parameter::Keyword(keyword) => match keyword {
                Keyword::SelfKeyword => Ok(self.data.to_value()),
                Keyword::Nil => Ok(Value::Null),
                Keyword::True | Keyword::Yes => Ok(Value::Bool(true)),
                Keyword::False | Keyword::No => Ok(Value::Bool(false)),
                Keyword::In => Err(StencilError::evaluation(format!(
                    "unexpected keyword `{keyword}` in value position"
                ))),
            },
            Parameter::Operator(operator) => Err(StencilError::evaluation(format!(
                "unexpected operator `{operator}` in value position"
            ))),
        }
    }

    fn resolve_expression(&self, expression: &[ParameterDeclaration]) -> StencilResult<Value> {
        match expression {
            [single] => self.resolve(single),
            [op, operand] => match (op.as_operator(), operand.as_operator()) {
                (Some(Operator::Not), None) => {
                    let rhs = self.resolve(operand)?;
                    Ok(Value::Bool(!rhs.truthy()))
                }
                (Some(Operator::Not), Some(operator)) => Err(StencilError::evaluation(format!(
                    "unexpected operator `{operator}` in value position in `{}`",
                    display(expression)
                ))),
                (Some(operator), _) => Err(StencilError::evaluation(format!(
                    "unary operator `{operator}` is not supported in `{}`",
                    display(expression)
                ))),
                (None, Some(_)) => Err(StencilError::evaluation(format!(
                    "right hand operators are not supported in `{}`",
                    display(expression)
                ))),
                (None, None) => Err(StencilError::evaluation(format!(
                    "two part expression `{}` must start with an operator",
                    display(expression)
                ))),
            },
            [lhs, functor, rhs] => {
                let lhs = self.resolve(lhs)?;
                let rhs = self.resolve(rhs)?;
                match functor {
                    ParameterDeclaration::Parameter(Parameter::Keyword(keyword)) => {
                        Ok(apply_keyword(&lhs, *keyword, &rhs))
                    }
                    ParameterDeclaration::Parameter(Parameter::Operator(operator)) => {
                        apply_operator(lhs, *operator, rhs)
                    }
                    ParameterDeclaration::Parameter(_)
                    | ParameterDeclaration::Expression(_)
                    | ParameterDeclaration::Tag(_) => Err(StencilError::evaluation(format!(
                        "expected keyword or operator, found `{functor}` in `{}`",
                        display(expression)
                    ))),
                }
            }
            _ => Err(StencilError::evaluation(format!(
                "unsupported expression `{}`, expected 1 to 3 components, found {}",
                display(expression),
                expression.len()
            ))),
        }
    }
}

fn display(expression: &[ParameterDeclaration]) -> String {
    ParameterDeclaration::Expression(expression.to_vec()).to_string()
}

fn apply_keyword(lhs: &Value, keyword: Keyword, rhs: &Value) -> Value {
    match keyword {
        Keyword::In => Value::Bool(rhs.as_array().is_some_and(|items| items.contains(lhs))),
        Keyword::True
        | Keyword::False
        | Keyword::Yes
        | Keyword::No
        | Keyword::Nil
        | Keyword::SelfKeyword => Value::Null,
    }
}

/// Applies a binary operator to two resolved operands.
pub fn apply_operator(lhs: Value, operator: Operator, rhs: Value) -> StencilResult<Value> {
    match operator {
        Operator::Not => Err(StencilError::evaluation(
            "`!` is a unary operator and cannot join two operands",
        )),
        Operator::And => Ok(Value::Bool(lhs.truthy() && rhs.truthy())),
        Operator::Or => Ok(Value::Bool(lhs.truthy() || rhs.truthy())),
        Operator::Equals => Ok(Value::Bool(lhs == rhs)),
        Operator::NotEquals => Ok(Value::Bool(lhs != rhs)),
        Operator::LessThan => Ok(compare(&lhs, &rhs, Ordering::is_lt)),
        Operator::LessThanOrEquals => Ok(compare(&lhs, &rhs, Ordering::is_le)),
        Operator::GreaterThan => Ok(compare(&lhs, &rhs, Ordering::is_gt)),
        Operator::GreaterThanOrEquals => Ok(compare(&lhs, &rhs, Ordering::is_ge)),
        Operator::Plus => plus(lhs, &rhs),
        Operator::Minus => minus(lhs, &rhs),
        Operator::Multiply | Operator::Divide => arithmetic(lhs, operator, &rhs),
    }
}

/// Compares the string forms of both sides: numerically when both parse as
/// numbers, lexicographically otherwise. Null when either side has no string
/// form.
fn compare(lhs: &Value, rhs: &Value, accept: fn(Ordering) -> bool) -> Value {
    let (Some(lhs), Some(rhs)) = (lhs.as_string(), rhs.as_string()) else {
        return Value::Null;
    };
    let ordering = match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r),
        _ => Some(lhs.cmp(&rhs)),
    };
    Value::Bool(ordering.is_some_and(accept))
}

fn plus(lhs: Value, rhs: &Value) -> StencilResult<Value> {
    match lhs {
        Value::Array(mut items) => {
            items.extend(rhs.as_array().unwrap_or_default().iter().cloned());
            Ok(Value::Array(items))
        }
        Value::Data(mut bytes) => {
            bytes.extend(rhs.as_data().unwrap_or_default());
            Ok(Value::Data(bytes))
        }
        Value::String(mut s) => {
            s.push_str(&rhs.as_string().unwrap_or_default());
            Ok(Value::String(s))
        }
        Value::Int(_) | Value::Double(_) => arithmetic(lhs, Operator::Plus, rhs),
        Value::Dictionary(entries) => {
            let mut merged: BTreeMap<String, Value> = rhs.as_dictionary().cloned().unwrap_or_default();
            merged.extend(entries);
            Ok(Value::Dictionary(merged))
        }
        Value::Lazy(lazy) => plus(lazy.force().clone(), rhs),
        Value::Null => Err(StencilError::evaluation(format!(
            "unable to concatenate `null` with `{rhs:?}`"
        ))),
        Value::Bool(b) => Err(StencilError::evaluation(format!(
            "unable to concatenate bool `{b}` with `{rhs:?}`, maybe you meant &&"
        ))),
    }
}

fn minus(lhs: Value, rhs: &Value) -> StencilResult<Value> {
    match lhs {
        Value::Array(items) => {
            let remove = rhs.as_array().unwrap_or_default();
            Ok(Value::Array(
                items.into_iter().filter(|item| !remove.contains(item)).collect(),
            ))
        }
        Value::Int(_) | Value::Double(_) => arithmetic(lhs, Operator::Minus, rhs),
        Value::Lazy(lazy) => minus(lazy.force().clone(), rhs),
        Value::Data(_) | Value::String(_) | Value::Dictionary(_) | Value::Null | Value::Bool(_) => {
            Err(StencilError::evaluation(format!(
                "unable to subtract from {} `{lhs:?}`",
                lhs.kind()
            )))
        }
    }
}

/// Numeric `+ - * /`. A double on either side makes the result a double;
/// otherwise integer arithmetic, with a right side that has no integer form
/// counting as zero.
fn arithmetic(lhs: Value, operator: Operator, rhs: &Value) -> StencilResult<Value> {
    match lhs {
        Value::Int(i) => {
            if let Value::Double(d) = rhs.resolved() {
                Ok(Value::Double(double_op(i as f64, operator, *d)))
            } else {
                int_op(i, operator, rhs.as_int().unwrap_or(0)).map(Value::Int)
            }
        }
        Value::Double(d) => Ok(Value::Double(double_op(
            d,
            operator,
            rhs.as_double().unwrap_or(0.0),
        ))),
        Value::Lazy(lazy) => arithmetic(lazy.force().clone(), operator, rhs),
        Value::Data(_)
        | Value::Array(_)
        | Value::String(_)
        | Value::Dictionary(_)
        | Value::Null
        | Value::Bool(_) => Err(StencilError::evaluation(format!(
            "unable to apply `{operator}` to {} `{lhs:?}`",
            lhs.kind()
        ))),
    }
}

fn double_op(lhs: f64, operator: Operator, rhs: f64) -> f64 {
    match operator {
        Operator::Plus => lhs + rhs,
        Operator::Minus => lhs - rhs,
        Operator::Multiply => lhs * rhs,
        Operator::Divide => lhs / rhs,
        Operator::Not
        | Operator::Equals
        | Operator::NotEquals
        | Operator::GreaterThan
        | Operator::GreaterThanOrEquals
        | Operator::LessThan
        | Operator::LessThanOrEquals
        | Operator::And
        | Operator::Or => f64::NAN,
    }
}

fn int_op(lhs: i64, operator: Operator, rhs: i64) -> StencilResult<i64> {
    let result = match operator {
        Operator::Plus => lhs.checked_add(rhs),
        Operator::Minus => lhs.checked_sub(rhs),
        Operator::Multiply => lhs.checked_mul(rhs),
        Operator::Divide if rhs == 0 => {
            return Err(StencilError::evaluation(format!(
                "integer division by zero in `{lhs} / {rhs}`"
            )));
        }
        Operator::Divide => lhs.checked_div(rhs),
        Operator::Not
        | Operator::Equals
        | Operator::NotEquals
        | Operator::GreaterThan
        | Operator::GreaterThanOrEquals
        | Operator::LessThan
        | Operator::LessThanOrEquals
        | Operator::And
        | Operator::Or => None,
    };
    result.ok_or_else(|| {
        StencilError::evaluation(format!("integer overflow in `{lhs} {operator} {rhs}`"))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    };

    use super::*;
    use crate::error::TagError;

    type Decl = ParameterDeclaration;

    struct Fixture {
        data: Context,
        tags: TagRegistry,
        user_info: UserInfo,
    }

    impl Fixture {
        fn new() -> Self {
            let mut data = Context::new();
            let user: Value = [("name", Value::from("admin")), ("age", Value::Int(40))]
                .into_iter()
                .collect();
            data.insert("user", user)
                .insert("numbers", Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
                .insert("flag", true);
            Self {
                data,
                tags: TagRegistry::default(),
                user_info: UserInfo::new(),
            }
        }

        fn resolve(&self, declaration: &Decl) -> StencilResult<Value> {
            ParameterResolver::new(&self.data, &self.tags, &self.user_info).resolve(declaration)
        }
    }

    fn eval(lhs: Value, operator: Operator, rhs: Value) -> Value {
        apply_operator(lhs, operator, rhs).unwrap()
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_constants_keep_their_kind() {
        let fixture = Fixture::new();
        assert_eq!(fixture.resolve(&Decl::int(3)).unwrap(), Value::Int(3));
        assert_eq!(fixture.resolve(&Decl::double(3.0)).unwrap(), Value::Double(3.0));
        assert_eq!(fixture.resolve(&Decl::string("s")).unwrap(), Value::from("s"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_variable_paths() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.resolve(&Decl::variable("user.name")).unwrap(),
            Value::from("admin")
        );
        assert_eq!(fixture.resolve(&Decl::variable("user.missing")).unwrap(), Value::Null);
        assert_eq!(fixture.resolve(&Decl::variable("flag.deeper")).unwrap(), Value::Null);
        assert_eq!(fixture.resolve(&Decl::variable("nothing")).unwrap(), Value::Null);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_keywords() {
        let fixture = Fixture::new();
        assert_eq!(fixture.resolve(&Decl::keyword(Keyword::Yes)).unwrap(), Value::Bool(true));
        assert_eq!(fixture.resolve(&Decl::keyword(Keyword::No)).unwrap(), Value::Bool(false));
        assert_eq!(fixture.resolve(&Decl::keyword(Keyword::Nil)).unwrap(), Value::Null);

        let whole = fixture.resolve(&Decl::keyword(Keyword::SelfKeyword)).unwrap();
        assert_eq!(whole.as_dictionary().map(BTreeMap::len), Some(3));

        assert!(matches!(
            fixture.resolve(&Decl::keyword(Keyword::In)),
            Err(StencilError::Evaluation { .. })
        ));
        assert!(matches!(
            fixture.resolve(&Decl::operator(Operator::Plus)),
            Err(StencilError::Evaluation { .. })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic_promotion() {
        assert_eq!(eval(Value::Int(3), Operator::Plus, Value::Double(2.5)), Value::Double(5.5));
        assert_eq!(eval(Value::Int(3), Operator::Plus, Value::Int(4)), Value::Int(7));
        assert_eq!(eval(Value::from("a"), Operator::Plus, Value::from("b")), Value::from("ab"));
        assert_eq!(eval(Value::Int(7), Operator::Divide, Value::Int(2)), Value::Int(3));
        assert_eq!(eval(Value::Int(7), Operator::Divide, Value::Double(2.0)), Value::Double(3.5));
        assert_eq!(eval(Value::Double(1.5), Operator::Multiply, Value::Int(2)), Value::Double(3.0));
        assert_eq!(eval(Value::Int(5), Operator::Minus, Value::Null), Value::Int(5));
        assert_eq!(eval(Value::Int(5), Operator::Multiply, Value::from("x")), Value::Int(0));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_collection_plus_and_minus() {
        let array = |items: &[i64]| Value::Array(items.iter().copied().map(Value::Int).collect());
        assert_eq!(eval(array(&[1, 2]), Operator::Plus, array(&[3])), array(&[1, 2, 3]));
        assert_eq!(eval(array(&[1, 2, 3, 2]), Operator::Minus, array(&[2])), array(&[1, 3]));
        assert_eq!(
            eval(Value::Data(b"ab".to_vec()), Operator::Plus, Value::Data(b"c".to_vec())),
            Value::Data(b"abc".to_vec())
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_dictionary_plus_prefers_lhs() {
        let lhs: Value = [("a", 1_i64), ("b", 2_i64)].into_iter().collect();
        let rhs: Value = [("b", 20_i64), ("c", 30_i64)].into_iter().collect();
        let expected: Value = [("a", 1_i64), ("b", 2_i64), ("c", 30_i64)].into_iter().collect();
        assert_eq!(eval(lhs, Operator::Plus, rhs), expected);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arithmetic_structural_errors() {
        for (lhs, operator) in [
            (Value::Null, Operator::Plus),
            (Value::Bool(true), Operator::Plus),
            (Value::from("a"), Operator::Minus),
            (Value::from("a"), Operator::Multiply),
            (Value::Array(vec![]), Operator::Divide),
        ] {
            let result = apply_operator(lhs.clone(), operator, Value::Int(1));
            assert!(
                matches!(result, Err(StencilError::Evaluation { .. })),
                "{lhs:?} {operator} 1 should be a structural error"
            );
        }

        let err = apply_operator(Value::Int(1), Operator::Divide, Value::Int(0)).unwrap_err();
        assert!(err.to_string().contains("division by zero"), "{err}");
        assert!(apply_operator(Value::Int(i64::MAX), Operator::Plus, Value::Int(1)).is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_lazy_operands_are_forced_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Value::lazy(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            Value::Int(10)
        });

        assert_eq!(eval(lazy.clone(), Operator::Minus, Value::Int(4)), Value::Int(6));
        assert_eq!(eval(Value::Int(1), Operator::Plus, lazy.clone()), Value::Int(11));
        assert_eq!(eval(lazy, Operator::Multiply, Value::Double(0.5)), Value::Double(5.0));
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comparisons() {
        assert_eq!(eval(Value::from("10"), Operator::LessThan, Value::from("9")), Value::Bool(false));
        assert_eq!(eval(Value::from("a"), Operator::LessThan, Value::from("b")), Value::Bool(true));
        assert_eq!(eval(Value::Int(2), Operator::GreaterThanOrEquals, Value::Double(2.0)), Value::Bool(true));
        assert_eq!(eval(Value::Array(vec![]), Operator::LessThan, Value::Int(1)), Value::Null);
        assert_eq!(eval(Value::Int(1), Operator::Equals, Value::Int(1)), Value::Bool(true));
        assert_eq!(eval(Value::Int(1), Operator::NotEquals, Value::Double(1.0)), Value::Bool(true));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_logical_operators() {
        assert_eq!(eval(Value::Null, Operator::Or, Value::from("x")), Value::Bool(true));
        assert_eq!(eval(Value::Bool(true), Operator::And, Value::Null), Value::Bool(false));
        assert!(apply_operator(Value::Null, Operator::Not, Value::Null).is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_expression_arity() {
        let fixture = Fixture::new();
        let not_flag = Decl::Expression(vec![Decl::operator(Operator::Not), Decl::variable("flag")]);
        assert_eq!(fixture.resolve(&not_flag).unwrap(), Value::Bool(true));

        let not_missing =
            Decl::Expression(vec![Decl::operator(Operator::Not), Decl::variable("missing")]);
        assert_eq!(fixture.resolve(&not_missing).unwrap(), Value::Bool(true));

        let single = Decl::Expression(vec![Decl::int(4)]);
        assert_eq!(fixture.resolve(&single).unwrap(), Value::Int(4));

        let nested = Decl::binary(
            Decl::binary(Decl::variable("user.age"), Operator::Plus, Decl::int(2)),
            Operator::Equals,
            Decl::int(42),
        );
        assert_eq!(fixture.resolve(&nested).unwrap(), Value::Bool(true));

        for malformed in [
            Decl::Expression(vec![]),
            Decl::Expression(vec![Decl::variable("flag"), Decl::operator(Operator::Not)]),
            Decl::Expression(vec![Decl::int(1), Decl::int(2)]),
            Decl::Expression(vec![Decl::operator(Operator::Minus), Decl::int(2)]),
            Decl::Expression(vec![Decl::int(1), Decl::int(2), Decl::int(3)]),
            Decl::Expression(vec![Decl::int(1), Decl::int(2), Decl::int(3), Decl::int(4)]),
        ] {
            let err = fixture.resolve(&malformed).unwrap_err();
            assert!(
                matches!(err, StencilError::Evaluation { .. }),
                "{malformed} should be a structural error, got {err:?}"
            );
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_message_names_the_construct() {
        let fixture = Fixture::new();
        let malformed = Decl::Expression(vec![Decl::variable("user.name"), Decl::int(2)]);
        let message = fixture.resolve(&malformed).unwrap_err().to_string();
        assert!(message.contains("(user.name 2)"), "{message}");

        let not_plus = Decl::Expression(vec![Decl::operator(Operator::Not), Decl::operator(Operator::Plus)]);
        let message = fixture.resolve(&not_plus).unwrap_err().to_string();
        assert!(message.contains("unexpected operator `+`"), "{message}");
        assert!(!message.contains("not supported"), "{message}");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_membership() {
        let fixture = Fixture::new();
        let in_numbers = |lhs: Decl| {
            Decl::Expression(vec![lhs, Decl::keyword(Keyword::In), Decl::variable("numbers")])
        };
        assert_eq!(fixture.resolve(&in_numbers(Decl::int(2))).unwrap(), Value::Bool(true));
        assert_eq!(fixture.resolve(&in_numbers(Decl::int(5))).unwrap(), Value::Bool(false));

        let not_array = Decl::Expression(vec![
            Decl::int(2),
            Decl::keyword(Keyword::In),
            Decl::variable("user"),
        ]);
        assert_eq!(fixture.resolve(&not_array).unwrap(), Value::Bool(false));

        let other_keyword =
            Decl::Expression(vec![Decl::int(2), Decl::keyword(Keyword::Yes), Decl::int(3)]);
        assert_eq!(fixture.resolve(&other_keyword).unwrap(), Value::Null);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_lenient_tag_dispatch() {
        let fixture = Fixture::new();
        let call = Decl::Tag(TagCall::new("doesNotExist", vec![Decl::int(1)]));
        assert_eq!(fixture.resolve(&call).unwrap(), Value::Null);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_tag_calls() {
        let fixture = Fixture::new();
        let call = Decl::Tag(TagCall::new(
            "uppercased",
            vec![Decl::binary(
                Decl::variable("user.name"),
                Operator::Plus,
                Decl::string("!"),
            )],
        ));
        assert_eq!(fixture.resolve(&call).unwrap(), Value::from("ADMIN!"));

        let failing = Decl::Tag(TagCall::new("count", vec![]));
        assert!(matches!(
            fixture.resolve(&failing),
            Err(StencilError::Tag {
                source: TagError::ParameterCount { .. },
                ..
            })
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_parameters_resolve_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut fixture = Fixture::new();
        let seen = Arc::clone(&order);
        fixture.tags.register_fn("record", move |ctx| {
            let label = ctx.parameters.first().and_then(Value::as_string).unwrap_or_default();
            seen.lock().unwrap().push(label.clone());
            Ok(Value::String(label))
        });

        let record = |label: &str| Decl::Tag(TagCall::new("record", vec![Decl::string(label)]));
        let outer = TagCall::new(
            "record",
            vec![Decl::binary(record("a"), Operator::Plus, record("b"))],
        );
        let result = fixture.resolve(&Decl::Tag(outer)).unwrap();

        assert_eq!(result, Value::from("ab"));
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "ab"]);
    }
}
