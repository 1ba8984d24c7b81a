// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end coverage of operators, literals and built-in functions

use expression_language::{Arity, Bindings, ExpressionEngine, ExpressionError, Value};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use serde_json::{Value as JsonValue, json};

#[fixture]
fn engine() -> ExpressionEngine {
    ExpressionEngine::new()
}

#[fixture]
fn bindings() -> Bindings {
    Bindings::from_json(json!({
        "order": {
            "id": "A-17",
            "total": 99.5,
            "items": [
                {"sku": "apple", "qty": 3},
                {"sku": "pear", "qty": 0}
            ],
            "coupon": null
        },
        "user": {"name": "Grace", "roles": ["admin", "dev"], "age": 36},
        "limit": 100
    }))
    .unwrap()
}

#[rstest]
#[case("order.total < limit", json!(true))]
#[case("order.items[0].qty * 2", json!(6))]
#[case("order.items[1].qty ?: 'none'", json!("none"))]
#[case("order.coupon ?? 'no coupon'", json!("no coupon"))]
#[case("order.coupon?.code.value", json!(null))]
#[case("order.missing ?? 'default'", json!("default"))]
#[case("'admin' in user.roles and not ('root' in user.roles)", json!(true))]
#[case("'ops' not in user.roles", json!(true))]
#[case("'name' in user", json!(true))]
#[case("user.name matches '/^gr/i'", json!(true))]
#[case("user.name ~ ' (' ~ user.age ~ ')'", json!("Grace (36)"))]
#[case("user.age >= 18 ? 'adult' : 'minor'", json!("adult"))]
#[case("user.age > 100 ? 'old'", json!(null))]
#[case("1 === 1.0", json!(false))]
#[case("1 == 1.0", json!(true))]
#[case("[1, 2] == [1.0, 2.0]", json!(true))]
#[case("{a: 1} !== {a: 1}", json!(false))]
#[case("TRUE && Null == null", json!(true))]
#[case("2 ** -1", json!(0.5))]
#[case("-2 ** 2", json!(4))]
#[case("10 - 2 - 3", json!(5))]
#[case("7 % 3 + 9 / 3", json!(4))]
#[case("'5' + 1", json!(6))]
#[case("count(order.items) + count(user)", json!(5))]
#[case("upper(order.items[1].sku) ~ lower('!')", json!("PEAR!"))]
#[case("max(user.age, limit, 7)", json!(100))]
#[case("min([3.5, 1, 2])", json!(1))]
#[case("abs(-limit)", json!(100))]
#[case("array_get(order, 'items.0.sku')", json!("apple"))]
#[case("array_get(order, 'items.9.sku', 'n/a')", json!("n/a"))]
#[case("{(order.id): [true, null]}", json!({"A-17": [true, null]}))]
#[case("(-9223372036854775807 - 1) / -1", json!(9.223372036854775808e18))]
#[case("-0.0 < 0.0", json!(false))]
#[case("0 > -0.0", json!(false))]
#[case("0 >= -0.0", json!(true))]
#[case("9007199254740993 == 9007199254740992.0", json!(false))]
#[case("order.coupon.code ?? 'none'", json!("none"))]
#[case("order.coupon[0].code ?? 'none'", json!("none"))]
fn evaluates(
    engine: ExpressionEngine,
    bindings: Bindings,
    #[case] source: &str,
    #[case] expected: JsonValue,
) {
    let result = engine.evaluate(source, &bindings).unwrap();
    assert_eq!(JsonValue::from(result), expected, "expression: {source}");
}

#[rstest]
#[case("user.name < 5")]
#[case("user + 1")]
#[case("'x' in 'xyz'")]
#[case("user.name.first")]
#[case("order.items['sku']")]
#[case("1 matches 1")]
#[case("lower(1)")]
#[case("1e400 - 1e400 <= 1e400 - 1e400")]
#[case("max(1, 1e400 - 1e400)")]
fn type_mismatches(engine: ExpressionEngine, bindings: Bindings, #[case] source: &str) {
    let err = engine.evaluate(source, &bindings).unwrap_err();
    assert!(
        matches!(err, ExpressionError::TypeMismatch { .. }),
        "expression: {source}, got: {err}"
    );
}

#[rstest]
#[case("array_get()", "array_get", Arity::range(2, 3), 0)]
#[case("abs(1, 2)", "abs", Arity::exactly(1), 2)]
#[case("min()", "min", Arity::at_least(1), 0)]
fn arity_mismatches(
    engine: ExpressionEngine,
    #[case] source: &str,
    #[case] name: &str,
    #[case] expected: Arity,
    #[case] got: usize,
) {
    assert_eq!(
        engine.evaluate(source, &Bindings::new()).unwrap_err(),
        ExpressionError::ArityMismatch {
            name: name.to_string(),
            expected,
            got,
        }
    );
}

#[rstest]
#[case("'unterminated", 0)]
#[case("1 # 2", 2)]
#[case("'\\u12'", 1)]
fn lex_errors_carry_positions(engine: ExpressionEngine, #[case] source: &str, #[case] position: usize) {
    let err = engine.evaluate(source, &Bindings::new()).unwrap_err();
    assert!(matches!(err, ExpressionError::Lex { .. }), "got: {err}");
    assert_eq!(err.position(), Some(position));
}

#[rstest]
#[case("")]
#[case("1 2")]
#[case("f(1,")]
#[case("[1, 2")]
#[case("{a 1}")]
#[case("a ? b :")]
#[case("a.1")]
fn syntax_errors(engine: ExpressionEngine, #[case] source: &str) {
    let err = engine.evaluate(source, &Bindings::new()).unwrap_err();
    assert!(matches!(err, ExpressionError::Syntax { .. }), "expression: {source:?}, got: {err}");
}

#[test]
fn custom_functions_receive_evaluated_arguments() {
    let mut engine = ExpressionEngine::new();
    engine.register_function("join", Arity::at_least(1), |args| {
        let separator = args[0].as_str().unwrap_or(",").to_string();
        let parts: Vec<String> = args[1..].iter().map(ToString::to_string).collect();
        Ok(Value::String(parts.join(&separator)))
    });

    let bindings = Bindings::new().with("n", 2);
    assert_eq!(
        engine.evaluate("join('-', 'a', n + 1, true)", &bindings).unwrap(),
        Value::from("a-3-true")
    );
}

#[test]
fn functions_can_fail_with_their_own_errors() {
    let mut engine = ExpressionEngine::new();
    engine.register_function("fail", Arity::exactly(0), |_| {
        Err(ExpressionError::function("fail", "always fails"))
    });

    assert_eq!(
        engine.evaluate("fail()", &Bindings::new()).unwrap_err().to_string(),
        "Function 'fail' error: always fails"
    );
}
