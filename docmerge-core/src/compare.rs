//! Structural equality over JSON values.

use serde_json::{Number, Value};

/// Deep structural equality.
///
/// Object key order is irrelevant and numbers compare by value, so `1` and
/// `1.0` are equal. A missing key is never equal to an explicit `null`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => y.as_f64().is_some_and(|f| integral_float_equals(f, i)),
        (None, Some(i)) => x.as_f64().is_some_and(|f| integral_float_equals(f, i)),
        (None, None) => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// Exact: an integer past 2^53 is not rounded onto a nearby float.
fn integral_float_equals(f: f64, i: i128) -> bool {
    f.is_finite()
        && f.fract() == 0.0
        && f >= i128::MIN as f64
        && f < i128::MAX as f64
        && f as i128 == i
}
