//! Conversions between JSON-shaped items and DynamoDB attribute maps.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use cloudping_store::Item;
use serde_json::{Number, Value};

use crate::Error;

pub type AttributeMap = HashMap<String, AttributeValue>;

pub fn to_attributes(item: Item) -> AttributeMap {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute(value)))
        .collect()
}

pub fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(to_attributes(map)),
    }
}

pub fn from_attributes(attributes: AttributeMap) -> Result<Item, Error> {
    attributes
        .into_iter()
        .map(|(name, value)| from_attribute(&name, value).map(|value| (name, value)))
        .collect()
}

fn from_attribute(name: &str, value: AttributeValue) -> Result<Value, Error> {
    Ok(match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::L(values) => Value::Array(
            values
                .into_iter()
                .map(|value| from_attribute(name, value))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(from_attributes(map)?),
        _ => return Err(Error::UnsupportedAttribute(name.to_string())),
    })
}

fn parse_number(n: &str) -> Result<Number, Error> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Number::from(i));
    }

    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| Error::InvalidNumber(n.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sample_item_shape() {
        let Value::Object(item) = json!({
            "region": "us-east-1",
            "avg": 50.5,
            "attempts": 5,
            "results": [{"seq": 0, "time": 50.0}],
            "is_opt_in": false
        }) else {
            unreachable!()
        };

        let attributes = to_attributes(item.clone());
        assert_eq!(attributes["region"], AttributeValue::S("us-east-1".into()));
        assert_eq!(attributes["avg"], AttributeValue::N("50.5".into()));
        assert_eq!(attributes["attempts"], AttributeValue::N("5".into()));
        assert_matches!(&attributes["results"], AttributeValue::L(list) if list.len() == 1);

        assert_eq!(from_attributes(attributes).unwrap(), item);
    }

    #[test]
    fn test_rejects_binary_and_bad_numbers() {
        let mut attributes = AttributeMap::new();
        attributes.insert("n".into(), AttributeValue::N("fifty".into()));
        assert_matches!(from_attributes(attributes), Err(Error::InvalidNumber(_)));

        let mut attributes = AttributeMap::new();
        attributes.insert("ss".into(), AttributeValue::Ss(vec!["a".into()]));
        assert_matches!(from_attributes(attributes), Err(Error::UnsupportedAttribute(_)));
    }
}
