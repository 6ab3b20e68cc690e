//! Built-in tags registered by [`TagRegistry::default`].

use std::fmt::Write;

use chrono::{
    DateTime,
    format::{Item, StrftimeItems},
};

use crate::{
    error::TagError,
    tag::{Tag, TagContext, TagRegistry},
    value::Value,
};

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub(crate) fn register_defaults(registry: &mut TagRegistry) {
    registry
        .register("unsafeHTML", UnsafeHtml)
        .register("lowercased", Lowercased)
        .register("uppercased", Uppercased)
        .register("capitalized", Capitalized)
        .register("contains", Contains)
        .register("date", Date)
        .register("count", Count)
        .register("comment", Comment);
}

fn first_string(ctx: &TagContext<'_>, action: &str) -> Result<String, TagError> {
    ctx.parameters
        .first()
        .and_then(Value::as_string)
        .ok_or_else(|| TagError::unexpected_data(action))
}

/// Passes a string through without HTML escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsafeHtml;

impl Tag for UnsafeHtml {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        first_string(ctx, "unsafe").map(Value::String)
    }

    fn is_unescaped(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercased;

impl Tag for Lowercased {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        Ok(Value::String(first_string(ctx, "lowercase")?.to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercased;

impl Tag for Uppercased {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        Ok(Value::String(first_string(ctx, "uppercase")?.to_uppercase()))
    }
}

/// Uppercases the first letter of every word and lowercases the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capitalized;

impl Tag for Capitalized {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        let input = first_string(ctx, "capitalize")?;
        let mut output = String::with_capacity(input.len());
        let mut word_start = true;
        for c in input.chars() {
            if word_start {
                output.extend(c.to_uppercase());
            } else {
                output.extend(c.to_lowercase());
            }
            word_start = !c.is_alphanumeric();
        }
        Ok(Value::String(output))
    }
}

/// `contains(array, value)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contains;

impl Tag for Contains {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        ctx.require_parameter_count(2)?;
        let (Some(collection), Some(needle)) = (ctx.parameters.first(), ctx.parameters.get(1))
        else {
            return Err(TagError::ParameterCount {
                expected: 2,
                found: ctx.parameters.len(),
            });
        };
        let collection = collection
            .as_array()
            .ok_or_else(|| TagError::Message("unable to convert first parameter to array".into()))?;
        Ok(Value::Bool(collection.contains(needle)))
    }
}

/// Number of elements in an array or entries in a dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Tag for Count {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        ctx.require_parameter_count(1)?;
        let value = ctx.parameters.first().unwrap_or(&Value::Null);
        let count = if let Some(array) = value.as_array() {
            array.len()
        } else if let Some(dictionary) = value.as_dictionary() {
            dictionary.len()
        } else {
            return Err(TagError::unexpected_data("count"));
        };
        i64::try_from(count)
            .map(Value::Int)
            .map_err(|_| TagError::Message("count does not fit in an int".into()))
    }
}

/// `date(timestamp[, format])`: formats seconds since the Unix epoch, in UTC,
/// with a strftime-style format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl Tag for Date {
    fn render(&self, ctx: &TagContext<'_>) -> Result<Value, TagError> {
        let format = match ctx.parameters.as_slice() {
            [_] => DEFAULT_DATE_FORMAT.to_string(),
            [_, format] => format
                .as_string()
                .ok_or_else(|| TagError::Message("unable to convert date format to string".into()))?,
            _ => {
                return Err(TagError::Message(
                    "invalid parameters provided for date".into(),
                ));
            }
        };

        let timestamp = ctx
            .parameters
            .first()
            .and_then(Value::as_double)
            .ok_or_else(|| TagError::Message("unable to convert parameter to double for date".into()))?;
        let date = DateTime::from_timestamp_millis(seconds_to_millis(timestamp)?)
            .ok_or_else(|| TagError::Message(format!("timestamp {timestamp} is out of range")))?;

        let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(TagError::Message(format!("invalid date format `{format}`")));
        }

        let mut output = String::new();
        write!(output, "{}", date.format_with_items(items.into_iter()))
            .map_err(|_| TagError::Message(format!("unable to format date with `{format}`")))?;
        Ok(Value::String(output))
    }
}

fn seconds_to_millis(seconds: f64) -> Result<i64, TagError> {
    let millis = (seconds * 1000.0).round();
    Value::Double(millis)
        .as_int()
        .ok_or_else(|| TagError::Message(format!("timestamp {seconds} is out of range")))
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comment;

impl Tag for Comment {
    fn render(&self, _ctx: &TagContext<'_>) -> Result<Value, TagError> {
        Ok(Value::Null)
    }
}
