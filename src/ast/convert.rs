//! Conversion of normalized data into `serde_json` values.
//!
//! A configuration program ultimately produces data. Once an expression has
//! been evaluated to a literal form, [`Expr::to_value`] renders it as a
//! [`serde_json::Value`] for consumption by the host application.

use super::{Expr, ExprKind};
use crate::diagnostics::{Error, Result};
use serde_json::Value;

impl Expr {
    /// Renders a fully evaluated literal expression as a JSON value.
    ///
    /// Functions, types, variables and other non-data forms have no JSON
    /// representation and report a conversion error.
    pub fn to_value(&self) -> Result<Value> {
        match &self.kind {
            ExprKind::BoolLit(value) => Ok(Value::Bool(*value)),
            ExprKind::NaturalLit(value) => Ok(Value::from(*value)),
            ExprKind::DoubleLit(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .ok_or_else(|| {
                    Box::new(Error::conversion_error(format!(
                        "`{value}` is not representable as a JSON number"
                    )))
                }),
            ExprKind::TextLit(chunks) => Ok(Value::String(chunks.concat())),
            ExprKind::ListLit { items, .. } => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| item.to_value())
                    .collect::<Result<_>>()?,
            )),
            ExprKind::OptionalLit { value } => match value {
                Some(value) => value.to_value(),
                None => Ok(Value::Null),
            },
            ExprKind::RecordLit { fields } => Ok(Value::Object(
                fields
                    .iter()
                    .map(|(label, value)| Ok((label.clone(), value.to_value()?)))
                    .collect::<Result<_>>()?,
            )),
            ExprKind::UnionLit { label, value, .. } => {
                let mut object = serde_json::Map::new();
                object.insert(label.clone(), value.to_value()?);
                Ok(Value::Object(object))
            }
            _ => Err(Box::new(Error::conversion_error(format!(
                "`{self}` has no data representation"
            )))),
        }
    }
}
