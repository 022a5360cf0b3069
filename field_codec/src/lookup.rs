//! Lookup translation types
//!
//! A lookup is a named filter operator (`exact`, `contains`, `len`, ...).
//! Fields translate a lookup plus operand into a [`LookupSql`]: a template
//! holding `{field}` and `{value}` placeholders and the bind values for it.

use crate::errors::CodecError;
use crate::registry::AdapterRegistry;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use type_mapping::PgValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Exact,
    Contains,
    Len,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    /// Any name without dedicated handling; always rejected by fields
    Other(String),
}

impl Lookup {
    pub fn parse(name: &str) -> Self {
        match name {
            "exact" => Lookup::Exact,
            "contains" => Lookup::Contains,
            "len" => Lookup::Len,
            "gt" => Lookup::Gt,
            "gte" => Lookup::Gte,
            "lt" => Lookup::Lt,
            "lte" => Lookup::Lte,
            "isnull" => Lookup::IsNull,
            other => Lookup::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Lookup::Exact => "exact",
            Lookup::Contains => "contains",
            Lookup::Len => "len",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::IsNull => "isnull",
            Lookup::Other(name) => name,
        }
    }
}

impl FromStr for Lookup {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Lookup::parse(s))
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SQL fragment produced by a lookup translation
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSql {
    /// Fragment with `{field}` and `{value}` placeholders
    pub template: String,
    /// One bind value per `{value}` placeholder, in order
    pub params: Vec<PgValue>,
}

impl LookupSql {
    pub fn new(template: impl Into<String>, params: Vec<PgValue>) -> Self {
        Self {
            template: template.into(),
            params,
        }
    }

    /// Fill `{field}` with `column` and each `{value}` with the next
    /// placeholder produced by `placeholder` (e.g. `$1`, `$2`)
    pub fn render_with<F>(&self, column: &str, mut placeholder: F) -> String
    where
        F: FnMut() -> String,
    {
        let mut out = String::new();
        for (idx, piece) in self.template.split("{value}").enumerate() {
            if idx > 0 {
                out.push_str(&placeholder());
            }
            out.push_str(&piece.replace("{field}", column));
        }
        out
    }

    /// Fill `{value}` placeholders with the params rendered as SQL literals
    /// by the connection's wire adapters
    pub fn render_inline(&self, column: &str, adapters: &AdapterRegistry) -> Result<String, CodecError> {
        let literals = self
            .params
            .iter()
            .map(|param| adapters.render(param))
            .collect::<Result<Vec<_>, _>>()?;
        let mut literals = literals.into_iter();
        let mut missing = false;
        let sql = self.render_with(column, || {
            literals.next().unwrap_or_else(|| {
                missing = true;
                String::new()
            })
        });
        if missing {
            return Err(CodecError::TypeMismatch(format!(
                "lookup template '{}' has more placeholders than parameters",
                self.template
            )));
        }
        Ok(sql)
    }
}

/// The ordinary comparison lookups shared by scalar fields.
///
/// `exact` against null becomes `IS NULL`; `isnull` takes a boolean operand
/// and binds nothing.
pub(crate) fn comparison(lookup: &Lookup, operand: PgValue) -> Option<LookupSql> {
    let op = match lookup {
        Lookup::Exact if operand.is_null() => {
            return Some(LookupSql::new("{field} IS NULL", vec![]));
        }
        Lookup::IsNull => {
            let template = if operand.is_falsy() {
                "{field} IS NOT NULL"
            } else {
                "{field} IS NULL"
            };
            return Some(LookupSql::new(template, vec![]));
        }
        Lookup::Exact => "=",
        Lookup::Gt => ">",
        Lookup::Gte => ">=",
        Lookup::Lt => "<",
        Lookup::Lte => "<=",
        _ => return None,
    };
    Some(LookupSql::new(format!("{{field}} {} {{value}}", op), vec![operand]))
}
