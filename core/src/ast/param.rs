use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;
use crate::render::Render;
use crate::value::{Converter, Value};

/// A parameter marker (§3 `Value` node, renamed here to avoid clashing with
/// [`crate::value::Value`], the bound-value type it carries).
///
/// When `multi` is set and the carried value is a [`Value::List`], it
/// flattens into an enclosed, comma-joined list of placeholders rather than
/// a single one — used for `IN (...)` right-hand sides.
#[derive(Debug, Clone)]
pub struct Param {
    pub value: Value,
    pub converter: Option<Rc<dyn Converter>>,
    pub multi: bool,
}

impl Param {
    pub fn new(value: Value) -> Self {
        Param {
            value,
            converter: None,
            multi: false,
        }
    }

    pub fn multi(value: Value) -> Self {
        Param {
            value,
            converter: None,
            multi: true,
        }
    }

    pub fn with_converter(mut self, converter: Rc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

impl Render for Param {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        if let Some(converter) = &self.converter {
            ctx.push_converter(converter.clone());
        }
        let result = (|| -> Result<()> {
            match (&self.value, self.multi) {
                (Value::List(items), true) => {
                    ctx.literal("(");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            ctx.literal(", ");
                        }
                        ctx.bind(item.clone());
                    }
                    ctx.literal(")");
                    Ok(())
                }
                _ => {
                    ctx.bind(self.value.clone());
                    Ok(())
                }
            }
        })();
        if self.converter.is_some() {
            ctx.pop_converter();
        }
        result
    }
}
