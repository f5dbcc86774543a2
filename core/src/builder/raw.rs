use super::Statement;
use crate::context::Context;
use crate::error::Result;
use crate::value::Value;

/// An escape hatch: hand-written SQL text with already-positioned
/// placeholder markers, plus the parameter values they bind (§3 `SQL`).
#[derive(Debug, Clone)]
pub struct RawQuery {
    sql: String,
    params: Vec<Value>,
}

impl RawQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        RawQuery {
            sql: sql.into(),
            params,
        }
    }
}

impl Statement for RawQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal(&self.sql);
        for param in &self.params {
            ctx.push_param(param.clone());
        }
        Ok(())
    }
}
