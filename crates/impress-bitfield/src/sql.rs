//! SQL rendering for flag predicates and updates.
//!
//! Produces text plus positional (`?`) parameters; running the statement is
//! up to the caller. Masks are bound as `i64`, reinterpreting the bits the
//! way a signed BIGINT column stores them.

use crate::predicate::{Comparison, Join, PredicateSpec, UpdateExpr};

/// Compiled SQL fragments for a [`PredicateSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPredicate {
    /// `(expression, alias)` per probe, e.g. `("(\"flag\" & ?)", "bit_mask_0")`.
    pub annotations: Vec<(String, String)>,
    /// Condition over the annotation aliases.
    pub where_clause: String,
    /// One bound mask per annotation, in order.
    pub params: Vec<i64>,
    inline_where: String,
}

impl CompiledPredicate {
    /// `expr AS alias, ...` for a select list or derived table.
    pub fn select_list(&self) -> String {
        self.annotations
            .iter()
            .map(|(expr, alias)| format!("{} AS {}", expr, quote_ident(alias)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Condition with each probe expression written in place of its alias.
    /// Binds the same `params`.
    pub fn inline_where(&self) -> &str {
        &self.inline_where
    }
}

/// Compiled `SET` assignment for an [`UpdateExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUpdate {
    pub assignment: String,
    pub params: Vec<i64>,
}

/// Translate a predicate into SQL fragments.
pub fn compile_predicate(spec: &PredicateSpec) -> CompiledPredicate {
    let mut annotations = Vec::with_capacity(spec.probes().len());
    let mut params = Vec::with_capacity(spec.probes().len());
    let mut by_alias = Vec::with_capacity(spec.conditions().len());
    let mut inline = Vec::with_capacity(spec.conditions().len());

    for (probe, cond) in spec.probes().iter().zip(spec.conditions()) {
        let expr = format!("({} & ?)", quote_ident(&probe.field));
        let op = compile_comparison(cond.comparison);
        by_alias.push(format!("{} {}", quote_ident(&cond.probe), op));
        inline.push(format!("{} {}", expr, op));
        annotations.push((expr, probe.name.clone()));
        params.push(probe.mask as i64);
    }

    CompiledPredicate {
        annotations,
        where_clause: join_conditions(&by_alias, spec.join()),
        params,
        inline_where: join_conditions(&inline, spec.join()),
    }
}

/// Translate an update into a `SET` assignment.
pub fn compile_update(expr: &UpdateExpr) -> CompiledUpdate {
    let col = quote_ident(expr.field());
    let assignment = match expr {
        UpdateExpr::SetBits { .. } => format!("{} = {} | ?", col, col),
        UpdateExpr::ClearBits { .. } => format!("{} = {} & ~?", col, col),
    };
    CompiledUpdate {
        assignment,
        params: vec![expr.mask() as i64],
    }
}

fn compile_comparison(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Set => "<> 0",
        Comparison::Clear => "= 0",
    }
}

fn join_conditions(parts: &[String], join: Join) -> String {
    let sep = match join {
        Join::And => " AND ",
        Join::Or => " OR ",
    };
    match parts {
        [single] => single.clone(),
        _ => format!("({})", parts.join(sep)),
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
