//! Lowering of SELECT statements into PipeQL.
//!
//! The [`SelectTranslator`] walks one SELECT statement and emits a PipeQL
//! program: a base filter (or a pipeline inherited from a view, CTE, or
//! subquery) followed by `|`-separated stages. Stage order is
//! deterministic: filter computations, `filter`, cleanup `delete`, joins,
//! `stats`, the HAVING `filter`, projection computations, `rename`,
//! `fields`, `uniq`, `sort`, `offset`, `limit`.

use std::collections::{HashMap, HashSet};

use crate::error::Error;
use crate::sql::ast::*;
use crate::sql::render::render_expr;
use crate::store::{Stores, ViewStore};

use super::error::TranslationError;

/// Translated CTE bodies, keyed by lower-cased last name.
pub(crate) type CteMap = HashMap<String, String>;

/// Translates a SELECT statement against the given stores.
pub fn translate_select(stmt: &SelectStatement, stores: &Stores) -> Result<String, Error> {
    translate_select_with_ctes(stmt, stores, &CteMap::new())
}

/// Translates a SELECT with an inherited set of CTE bindings.
pub(crate) fn translate_select_with_ctes(
    stmt: &SelectStatement,
    stores: &Stores,
    ctes: &CteMap,
) -> Result<String, Error> {
    SelectTranslator::new(stores, ctes.clone()).translate(stmt)
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::Translation(TranslationError::bad_request(message))
}

fn not_found(message: impl Into<String>) -> Error {
    Error::Translation(TranslationError::not_found(message))
}

/// A table-catalog entry, classified as bare filter or pipeline.
struct TableSpec {
    filter: String,
    pipeline: String,
}

impl TableSpec {
    fn new(expr: &str) -> Self {
        let value = expr.trim();
        if value.is_empty() || value == "*" {
            return Self {
                filter: "*".to_string(),
                pipeline: String::new(),
            };
        }
        if value.contains('|') {
            return Self {
                filter: String::new(),
                pipeline: value.to_string(),
            };
        }
        Self {
            filter: value.to_string(),
            pipeline: String::new(),
        }
    }
}

/// One pre-computed field backing a scalar function used in a filter.
struct FilterComputation {
    alias: String,
    pipes: Vec<String>,
}

struct AggItem {
    key: String,
    stats_call: String,
    result_name: String,
}

struct SelectTranslator<'a> {
    stores: &'a Stores,
    ctes: CteMap,

    bindings: HashSet<String>,
    base_alias: String,
    base_filter: String,
    base_pipeline: String,
    base_uses_pipeline: bool,
    pending_left_filters: Vec<&'a Expr>,
    agg_results: Option<HashMap<String, String>>,
    group_expr_aliases: Option<HashMap<String, String>>,
    filter_computations: HashMap<String, FilterComputation>,
    filter_order: Vec<String>,
    filter_delete: Vec<String>,
}

impl<'a> SelectTranslator<'a> {
    fn new(stores: &'a Stores, ctes: CteMap) -> Self {
        Self {
            stores,
            ctes,
            bindings: HashSet::new(),
            base_alias: String::new(),
            base_filter: String::new(),
            base_pipeline: String::new(),
            base_uses_pipeline: false,
            pending_left_filters: Vec::new(),
            agg_results: None,
            group_expr_aliases: None,
            filter_computations: HashMap::new(),
            filter_order: Vec::new(),
            filter_delete: Vec::new(),
        }
    }

    fn translate(&mut self, stmt: &'a SelectStatement) -> Result<String, Error> {
        let base = self.translate_simple_select(stmt)?;
        if stmt.set_ops.is_empty() {
            return Ok(base);
        }

        let mut result = base;
        for op in &stmt.set_ops {
            if op.operator != SetOperator::Union {
                return Err(bad_request(format!(
                    "translator: set operator {} is not supported",
                    op.operator.as_str()
                )));
            }
            if !op.all {
                return Err(bad_request(
                    "translator: UNION without ALL is not supported",
                ));
            }
            let Some(select) = &op.select else {
                return Err(bad_request("translator: UNION missing right-hand select"));
            };
            let rhs = translate_select_with_ctes(select, self.stores, &self.ctes)?;
            result = format!("{result} | union ({rhs})");
        }

        Ok(result)
    }

    /// Translates one SELECT, ignoring any trailing set operations.
    fn translate_simple_select(&mut self, stmt: &'a SelectStatement) -> Result<String, Error> {
        if let Some(with) = &stmt.with {
            if !with.ctes.is_empty() {
                self.register_ctes(with)?;
            }
        }

        let join_pipes = self.process_from(stmt.from.as_ref())?;

        let mut filters = Vec::new();
        if let Some(where_clause) = &stmt.where_clause {
            self.ensure_base_aliases_only(where_clause)?;
            filters.push(self.translate_expr(where_clause)?);
        }
        let pending = std::mem::take(&mut self.pending_left_filters);
        for left_filter in pending {
            self.ensure_base_aliases_only(left_filter)?;
            filters.push(self.translate_expr(left_filter)?);
        }
        let base_filter = self.base_filter.trim().to_string();
        if !base_filter.is_empty() && base_filter != "*" {
            filters.insert(0, base_filter);
        }

        let filter = match filters.len() {
            0 => "*".to_string(),
            1 => filters.remove(0),
            _ => format!("({})", filters.join(" AND ")),
        };

        let pre_filter_pipes = self.collect_filter_prefilters();
        let needs_filter_pipeline = self.base_uses_pipeline || !pre_filter_pipes.is_empty();

        let mut base = filter.clone();
        let mut pipes = Vec::new();
        if needs_filter_pipeline {
            base = if self.base_uses_pipeline {
                self.base_pipeline.clone()
            } else {
                "*".to_string()
            };
            pipes.extend(pre_filter_pipes);
            if filter != "*" {
                pipes.push(format!("filter {filter}"));
            }
            if !self.filter_delete.is_empty() {
                pipes.push(format!("delete {}", self.filter_delete.join(", ")));
            }
        }
        pipes.extend(join_pipes);

        let (stats_pipes, aggregated) = self.build_stats_pipe(stmt)?;
        pipes.extend(stats_pipes);

        if let Some(having) = &stmt.having {
            if !aggregated {
                return Err(bad_request(
                    "translator: HAVING requires GROUP BY with aggregates",
                ));
            }
            let having_str = self.translate_expr(having)?;
            pipes.push(format!("filter {having_str}"));
        }

        let (projection_pipes, projection_fields) =
            self.build_projection_pipes(&stmt.columns, aggregated)?;
        pipes.extend(projection_pipes);

        if stmt.distinct {
            pipes.push(self.build_distinct_pipe(&projection_fields, aggregated)?);
        }

        if !stmt.order_by.is_empty() {
            pipes.push(self.translate_order_by(&stmt.order_by, aggregated)?);
        }

        if let Some(limit) = &stmt.limit {
            pipes.extend(self.translate_limit(limit)?);
        }

        if pipes.is_empty() {
            return Ok(base);
        }
        Ok(format!("{base} | {}", pipes.join(" | ")))
    }

    fn register_ctes(&mut self, with: &WithClause) -> Result<(), Error> {
        if with.recursive {
            return Err(bad_request("translator: recursive CTEs are not supported"));
        }
        for cte in &with.ctes {
            let Some(last) = cte.name.last() else {
                return Err(bad_request("translator: CTE missing name"));
            };
            let name = last.to_lowercase();
            let Some(select) = &cte.select else {
                return Err(bad_request(format!(
                    "translator: CTE {} has no select",
                    cte.name.display()
                )));
            };
            if self.ctes.contains_key(&name) {
                return Err(bad_request(format!(
                    "translator: duplicate CTE name {name:?}"
                )));
            }
            let query = translate_select_with_ctes(select, self.stores, &self.ctes)
                .map_err(|err| {
                    bad_request(format!("translator: failed to translate CTE {name}: {err}"))
                })?;
            self.ctes.insert(name, query);
        }
        Ok(())
    }

    fn collect_filter_prefilters(&self) -> Vec<String> {
        let mut pipes = Vec::new();
        for key in &self.filter_order {
            if let Some(comp) = self.filter_computations.get(key) {
                pipes.extend(comp.pipes.iter().cloned());
            }
        }
        pipes
    }

    // ==================== FROM and JOIN ====================

    fn process_from(&mut self, from: Option<&'a TableExpr>) -> Result<Vec<String>, Error> {
        let Some(from) = from else {
            return Err(bad_request("translator: FROM clause is required"));
        };
        match from {
            TableExpr::Table(table) => {
                self.register_base_table(table)?;
                Ok(Vec::new())
            }
            TableExpr::Subquery(sub) => {
                self.register_base_subquery(sub)?;
                Ok(Vec::new())
            }
            TableExpr::Join(join) => self.process_join(join),
        }
    }

    fn register_binding(&mut self, alias: &str) {
        let key = alias.to_lowercase();
        if !key.is_empty() {
            self.bindings.insert(key);
        }
    }

    fn register_base_table(&mut self, table: &TableName) -> Result<(), Error> {
        let Some(name) = table.name.last() else {
            return Err(bad_request("translator: invalid table reference"));
        };
        let name = name.to_string();
        let name_lower = name.to_lowercase();

        let alias = match table.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => name.clone(),
        };
        let alias_lower = alias.to_lowercase();

        if !self.base_alias.is_empty() && self.base_alias != alias_lower {
            return Err(bad_request(
                "translator: multiple base tables are not supported",
            ));
        }

        if let Some(query) = self.ctes.get(&name_lower) {
            self.base_alias = alias_lower.clone();
            self.base_uses_pipeline = true;
            self.base_pipeline = query.clone();
            self.register_binding(&alias_lower);
            self.register_binding(&name_lower);
            return Ok(());
        }

        let mut view_attempted = false;
        let mut view_display = String::new();
        if let Some(views) = self.stores.views() {
            let loaded = views.load(&table.name.parts)?;
            view_attempted = true;
            view_display = ViewStore::display_name(&table.name.parts);
            if let Some(query) = loaded {
                self.base_alias = alias_lower.clone();
                self.base_uses_pipeline = true;
                self.base_pipeline = query;
                self.base_filter.clear();
                self.register_binding(&alias_lower);
                self.register_binding(&name_lower);
                return Ok(());
            }
        }

        let Some(expr) = self.stores.tables().get(&name_lower) else {
            if view_attempted {
                return Err(not_found(format!(
                    "translator: view {view_display} not found"
                )));
            }
            let available = self.stores.tables().list().join(", ");
            return Err(not_found(format!(
                "translator: table {:?} is not configured (available: {})",
                table.name.display(),
                available
            )));
        };
        let spec = TableSpec::new(expr);

        self.base_alias = alias_lower.clone();
        self.base_filter = spec.filter;
        self.base_uses_pipeline = !spec.pipeline.is_empty();
        self.base_pipeline = spec.pipeline;
        self.register_binding(&alias_lower);
        self.register_binding(&name_lower);
        Ok(())
    }

    fn register_base_subquery(&mut self, sub: &'a SubqueryTable) -> Result<(), Error> {
        let query = translate_select_with_ctes(&sub.select, self.stores, &self.ctes)?;
        let alias_lower = sub
            .alias
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_lowercase();
        if !self.base_alias.is_empty()
            && !alias_lower.is_empty()
            && self.base_alias != alias_lower
        {
            return Err(bad_request(
                "translator: multiple base tables are not supported",
            ));
        }
        self.base_uses_pipeline = true;
        self.base_pipeline = query;
        self.base_filter.clear();
        if !alias_lower.is_empty() {
            self.base_alias = alias_lower.clone();
            self.register_binding(&alias_lower);
        }
        Ok(())
    }

    fn process_join(&mut self, join: &'a JoinExpr) -> Result<Vec<String>, Error> {
        if !matches!(join.join_type, JoinType::Inner | JoinType::Left) {
            return Err(bad_request(
                "translator: only INNER and LEFT JOIN are supported",
            ));
        }

        let mut pipes = match &join.left {
            TableExpr::Table(table) => {
                self.register_base_table(table)?;
                Vec::new()
            }
            TableExpr::Subquery(sub) => {
                self.register_base_subquery(sub)?;
                Vec::new()
            }
            TableExpr::Join(inner) => self.process_join(inner)?,
        };

        let mut right_alias = String::new();
        let mut right_query = String::new();
        let mut right_simple = false;
        let mut right_base_filters: Vec<String> = Vec::new();

        match &join.right {
            TableExpr::Table(rt) => {
                let Some(name) = rt.name.last() else {
                    return Err(bad_request("translator: invalid JOIN table"));
                };
                let name = name.to_string();
                let name_lower = name.to_lowercase();
                let alias = match rt.alias.as_deref().map(str::trim) {
                    Some(alias) if !alias.is_empty() => alias.to_string(),
                    _ => name.clone(),
                };
                right_alias = alias.to_lowercase();
                if self.bindings.contains(&right_alias) {
                    return Err(bad_request(format!(
                        "translator: duplicate table alias {alias:?}"
                    )));
                }

                let mut resolved = false;
                if let Some(query) = self.ctes.get(&name_lower) {
                    right_query = query.clone();
                    self.register_binding(&right_alias);
                    self.register_binding(&name_lower);
                    resolved = true;
                }

                let mut view_attempted = false;
                let mut view_display = String::new();
                if !resolved {
                    if let Some(views) = self.stores.views() {
                        let loaded = views.load(&rt.name.parts)?;
                        view_attempted = true;
                        view_display = ViewStore::display_name(&rt.name.parts);
                        if let Some(query) = loaded {
                            right_query = query;
                            self.register_binding(&right_alias);
                            self.register_binding(&name_lower);
                            resolved = true;
                        }
                    }
                }

                if !resolved {
                    let Some(expr) = self.stores.tables().get(&name_lower) else {
                        if view_attempted {
                            return Err(not_found(format!(
                                "translator: view {view_display} not found"
                            )));
                        }
                        let available = self.stores.tables().list().join(", ");
                        return Err(not_found(format!(
                            "translator: JOIN table {:?} is not configured (available: {})",
                            rt.name.display(),
                            available
                        )));
                    };
                    if rt.alias.as_deref().map(str::trim).unwrap_or("").is_empty() {
                        return Err(bad_request("translator: JOINed table requires alias"));
                    }
                    self.register_binding(&right_alias);
                    self.register_binding(&name_lower);
                    let spec = TableSpec::new(expr);
                    if !spec.pipeline.is_empty() {
                        right_query = spec.pipeline;
                    } else {
                        right_simple = true;
                        if !spec.filter.is_empty() && spec.filter != "*" {
                            right_base_filters.push(spec.filter);
                        }
                    }
                }
            }
            TableExpr::Subquery(rt) => {
                let alias = rt.alias.as_deref().map(str::trim).unwrap_or("");
                right_alias = alias.to_lowercase();
                if !right_alias.is_empty() {
                    if self.bindings.contains(&right_alias) {
                        return Err(bad_request(format!(
                            "translator: duplicate table alias {alias:?}"
                        )));
                    }
                    self.register_binding(&right_alias);
                }
                right_query = translate_select_with_ctes(&rt.select, self.stores, &self.ctes)
                    .map_err(|err| {
                        bad_request(format!(
                            "translator: failed to translate JOIN subquery: {err}"
                        ))
                    })?;
            }
            TableExpr::Join(_) => {
                return Err(bad_request(
                    "translator: unsupported JOIN right side",
                ));
            }
        }

        let (join_keys, left_filters, right_filters) =
            self.extract_join_spec(join.on.as_ref(), &right_alias)?;
        if join_keys.is_empty() {
            return Err(bad_request(
                "translator: JOIN requires equality condition between tables",
            ));
        }

        self.pending_left_filters.extend(left_filters);

        let mut parts = right_base_filters;
        for expr in right_filters {
            let allowed: HashSet<String> = [right_alias.clone()].into_iter().collect();
            self.ensure_aliases(expr, &allowed)?;
            parts.push(self.translate_expr(expr)?);
        }
        let combined = match parts.len() {
            0 => "*".to_string(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(" AND ")),
        };
        if right_simple {
            right_query = combined;
        } else if combined != "*" {
            right_query = format!("{right_query} | filter {combined}");
        }

        let suffix = if join.join_type == JoinType::Inner {
            " inner"
        } else {
            ""
        };
        pipes.push(format!(
            "join by ({}) ({}){}",
            join_keys.join(", "),
            right_query,
            suffix
        ));
        Ok(pipes)
    }

    /// Splits an ON clause into join keys, filters on the base side, and
    /// filters on the joined side.
    #[allow(clippy::type_complexity)]
    fn extract_join_spec(
        &self,
        cond: Option<&'a Expr>,
        right_alias: &str,
    ) -> Result<(Vec<String>, Vec<&'a Expr>, Vec<&'a Expr>), Error> {
        let Some(on) = cond else {
            return Err(bad_request("translator: JOIN must include ON clause"));
        };

        let conjuncts = flatten_and(on);
        let mut join_keys = Vec::new();
        let mut left_filters = Vec::new();
        let mut right_filters = Vec::new();

        for expr in conjuncts {
            let Expr::Binary { left, op, right } = expr else {
                return Err(bad_request(format!(
                    "translator: unsupported JOIN condition {}",
                    expr_kind_name(expr)
                )));
            };

            if *op == BinaryOp::Eq {
                if let (Expr::Identifier(left_ident), Expr::Identifier(right_ident)) =
                    (left.as_ref(), right.as_ref())
                {
                    if self.is_join_key_pair(left_ident, right_ident, right_alias) {
                        let left_field = self.normalize_identifier(left_ident)?;
                        let right_field = self.normalize_identifier(right_ident)?;
                        if left_field != right_field {
                            return Err(bad_request(format!(
                                "translator: JOIN keys must use identical field names \
                                 ({left_field} vs {right_field})"
                            )));
                        }
                        join_keys.push(left_field);
                        continue;
                    }
                }
            }

            let left_aliases = self.aliases_for_expr(left);
            let right_aliases = self.aliases_for_expr(right);

            if self.is_alias_only(&left_aliases, &self.base_alias) && right_aliases.is_empty() {
                left_filters.push(expr);
                continue;
            }
            if self.is_alias_only(&right_aliases, &self.base_alias) && left_aliases.is_empty() {
                left_filters.push(expr);
                continue;
            }
            if self.is_alias_only(&left_aliases, right_alias) && right_aliases.is_empty() {
                right_filters.push(expr);
                continue;
            }
            if self.is_alias_only(&right_aliases, right_alias) && left_aliases.is_empty() {
                right_filters.push(expr);
                continue;
            }

            if self.is_alias_only(&left_aliases, &self.base_alias)
                && self.is_alias_only(&right_aliases, right_alias)
            {
                return Err(bad_request(format!(
                    "translator: JOIN condition {} must be simple equality between tables",
                    render_expr(expr)
                )));
            }

            return Err(bad_request(format!(
                "translator: unsupported JOIN condition {}",
                render_expr(expr)
            )));
        }

        Ok((join_keys, left_filters, right_filters))
    }

    fn is_join_key_pair(
        &self,
        left: &Identifier,
        right: &Identifier,
        right_alias: &str,
    ) -> bool {
        let left_qual = self.qualifier_for_identifier(left);
        let right_qual = self.qualifier_for_identifier(right);
        if left_qual == self.base_alias && right_qual == right_alias {
            return true;
        }
        if left_qual == right_alias && right_qual == self.base_alias {
            return true;
        }
        if right_alias.is_empty() {
            // An alias-less joined subquery owns unqualified field names.
            let left_explicit = self.explicit_qualifier(left);
            let right_explicit = self.explicit_qualifier(right);
            if left_explicit.as_deref() == Some(self.base_alias.as_str())
                && right_explicit.is_none()
            {
                return true;
            }
            if right_explicit.as_deref() == Some(self.base_alias.as_str())
                && left_explicit.is_none()
            {
                return true;
            }
        }
        false
    }

    /// Returns the binding that owns an identifier: its first segment when
    /// that segment is a known binding, the base alias otherwise.
    fn qualifier_for_identifier(&self, ident: &Identifier) -> String {
        if let Some(first) = ident.parts.first() {
            let first = first.to_lowercase();
            if self.bindings.contains(&first) {
                return first;
            }
        }
        self.base_alias.clone()
    }

    /// Returns the first segment only when it names a known binding on a
    /// qualified identifier.
    fn explicit_qualifier(&self, ident: &Identifier) -> Option<String> {
        if ident.parts.len() > 1 {
            let first = ident.parts[0].to_lowercase();
            if self.bindings.contains(&first) {
                return Some(first);
            }
        }
        None
    }

    fn aliases_for_expr(&self, expr: &Expr) -> HashSet<String> {
        let mut aliases = HashSet::new();
        walk_expr(expr, &mut |e| {
            if let Expr::Identifier(ident) = e {
                aliases.insert(self.qualifier_for_identifier(ident));
            }
        });
        aliases.remove("");
        aliases
    }

    fn is_alias_only(&self, aliases: &HashSet<String>, alias: &str) -> bool {
        !alias.is_empty() && aliases.len() == 1 && aliases.contains(alias)
    }

    fn ensure_base_aliases_only(&self, expr: &Expr) -> Result<(), Error> {
        let allowed: HashSet<String> = [self.base_alias.clone()].into_iter().collect();
        self.ensure_aliases(expr, &allowed)
    }

    fn ensure_aliases(&self, expr: &Expr, allowed: &HashSet<String>) -> Result<(), Error> {
        for alias in self.aliases_for_expr(expr) {
            if !allowed.contains(&alias) {
                return Err(bad_request(format!(
                    "translator: expression references unsupported alias {alias:?}"
                )));
            }
        }
        Ok(())
    }

    // ==================== GROUP BY and aggregates ====================

    fn build_stats_pipe(
        &mut self,
        stmt: &'a SelectStatement,
    ) -> Result<(Vec<String>, bool), Error> {
        let has_group = !stmt.group_by.is_empty();
        let mut aggregates: Vec<AggItem> = Vec::new();
        let mut group_fields: Vec<String> = Vec::new();
        let mut group_lookup: HashSet<String> = HashSet::new();
        let mut pre_group_pipes: Vec<String> = Vec::new();

        if has_group {
            let mut aliases: HashMap<String, String> = HashMap::new();
            for (index, group_expr) in stmt.group_by.iter().enumerate() {
                let resolved = resolve_group_alias(group_expr, &stmt.columns);
                let expr_key = render_expr(resolved);
                if let Some(existing) = aliases.get(&expr_key) {
                    group_fields.push(existing.clone());
                    group_lookup.insert(existing.clone());
                    continue;
                }
                let (field_name, pipes) = self.prepare_group_by_field(resolved, index)?;
                group_fields.push(field_name.clone());
                group_lookup.insert(field_name.clone());
                pre_group_pipes.extend(pipes);
                aliases.insert(expr_key, field_name);
            }
            self.group_expr_aliases = Some(aliases);
        } else {
            self.group_expr_aliases = None;
        }

        for col in &stmt.columns {
            match &col.expr {
                Expr::Star(_) => {
                    if stmt.columns.len() > 1 {
                        return Err(bad_request(
                            "translator: SELECT * cannot be mixed with other columns",
                        ));
                    }
                    if has_group {
                        return Err(bad_request(
                            "translator: SELECT * not supported with GROUP BY",
                        ));
                    }
                    return Ok((Vec::new(), false));
                }
                Expr::Identifier(ident) => {
                    if !has_group {
                        continue;
                    }
                    let field = self.normalize_identifier(ident)?;
                    if !group_lookup.contains(&field) {
                        return Err(bad_request(format!(
                            "translator: column {field} must appear in GROUP BY"
                        )));
                    }
                }
                Expr::FuncCall(call) => {
                    if call.over.is_some() {
                        if has_group {
                            return Err(bad_request(
                                "translator: window functions are not supported with GROUP BY",
                            ));
                        }
                        continue;
                    }
                    if is_aggregate_function(call) {
                        let item = self.analyze_aggregate(call, col.alias.as_deref())?;
                        aggregates.push(item);
                    } else if has_group && self.lookup_group_expr(&col.expr)?.is_none() {
                        return Err(bad_request(format!(
                            "translator: non-aggregate function {} must appear in GROUP BY",
                            render_expr(&col.expr)
                        )));
                    }
                }
                Expr::Binary { .. } | Expr::Unary { .. } | Expr::Numeric(_) => {
                    if has_group && self.lookup_group_expr(&col.expr)?.is_none() {
                        return Err(bad_request(format!(
                            "translator: expression {} must appear in GROUP BY",
                            render_expr(&col.expr)
                        )));
                    }
                }
                other => {
                    if has_group {
                        return Err(bad_request(format!(
                            "translator: unsupported select expression {}",
                            expr_kind_name(other)
                        )));
                    }
                }
            }
        }

        if aggregates.is_empty() {
            if has_group {
                return Err(bad_request(
                    "translator: GROUP BY requires aggregate expressions",
                ));
            }
            return Ok((Vec::new(), false));
        }

        let mut stats = String::from("stats");
        if !group_fields.is_empty() {
            stats.push_str(&format!(" by ({})", group_fields.join(", ")));
        }

        let mut funcs = Vec::with_capacity(aggregates.len());
        let mut agg_results = HashMap::new();
        for agg in &aggregates {
            funcs.push(agg.stats_call.clone());
            agg_results.insert(agg.key.clone(), agg.result_name.clone());
        }
        stats.push(' ');
        stats.push_str(&funcs.join(", "));

        self.agg_results = Some(agg_results);
        let mut pipes = pre_group_pipes;
        pipes.push(stats);
        Ok((pipes, true))
    }

    fn prepare_group_by_field(
        &mut self,
        expr: &Expr,
        index: usize,
    ) -> Result<(String, Vec<String>), Error> {
        match expr {
            Expr::Identifier(ident) => Ok((self.normalize_identifier(ident)?, Vec::new())),
            Expr::FuncCall(call) => {
                if is_aggregate_function(call) {
                    return Err(bad_request(
                        "translator: aggregate functions are not allowed in GROUP BY",
                    ));
                }
                let alias = format!("group_{}", index + 1);
                if let Some((pipes, alias_name)) =
                    self.translate_string_function(call, Some(&alias))?
                {
                    return Ok((alias_name, pipes));
                }
                let (pipe, alias_name) = self.translate_math_projection(expr, Some(&alias))?;
                Ok((alias_name, vec![pipe]))
            }
            Expr::Binary { .. } | Expr::Unary { .. } | Expr::Numeric(_) => {
                let alias = format!("group_{}", index + 1);
                let (pipe, alias_name) = self.translate_math_projection(expr, Some(&alias))?;
                Ok((alias_name, vec![pipe]))
            }
            other => Err(bad_request(format!(
                "translator: unsupported GROUP BY expression {}",
                expr_kind_name(other)
            ))),
        }
    }

    fn lookup_group_expr(&self, expr: &Expr) -> Result<Option<String>, Error> {
        let Some(aliases) = &self.group_expr_aliases else {
            return Ok(None);
        };
        Ok(aliases.get(&render_expr(expr)).cloned())
    }

    fn analyze_aggregate(
        &self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<AggItem, Error> {
        if call.distinct {
            return Err(bad_request(
                "translator: DISTINCT aggregates are not supported",
            ));
        }
        let Some(name) = call.name.last() else {
            return Err(bad_request("translator: invalid aggregate function"));
        };
        let name = name.to_uppercase();
        let arg = self.aggregate_argument(&name, call)?;

        let key = aggregate_key(&name, &arg);
        let fn_call = format!("{}({})", name.to_lowercase(), format_aggregate_arg(&arg));
        match alias.map(str::trim).filter(|a| !a.is_empty()) {
            None => Ok(AggItem {
                key,
                result_name: fn_call.clone(),
                stats_call: fn_call,
            }),
            Some(alias) => {
                let formatted = format_field_name(alias);
                Ok(AggItem {
                    key,
                    stats_call: format!("{fn_call} {formatted}"),
                    result_name: formatted,
                })
            }
        }
    }

    /// Validates an aggregate call and returns its argument field (`*` for
    /// `COUNT(*)`).
    fn aggregate_argument(&self, name: &str, call: &FuncCall) -> Result<String, Error> {
        match name {
            "COUNT" => match call.args.as_slice() {
                [] | [Expr::Star(_)] => Ok("*".to_string()),
                [Expr::Identifier(ident)] => self.normalize_identifier(ident),
                [_] => Err(bad_request(
                    "translator: COUNT only supports identifiers or *",
                )),
                _ => Err(bad_request("translator: COUNT expects single argument")),
            },
            "SUM" | "AVG" | "MIN" | "MAX" => match call.args.as_slice() {
                [Expr::Identifier(ident)] => self.normalize_identifier(ident),
                [_] => Err(bad_request(format!(
                    "translator: {} only supports identifiers",
                    name.to_lowercase()
                ))),
                _ => Err(bad_request(format!(
                    "translator: {} expects single argument",
                    name.to_lowercase()
                ))),
            },
            _ => Err(bad_request(format!(
                "translator: unsupported aggregate {name}"
            ))),
        }
    }

    fn aggregate_key_from_func(&self, call: &FuncCall) -> Result<String, Error> {
        let Some(name) = call.name.last() else {
            return Err(bad_request("translator: invalid aggregate"));
        };
        let name = name.to_uppercase();
        let arg = self.aggregate_argument(&name, call)?;
        Ok(aggregate_key(&name, &arg))
    }

    // ==================== Scalar functions ====================

    /// Lowers a supported string/scalar function to its stages.
    ///
    /// Returns `Ok(None)` when the function name is not one of the string
    /// functions; errors are returned only for supported names with bad
    /// arguments.
    fn translate_string_function(
        &mut self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<Option<(Vec<String>, String)>, Error> {
        let Some(name) = call.name.last() else {
            return Err(bad_request("translator: invalid function expression"));
        };
        let name = name.to_uppercase();
        match name.as_str() {
            "UPPER" | "LOWER" => {
                let ident = single_identifier_arg(call, &name)?;
                let raw_field = self.raw_field_name(ident)?;
                let alias_name =
                    make_projection_alias(alias, &name.to_lowercase(), &raw_field)?;
                let modifier = if name == "LOWER" { "lc" } else { "uc" };
                let pattern = format!("<{modifier}:{raw_field}>");
                let pipe = format!(
                    "format \"{}\" as {}",
                    escape_format_pattern(&pattern),
                    alias_name
                );
                Ok(Some((vec![pipe], alias_name)))
            }
            "TRIM" | "LTRIM" | "RTRIM" => {
                let ident = single_identifier_arg(call, &name)?;
                let raw_field = self.raw_field_name(ident)?;
                let alias_name =
                    make_projection_alias(alias, &name.to_lowercase(), &raw_field)?;
                let pattern = build_trim_pattern(&name, &alias_name);
                let pipe = format!(
                    "extract_regexp '{}' from {}",
                    escape_single_quotes(&pattern),
                    raw_field
                );
                Ok(Some((vec![pipe], alias_name)))
            }
            "SUBSTR" | "SUBSTRING" => {
                Ok(Some(self.translate_substring_function(call, alias)?))
            }
            "CONCAT" => Ok(Some(self.translate_concat_function(call, alias)?)),
            "REPLACE" => Ok(Some(self.translate_replace_function(call, alias)?)),
            "CURRENT_TIMESTAMP" => Ok(Some(self.translate_current_timestamp(alias)?)),
            "CURRENT_DATE" => Ok(Some(self.translate_current_date(alias)?)),
            _ => Ok(None),
        }
    }

    fn translate_substring_function(
        &mut self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        if call.args.len() < 2 || call.args.len() > 3 {
            return Err(bad_request(
                "translator: substr expects two or three arguments",
            ));
        }
        let Expr::Identifier(ident) = &call.args[0] else {
            return Err(bad_request(
                "translator: substr only supports identifiers as first argument",
            ));
        };
        let raw_field = self.raw_field_name(ident)?;
        let start = parse_substring_int_arg(&call.args[1], "start")?;
        if start < 1 {
            return Err(bad_request("translator: substr start must be >= 1"));
        }
        let alias_name = make_projection_alias(alias, "substr", &raw_field)?;
        let start_index = start - 1;
        let pattern = if call.args.len() == 3 {
            let length = parse_substring_int_arg(&call.args[2], "length")?;
            if length < 0 {
                return Err(bad_request("translator: substr length must be >= 0"));
            }
            format!("(?s)^.{{{start_index}}}(?P<{alias_name}>.{{0,{length}}})")
        } else {
            format!("(?s)^.{{{start_index}}}(?P<{alias_name}>.*)$")
        };
        let pipe = format!(
            "extract_regexp '{}' from {}",
            escape_single_quotes(&pattern),
            raw_field
        );
        Ok((vec![pipe], alias_name))
    }

    fn translate_concat_function(
        &mut self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        if call.args.is_empty() {
            return Err(bad_request(
                "translator: concat expects at least one argument",
            ));
        }
        let alias_source = match &call.args[0] {
            Expr::Identifier(ident) => self.raw_field_name(ident)?,
            _ => "expr".to_string(),
        };
        let alias_name = make_projection_alias(alias, "concat", &alias_source)?;
        let mut pattern = String::new();
        for arg in &call.args {
            pattern.push_str(&self.concat_segment(arg)?);
        }
        let pipe = format!(
            "format \"{}\" as {}",
            escape_format_pattern(&pattern),
            alias_name
        );
        Ok((vec![pipe], alias_name))
    }

    fn concat_segment(&self, expr: &Expr) -> Result<String, Error> {
        match expr {
            Expr::String(value) | Expr::Numeric(value) => Ok(value.clone()),
            Expr::Boolean(true) => Ok("true".to_string()),
            Expr::Boolean(false) => Ok("false".to_string()),
            Expr::Null => Ok(String::new()),
            Expr::Identifier(ident) => {
                let field = self.raw_field_name(ident)?;
                Ok(format!("<{field}>"))
            }
            other => Err(bad_request(format!(
                "translator: CONCAT argument {} is not supported",
                expr_kind_name(other)
            ))),
        }
    }

    fn translate_replace_function(
        &mut self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        if call.args.len() != 3 {
            return Err(bad_request("translator: replace expects three arguments"));
        }
        let Expr::Identifier(ident) = &call.args[0] else {
            return Err(bad_request(
                "translator: replace only supports identifiers as first argument",
            ));
        };
        let raw_field = self.raw_field_name(ident)?;
        let search = literal_from_expr(&call.args[1])?;
        let replacement = literal_from_expr(&call.args[2])?;
        let alias_name = make_projection_alias(alias, "replace", &raw_field)?;
        let pattern = format!("<{raw_field}>");
        let copy_pipe = format!(
            "format \"{}\" as {}",
            escape_format_pattern(&pattern),
            alias_name
        );
        let replace_pipe = format!(
            "replace ('{}', '{}') at {}",
            escape_single_quotes(&search.value),
            escape_single_quotes(&replacement.value),
            alias_name
        );
        Ok((vec![copy_pipe, replace_pipe], alias_name))
    }

    fn translate_current_timestamp(
        &self,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        let alias_name = make_simple_alias(alias, "current_timestamp")?;
        let tmp_field = format!("{alias_name}_nanos");
        if !is_safe_format_field(&tmp_field) {
            return Err(bad_request(format!(
                "translator: alias {alias_name} produces unsupported field name"
            )));
        }
        let pipes = vec![
            format!("math now() as {tmp_field}"),
            format!("format '<time:{tmp_field}>' as {alias_name}"),
            format!("delete {tmp_field}"),
        ];
        Ok((pipes, alias_name))
    }

    fn translate_current_date(
        &self,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        let alias_name = make_simple_alias(alias, "current_date")?;
        let nanos_field = format!("{alias_name}_nanos");
        let formatted_field = format!("{alias_name}_formatted");
        if !is_safe_format_field(&nanos_field) || !is_safe_format_field(&formatted_field) {
            return Err(bad_request(format!(
                "translator: alias {alias_name} produces unsupported field name"
            )));
        }
        let pattern = format!("^(?P<{alias_name}>[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}})");
        let pipes = vec![
            format!("math now() as {nanos_field}"),
            format!("format '<time:{nanos_field}>' as {formatted_field}"),
            format!(
                "extract_regexp '{}' from {}",
                escape_single_quotes(&pattern),
                formatted_field
            ),
            format!("delete {nanos_field}, {formatted_field}"),
        ];
        Ok((pipes, alias_name))
    }

    // ==================== Window functions ====================

    fn translate_window_function(
        &mut self,
        call: &FuncCall,
        alias: Option<&str>,
    ) -> Result<(Vec<String>, String), Error> {
        let Some(over) = &call.over else {
            return Err(bad_request("translator: invalid window function"));
        };
        if call.distinct {
            return Err(bad_request(
                "translator: DISTINCT window functions are not supported",
            ));
        }
        let Some(name) = call.name.last() else {
            return Err(bad_request("translator: invalid window function"));
        };
        let name = name.to_uppercase();

        let (stats_call, alias_source) = match name.as_str() {
            "SUM" | "MIN" | "MAX" => {
                if call.args.len() != 1 {
                    return Err(bad_request(format!(
                        "translator: {} window function expects single argument",
                        name.to_lowercase()
                    )));
                }
                self.ensure_base_aliases_only(&call.args[0])?;
                let Expr::Identifier(ident) = &call.args[0] else {
                    return Err(bad_request(format!(
                        "translator: {} window function requires identifier argument",
                        name.to_lowercase()
                    )));
                };
                let field = self.normalize_identifier(ident)?;
                (format!("{}({})", name.to_lowercase(), field), field)
            }
            "COUNT" => match call.args.as_slice() {
                [] | [Expr::Star(_)] => ("count()".to_string(), name.to_lowercase()),
                [arg @ Expr::Identifier(ident)] => {
                    self.ensure_base_aliases_only(arg)?;
                    let field = self.normalize_identifier(ident)?;
                    (format!("count({field})"), field)
                }
                [_] => {
                    return Err(bad_request(
                        "translator: COUNT window function only supports identifiers or *",
                    ));
                }
                _ => {
                    return Err(bad_request(
                        "translator: COUNT window function expects zero or one argument",
                    ));
                }
            },
            _ => {
                return Err(bad_request(format!(
                    "translator: window function {name} is not supported"
                )));
            }
        };

        let alias_source = if alias_source.trim().is_empty() {
            name.to_lowercase()
        } else {
            alias_source
        };
        let alias_name = make_projection_alias(alias, &name.to_lowercase(), &alias_source)?;

        let mut partition_clause = String::new();
        if !over.partition_by.is_empty() {
            let mut fields = Vec::with_capacity(over.partition_by.len());
            for expr in &over.partition_by {
                self.ensure_base_aliases_only(expr)?;
                let Expr::Identifier(ident) = expr else {
                    return Err(bad_request(
                        "translator: PARTITION BY only supports identifiers",
                    ));
                };
                fields.push(self.normalize_identifier(ident)?);
            }
            partition_clause = format!(" by ({})", fields.join(", "));
        }

        let mut pipes = Vec::new();
        if !over.order_by.is_empty() {
            for item in &over.order_by {
                self.ensure_base_aliases_only(&item.expr)?;
            }
            pipes.push(self.translate_order_by(&over.order_by, false)?);
        }
        pipes.push(format!(
            "running_stats{partition_clause} {stats_call} as {alias_name}"
        ));
        Ok((pipes, alias_name))
    }

    // ==================== Math expressions ====================

    fn translate_math_projection(
        &self,
        expr: &Expr,
        alias: Option<&str>,
    ) -> Result<(String, String), Error> {
        let math_expr = self.math_expr_to_string(expr)?;
        let alias_name = make_projection_alias(alias, "expr", &math_expr)?;
        Ok((format!("math {math_expr} as {alias_name}"), alias_name))
    }

    fn math_expr_to_string(&self, expr: &Expr) -> Result<String, Error> {
        match expr {
            Expr::Numeric(value) => Ok(value.clone()),
            Expr::Identifier(ident) => self.raw_field_name(ident),
            Expr::Unary { op, expr } => {
                if *op != UnaryOp::Neg {
                    return Err(bad_request(format!(
                        "translator: unsupported unary operator {:?} in math expression",
                        op.as_str()
                    )));
                }
                let inner = self.math_expr_to_string(expr)?;
                Ok(format!("-({inner})"))
            }
            Expr::Binary { left, op, right } => {
                if !is_math_operator(*op) {
                    return Err(bad_request(format!(
                        "translator: unsupported operator {:?} in math expression",
                        op.as_str()
                    )));
                }
                let left = self.math_expr_to_string(left)?;
                let right = self.math_expr_to_string(right)?;
                Ok(format!("({} {} {})", left, op.as_str(), right))
            }
            Expr::FuncCall(call) => self.math_func_to_string(call),
            other => Err(bad_request(format!(
                "translator: unsupported math expression {}",
                expr_kind_name(other)
            ))),
        }
    }

    fn math_func_to_string(&self, call: &FuncCall) -> Result<String, Error> {
        let Some(name) = call.name.last() else {
            return Err(bad_request("translator: invalid math function"));
        };
        let name = name.to_uppercase();
        let lower = name.to_lowercase();
        match name.as_str() {
            "ABS" | "CEIL" | "FLOOR" | "EXP" | "LN" => {
                if call.args.len() != 1 {
                    return Err(bad_request(format!(
                        "translator: {lower} expects single argument"
                    )));
                }
                let arg = self.math_expr_to_string(&call.args[0])?;
                Ok(format!("{lower}({arg})"))
            }
            "ROUND" => {
                if call.args.is_empty() || call.args.len() > 2 {
                    return Err(bad_request(
                        "translator: round expects one or two arguments",
                    ));
                }
                let arg = self.math_expr_to_string(&call.args[0])?;
                if call.args.len() == 1 {
                    return Ok(format!("round({arg})"));
                }
                let nearest = self.math_expr_to_string(&call.args[1])?;
                Ok(format!("round({arg}, {nearest})"))
            }
            "POWER" | "POW" => {
                if call.args.len() != 2 {
                    return Err(bad_request(format!(
                        "translator: {lower} expects two arguments"
                    )));
                }
                let base = self.math_expr_to_string(&call.args[0])?;
                let exponent = self.math_expr_to_string(&call.args[1])?;
                Ok(format!("({base} ^ {exponent})"))
            }
            "MAX" | "MIN" | "GREATEST" | "LEAST" => {
                if call.args.is_empty() {
                    return Err(bad_request(format!(
                        "translator: {lower} expects at least one argument"
                    )));
                }
                let mut parts = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    parts.push(self.math_expr_to_string(arg)?);
                }
                let func_name = match name.as_str() {
                    "GREATEST" => "max",
                    "LEAST" => "min",
                    _ => lower.as_str(),
                };
                Ok(format!("{}({})", func_name, parts.join(", ")))
            }
            _ => Err(bad_request(format!(
                "translator: unsupported function {name} in math expression"
            ))),
        }
    }

    // ==================== Projection ====================

    fn build_projection_pipes(
        &mut self,
        columns: &'a [SelectItem],
        aggregated: bool,
    ) -> Result<(Vec<String>, Vec<String>), Error> {
        if columns.len() == 1 {
            if let Expr::Star(_) = columns[0].expr {
                return Ok((Vec::new(), Vec::new()));
            }
        }

        let mut computed_pipes: Vec<String> = Vec::new();
        let mut rename_pairs: Vec<String> = Vec::new();
        let mut fields: Vec<String> = Vec::new();

        for col in columns {
            let alias = col.alias.as_deref();
            match &col.expr {
                Expr::Identifier(ident) => {
                    let upper = ident.display().to_uppercase();
                    if upper == "CURRENT_TIMESTAMP" || upper == "CURRENT_DATE" {
                        let (pipes, alias_name) = if upper == "CURRENT_TIMESTAMP" {
                            self.translate_current_timestamp(alias)?
                        } else {
                            self.translate_current_date(alias)?
                        };
                        computed_pipes.extend(pipes);
                        fields.push(format_field_name(&alias_name));
                        continue;
                    }
                    let field = self.normalize_identifier(ident)?;
                    let mut final_name = field.clone();
                    if let Some(alias) = alias.map(str::trim).filter(|a| !a.is_empty()) {
                        let formatted = format_field_name(alias);
                        rename_pairs.push(format!("{field} as {formatted}"));
                        final_name = formatted;
                    }
                    fields.push(final_name);
                }
                Expr::FuncCall(call) => {
                    if call.over.is_some() {
                        if aggregated {
                            return Err(bad_request(
                                "translator: window functions are not supported with GROUP BY",
                            ));
                        }
                        let (pipes, alias_name) = self.translate_window_function(call, alias)?;
                        computed_pipes.extend(pipes);
                        fields.push(format_field_name(&alias_name));
                        continue;
                    }
                    if aggregated && is_aggregate_function(call) {
                        match alias.map(str::trim).filter(|a| !a.is_empty()) {
                            Some(alias) => fields.push(format_field_name(alias)),
                            None => {
                                let key = self.aggregate_key_from_func(call)?;
                                let name = self
                                    .agg_results
                                    .as_ref()
                                    .and_then(|results| results.get(&key).cloned())
                                    .unwrap_or(key);
                                fields.push(name);
                            }
                        }
                        continue;
                    }

                    if aggregated {
                        let Some(group_field) = self.lookup_group_expr(&col.expr)? else {
                            return Err(bad_request(format!(
                                "translator: unsupported function {} in aggregated select",
                                render_expr(&col.expr)
                            )));
                        };
                        let mut final_name = group_field.clone();
                        if let Some(alias) = alias.map(str::trim).filter(|a| !a.is_empty()) {
                            let formatted = format_field_name(alias);
                            if formatted != group_field {
                                rename_pairs.push(format!("{group_field} as {formatted}"));
                            }
                            final_name = formatted;
                        }
                        fields.push(final_name);
                        continue;
                    }

                    if let Some((pipes, alias_name)) =
                        self.translate_string_function(call, alias)?
                    {
                        computed_pipes.extend(pipes);
                        fields.push(format_field_name(&alias_name));
                        continue;
                    }
                    let (pipe, alias_name) = self.translate_math_projection(&col.expr, alias)?;
                    computed_pipes.push(pipe);
                    fields.push(format_field_name(&alias_name));
                }
                Expr::Binary { .. } | Expr::Unary { .. } | Expr::Numeric(_) => {
                    if aggregated {
                        let Some(group_field) = self.lookup_group_expr(&col.expr)? else {
                            return Err(bad_request(format!(
                                "translator: unsupported expression {} in aggregated select",
                                expr_kind_name(&col.expr)
                            )));
                        };
                        let mut final_name = group_field.clone();
                        if let Some(alias) = alias.map(str::trim).filter(|a| !a.is_empty()) {
                            let formatted = format_field_name(alias);
                            if formatted != group_field {
                                rename_pairs.push(format!("{group_field} as {formatted}"));
                            }
                            final_name = formatted;
                        }
                        fields.push(final_name);
                        continue;
                    }
                    let (pipe, alias_name) = self.translate_math_projection(&col.expr, alias)?;
                    computed_pipes.push(pipe);
                    fields.push(format_field_name(&alias_name));
                }
                Expr::Star(_) => {
                    return Err(bad_request(
                        "translator: SELECT * cannot be combined with other projections",
                    ));
                }
                other => {
                    return Err(bad_request(format!(
                        "translator: unsupported projection expression {}",
                        expr_kind_name(other)
                    )));
                }
            }
        }

        let mut pipes = computed_pipes;
        if !rename_pairs.is_empty() {
            pipes.push(format!("rename {}", rename_pairs.join(", ")));
        }
        if !fields.is_empty() && !aggregated {
            pipes.push(format!("fields {}", fields.join(", ")));
        }
        Ok((pipes, fields))
    }

    fn build_distinct_pipe(&self, fields: &[String], aggregated: bool) -> Result<String, Error> {
        if aggregated {
            return Err(bad_request(
                "translator: DISTINCT with aggregates is not supported",
            ));
        }
        if fields.is_empty() {
            return Err(bad_request(
                "translator: DISTINCT requires explicit column list",
            ));
        }
        Ok(format!("uniq by ({})", fields.join(", ")))
    }

    // ==================== ORDER BY and LIMIT ====================

    fn translate_order_by(
        &self,
        items: &[OrderItem],
        aggregated: bool,
    ) -> Result<String, Error> {
        let mut clauses = Vec::with_capacity(items.len());
        for item in items {
            let field = match &item.expr {
                Expr::Identifier(ident) => self.normalize_identifier(ident)?,
                Expr::FuncCall(call) => {
                    if !aggregated {
                        return Err(bad_request(
                            "translator: ORDER BY function requires aggregation",
                        ));
                    }
                    let key = self.aggregate_key_from_func(call)?;
                    let Some(name) = self
                        .agg_results
                        .as_ref()
                        .and_then(|results| results.get(&key).cloned())
                    else {
                        return Err(bad_request(
                            "translator: ORDER BY references unknown aggregate",
                        ));
                    };
                    name
                }
                other => {
                    return Err(bad_request(format!(
                        "translator: ORDER BY expression {} not supported",
                        expr_kind_name(other)
                    )));
                }
            };
            match item.direction {
                OrderDirection::Desc => clauses.push(format!("{field} desc")),
                OrderDirection::Asc => clauses.push(field),
            }
        }
        Ok(format!("sort by ({})", clauses.join(", ")))
    }

    fn translate_limit(&self, limit: &LimitClause) -> Result<Vec<String>, Error> {
        let mut pipes = Vec::with_capacity(2);
        if let Some(offset) = &limit.offset {
            let lit = literal_from_expr(offset).map_err(|err| {
                bad_request(format!("translator: OFFSET expects numeric literal: {err}"))
            })?;
            if lit.kind != LiteralKind::Number {
                return Err(bad_request("translator: OFFSET expects numeric literal"));
            }
            pipes.push(format!("offset {}", lit.value));
        }
        if let Some(count) = &limit.count {
            let lit = literal_from_expr(count).map_err(|err| {
                bad_request(format!("translator: LIMIT expects numeric literal: {err}"))
            })?;
            if lit.kind != LiteralKind::Number {
                return Err(bad_request("translator: LIMIT expects numeric literal"));
            }
            pipes.push(format!("limit {}", lit.value));
        }
        if pipes.is_empty() {
            return Err(bad_request("translator: LIMIT/OFFSET clause is empty"));
        }
        Ok(pipes)
    }

    // ==================== Filter expressions ====================

    fn translate_expr(&mut self, expr: &Expr) -> Result<String, Error> {
        match expr {
            Expr::Binary { left, op, right } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let left = self.translate_expr(left)?;
                    let right = self.translate_expr(right)?;
                    Ok(format!("({left} {} {right})", op.as_str()))
                }
                BinaryOp::Eq => self.translate_comparison(left, right, Comparison::Equal),
                BinaryOp::Neq => self.translate_comparison(left, right, Comparison::NotEqual),
                BinaryOp::Gt => self.translate_comparison(left, right, Comparison::Greater),
                BinaryOp::GtEq => {
                    self.translate_comparison(left, right, Comparison::GreaterEqual)
                }
                BinaryOp::Lt => self.translate_comparison(left, right, Comparison::Less),
                BinaryOp::LtEq => self.translate_comparison(left, right, Comparison::LessEqual),
                other => Err(bad_request(format!(
                    "translator: unsupported operator {:?}",
                    other.as_str()
                ))),
            },
            Expr::Unary { op, expr } => {
                if *op != UnaryOp::Not {
                    return Err(bad_request(format!(
                        "translator: unsupported unary operator {:?}",
                        op.as_str()
                    )));
                }
                let inner = self.translate_expr(expr)?;
                Ok(format!("-({inner})"))
            }
            Expr::In { .. } => self.translate_in_expr(expr),
            Expr::Like { .. } => self.translate_like_expr(expr),
            Expr::IsNull {
                expr: inner,
                negated,
            } => {
                let field = self.filter_field_from_expr(inner)?;
                if *negated {
                    Ok(format!("{field}:*"))
                } else {
                    Ok(format!("{field}:\"\""))
                }
            }
            Expr::Between {
                expr: inner,
                lower,
                upper,
                negated,
            } => {
                let field = self.filter_field_from_expr(inner)?;
                let lower = literal_from_expr(lower)?;
                let upper = literal_from_expr(upper)?;
                let clause = format!("{field}:[{}, {}]", lower.format(), upper.format());
                if *negated {
                    Ok(format!("-{clause}"))
                } else {
                    Ok(clause)
                }
            }
            Expr::FuncCall(call) => {
                if self.agg_results.is_some() {
                    let key = self.aggregate_key_from_func(call)?;
                    if let Some(name) = self
                        .agg_results
                        .as_ref()
                        .and_then(|results| results.get(&key))
                    {
                        return Ok(name.clone());
                    }
                }
                Err(bad_request(
                    "translator: unsupported function expression in filter",
                ))
            }
            Expr::Identifier(ident) => self.normalize_identifier(ident),
            Expr::String(value) => Ok(format_string(value)),
            Expr::Numeric(value) => Ok(value.clone()),
            Expr::Boolean(true) => Ok("true".to_string()),
            Expr::Boolean(false) => Ok("false".to_string()),
            Expr::Null => Err(bad_request(
                "translator: NULL literal is not supported in this context",
            )),
            other => Err(bad_request(format!(
                "translator: unsupported expression {}",
                expr_kind_name(other)
            ))),
        }
    }

    fn translate_comparison(
        &mut self,
        left: &Expr,
        right: &Expr,
        cmp: Comparison,
    ) -> Result<String, Error> {
        let (field, lit, flipped) = self.extract_field_and_literal(left, right)?;
        let op = match cmp {
            Comparison::Equal => return Ok(format!("{field}:{}", lit.format())),
            Comparison::NotEqual => return Ok(format!("-{field}:{}", lit.format())),
            Comparison::Greater => ">",
            Comparison::GreaterEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessEqual => "<=",
        };
        if flipped {
            return Err(bad_request(
                "translator: comparisons must have identifier on left side",
            ));
        }
        Ok(format!("{field}:{op}{}", lit.format()))
    }

    fn translate_in_expr(&mut self, expr: &Expr) -> Result<String, Error> {
        let Expr::In {
            expr: inner,
            list,
            subquery,
            negated,
        } = expr
        else {
            return Err(bad_request("translator: invalid IN expression"));
        };
        if subquery.is_some() {
            return Err(bad_request(
                "translator: IN subqueries are not supported yet",
            ));
        }
        let field = self.filter_field_from_expr(inner)?;
        if list.is_empty() {
            return Err(bad_request("translator: IN list cannot be empty"));
        }
        let mut values = Vec::with_capacity(list.len());
        for item in list {
            values.push(literal_from_expr(item)?.format());
        }
        let clause = format!("{field}:({})", values.join(" OR "));
        if *negated {
            Ok(format!("-{clause}"))
        } else {
            Ok(clause)
        }
    }

    fn translate_like_expr(&mut self, expr: &Expr) -> Result<String, Error> {
        let Expr::Like {
            expr: inner,
            pattern,
            negated,
        } = expr
        else {
            return Err(bad_request("translator: invalid LIKE expression"));
        };
        let field = self.filter_field_from_expr(inner)?;
        let lit = literal_from_expr(pattern)?;
        if lit.kind != LiteralKind::Str {
            return Err(bad_request("translator: LIKE expects string literal"));
        }
        let translated = convert_like_pattern(&lit.value);
        let clause = format!("{field}:{translated}");
        if *negated {
            Ok(format!("-{clause}"))
        } else {
            Ok(clause)
        }
    }

    /// Registers a synthetic pre-computed field for a scalar function used
    /// inside a filter and returns its alias.
    fn ensure_filter_function_alias(
        &mut self,
        expr: &Expr,
        call: &FuncCall,
    ) -> Result<String, Error> {
        if call.name.parts.is_empty() {
            return Err(bad_request("translator: invalid function expression"));
        }
        if is_aggregate_function(call) {
            let name = call.name.last().unwrap_or_default().to_lowercase();
            return Err(bad_request(format!(
                "translator: aggregate function {name} is not supported in this context"
            )));
        }
        let key = render_expr(expr);
        if let Some(comp) = self.filter_computations.get(&key) {
            return Ok(comp.alias.clone());
        }
        let alias_base = format!("__filter_expr_{}", self.filter_order.len() + 1);
        let Some((pipes, alias_name)) =
            self.translate_string_function(call, Some(&alias_base))?
        else {
            let name = call.name.last().unwrap_or_default().to_lowercase();
            return Err(bad_request(format!(
                "translator: function {name} is not supported in filter"
            )));
        };
        let alias = format_field_name(&alias_name);
        self.filter_computations.insert(
            key.clone(),
            FilterComputation {
                alias: alias.clone(),
                pipes,
            },
        );
        self.filter_order.push(key);
        if !self.filter_delete.contains(&alias_name) {
            self.filter_delete.push(alias_name);
        }
        Ok(alias)
    }

    fn filter_field_from_expr(&mut self, expr: &Expr) -> Result<String, Error> {
        match self.field_name_from_expr(expr)? {
            Some(field) => Ok(field),
            None => Err(bad_request(format!(
                "translator: expected identifier, got {}",
                expr_kind_name(expr)
            ))),
        }
    }

    fn field_name_from_expr(&mut self, expr: &Expr) -> Result<Option<String>, Error> {
        match expr {
            Expr::Identifier(ident) => Ok(Some(self.normalize_identifier(ident)?)),
            Expr::FuncCall(call) => {
                if self.agg_results.is_some() {
                    if is_aggregate_function(call) {
                        let key = self.aggregate_key_from_func(call)?;
                        let Some(name) = self
                            .agg_results
                            .as_ref()
                            .and_then(|results| results.get(&key).cloned())
                        else {
                            return Err(bad_request(
                                "translator: unknown aggregate referenced",
                            ));
                        };
                        return Ok(Some(name));
                    }
                    if let Some(group_field) = self.lookup_group_expr(expr)? {
                        return Ok(Some(format_field_name(&group_field)));
                    }
                    return Err(bad_request(format!(
                        "translator: function {} is not supported in aggregated context",
                        render_expr(expr)
                    )));
                }
                Ok(Some(self.ensure_filter_function_alias(expr, call)?))
            }
            _ => Ok(None),
        }
    }

    /// Returns `(field, literal, flipped)` for a comparison; `flipped`
    /// means the identifier was on the right.
    fn extract_field_and_literal(
        &mut self,
        left: &Expr,
        right: &Expr,
    ) -> Result<(String, LiteralValue, bool), Error> {
        if let Some(field) = self.field_name_from_expr(left)? {
            let lit = literal_from_expr(right)?;
            return Ok((field, lit, false));
        }
        if let Some(field) = self.field_name_from_expr(right)? {
            let lit = literal_from_expr(left)?;
            return Ok((field, lit, true));
        }
        Err(bad_request(
            "translator: comparison requires identifier and literal",
        ))
    }

    // ==================== Identifiers ====================

    /// Normalizes an identifier to its emitted field form, stripping the
    /// first segment when it names a known binding and quoting unsafe
    /// characters.
    fn normalize_identifier(&self, ident: &Identifier) -> Result<String, Error> {
        if ident.parts.is_empty() {
            return Err(bad_request("translator: invalid identifier"));
        }
        let mut parts: &[String] = &ident.parts;
        if parts.len() > 1 && self.bindings.contains(&parts[0].to_lowercase()) {
            parts = &parts[1..];
        }
        let field = parts.join(".");
        if field.is_empty() {
            return Err(bad_request("translator: invalid identifier"));
        }
        if is_safe_bare_literal(&field) {
            return Ok(field);
        }
        Ok(quote_string(&field))
    }

    /// Like [`Self::normalize_identifier`] but restricted to names usable
    /// inside `format`/`extract_regexp` patterns.
    fn raw_field_name(&self, ident: &Identifier) -> Result<String, Error> {
        if ident.parts.is_empty() {
            return Err(bad_request("translator: invalid identifier"));
        }
        let mut parts: &[String] = &ident.parts;
        if parts.len() > 1 && self.bindings.contains(&parts[0].to_lowercase()) {
            parts = &parts[1..];
        }
        let field = parts.join(".");
        if !is_safe_format_field(&field) {
            return Err(bad_request(format!(
                "translator: field {field} cannot be used in scalar function"
            )));
        }
        Ok(field)
    }
}

/// Resolves a single-part GROUP BY identifier that names a SELECT alias to
/// the aliased expression.
fn resolve_group_alias<'x>(expr: &'x Expr, columns: &'x [SelectItem]) -> &'x Expr {
    if let Expr::Identifier(ident) = expr {
        if ident.parts.len() == 1 {
            let name = ident.parts[0].to_lowercase();
            for col in columns {
                if let Some(alias) = &col.alias {
                    if alias.trim().to_lowercase() == name {
                        return &col.expr;
                    }
                }
            }
        }
    }
    expr
}

fn single_identifier_arg<'x>(call: &'x FuncCall, name: &str) -> Result<&'x Identifier, Error> {
    if call.args.len() != 1 {
        return Err(bad_request(format!(
            "translator: {} expects single argument",
            name.to_lowercase()
        )));
    }
    match &call.args[0] {
        Expr::Identifier(ident) => Ok(ident),
        _ => Err(bad_request(format!(
            "translator: {} only supports identifiers",
            name.to_lowercase()
        ))),
    }
}

fn is_aggregate_function(call: &FuncCall) -> bool {
    matches!(
        call.name.last().map(str::to_uppercase).as_deref(),
        Some("COUNT" | "SUM" | "AVG" | "MIN" | "MAX")
    )
}

fn aggregate_key(name: &str, arg: &str) -> String {
    if arg.is_empty() || arg == "*" {
        return format!("{}(*)", name.to_uppercase());
    }
    format!("{}({})", name.to_uppercase(), arg.to_lowercase())
}

fn format_aggregate_arg(arg: &str) -> &str {
    if arg == "*" { "" } else { arg }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind {
    Str,
    Number,
    Boolean,
}

struct LiteralValue {
    kind: LiteralKind,
    value: String,
}

impl LiteralValue {
    fn format(&self) -> String {
        match self.kind {
            LiteralKind::Str => format_string(&self.value),
            LiteralKind::Number | LiteralKind::Boolean => self.value.clone(),
        }
    }
}

fn literal_from_expr(expr: &Expr) -> Result<LiteralValue, Error> {
    match expr {
        Expr::String(value) => Ok(LiteralValue {
            kind: LiteralKind::Str,
            value: value.clone(),
        }),
        Expr::Numeric(value) => Ok(LiteralValue {
            kind: LiteralKind::Number,
            value: value.clone(),
        }),
        Expr::Boolean(value) => Ok(LiteralValue {
            kind: LiteralKind::Boolean,
            value: if *value { "true" } else { "false" }.to_string(),
        }),
        other => Err(bad_request(format!(
            "unsupported literal {}",
            expr_kind_name(other)
        ))),
    }
}

/// Builds the alias for a computed projection when no user alias exists:
/// `<prefix>_<sanitised-field>`.
fn make_projection_alias(
    provided: Option<&str>,
    prefix: &str,
    field: &str,
) -> Result<String, Error> {
    if let Some(provided) = provided.map(str::trim).filter(|a| !a.is_empty()) {
        if !is_safe_bare_literal(provided) {
            return Err(bad_request(format!(
                "translator: alias {provided:?} contains unsupported characters"
            )));
        }
        return Ok(provided.to_string());
    }
    let alias = format!("{prefix}_{}", sanitize_alias_from_field(field));
    if !is_safe_bare_literal(&alias) {
        return Err(bad_request(format!(
            "translator: failed to build alias for {field}"
        )));
    }
    Ok(alias)
}

fn make_simple_alias(provided: Option<&str>, fallback: &str) -> Result<String, Error> {
    if let Some(provided) = provided.map(str::trim).filter(|a| !a.is_empty()) {
        if !is_safe_bare_literal(provided) {
            return Err(bad_request(format!(
                "translator: alias {provided:?} contains unsupported characters"
            )));
        }
        return Ok(provided.to_string());
    }
    let fallback = if fallback.is_empty() { "expr" } else { fallback };
    if !is_safe_bare_literal(fallback) {
        return Err(bad_request(format!(
            "translator: alias {fallback:?} contains unsupported characters"
        )));
    }
    Ok(fallback.to_string())
}

fn sanitize_alias_from_field(field: &str) -> String {
    let mut value: String = field
        .chars()
        .map(|ch| match ch {
            '.' | '-' | ':' | '/' | '+' | '*' | '%' | '^' | '(' | ')' | ',' | ' ' | '\''
            | '"' => '_',
            other => other,
        })
        .collect();
    value = value.to_lowercase();
    while value.contains("__") {
        value = value.replace("__", "_");
    }
    let value = value.trim_matches('_');
    if value.is_empty() {
        return "col".to_string();
    }
    value.to_string()
}

fn escape_format_pattern(pattern: &str) -> String {
    pattern.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_single_quotes(pattern: &str) -> String {
    pattern.replace('\'', "\\'")
}

fn build_trim_pattern(kind: &str, alias: &str) -> String {
    match kind.to_uppercase().as_str() {
        "LTRIM" => format!("(?s)^\\s*(?P<{alias}>.*)$"),
        "RTRIM" => format!("(?s)^(?P<{alias}>.*?\\S)?\\s*$"),
        _ => format!("(?s)^\\s*(?P<{alias}>.*?\\S)?\\s*$"),
    }
}

fn parse_substring_int_arg(expr: &Expr, name: &str) -> Result<i64, Error> {
    let Expr::Numeric(value) = expr else {
        return Err(bad_request(format!(
            "translator: substr {name} must be integer literal"
        )));
    };
    let clean = value.trim().replace('_', "");
    if clean.is_empty() || clean.contains(['.', 'e', 'E']) {
        return Err(bad_request(format!(
            "translator: substr {name} must be integer literal"
        )));
    }
    clean.parse::<i64>().map_err(|_| {
        bad_request(format!("translator: substr {name} must be integer literal"))
    })
}

fn is_math_operator(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
    )
}

/// Describes an expression variant for diagnostics.
fn expr_kind_name(expr: &Expr) -> &'static str {
    match expr {
        Expr::Identifier(_) => "identifier",
        Expr::Numeric(_) => "numeric literal",
        Expr::String(_) => "string literal",
        Expr::Boolean(_) => "boolean literal",
        Expr::Null => "NULL literal",
        Expr::Placeholder(_) => "placeholder",
        Expr::Star(_) => "star",
        Expr::Binary { .. } => "binary expression",
        Expr::Unary { .. } => "unary expression",
        Expr::FuncCall(_) => "function call",
        Expr::Case { .. } => "CASE expression",
        Expr::Between { .. } => "BETWEEN expression",
        Expr::In { .. } => "IN expression",
        Expr::Like { .. } => "LIKE expression",
        Expr::IsNull { .. } => "IS NULL expression",
        Expr::Exists { .. } => "EXISTS expression",
        Expr::Subquery(_) => "subquery",
    }
}

// ==================== Literal and pattern formatting ====================

fn is_safe_bare_literal(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':' | '/' | '-'))
}

fn is_safe_wildcard_literal(value: &str) -> bool {
    let mut stars = 0;
    for ch in value.chars() {
        if ch == '*' {
            stars += 1;
            if stars > 1 {
                return false;
            }
        } else if !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':' | '/' | '-')) {
            return false;
        }
    }
    true
}

fn is_safe_format_field(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}

/// Emits a string literal: bare when safe, with at most one `*` wildcard,
/// quoted otherwise.
fn format_string(value: &str) -> String {
    if value.is_empty() {
        return quote_string(value);
    }
    if is_safe_bare_literal(value) || is_safe_wildcard_literal(value) {
        return value.to_string();
    }
    quote_string(value)
}

fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '\\' || ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn format_field_name(name: &str) -> String {
    if is_safe_bare_literal(name) {
        return name.to_string();
    }
    quote_string(name)
}

/// Lowers a LIKE pattern to a PipeQL value: a bare string, a single-`*`
/// wildcard, or an anchored regex.
fn convert_like_pattern(pattern: &str) -> String {
    let percent_count = pattern.matches('%').count();
    let underscore = pattern.contains('_');

    if percent_count == 0 && !underscore {
        return format_string(pattern);
    }
    if percent_count == 1 && pattern.ends_with('%') && !underscore {
        let prefix = &pattern[..pattern.len() - 1];
        if prefix.is_empty() {
            return "*".to_string();
        }
        return format_wildcard(&format!("{prefix}*"));
    }
    if percent_count == 1 && pattern.starts_with('%') && !underscore {
        let suffix = &pattern[1..];
        if suffix.is_empty() {
            return "*".to_string();
        }
        return format_wildcard(&format!("*{suffix}"));
    }
    if percent_count == 2
        && pattern.starts_with('%')
        && pattern.ends_with('%')
        && !underscore
        && pattern.len() >= 2
    {
        let substr = &pattern[1..pattern.len() - 1];
        if !substr.contains('%') {
            if substr.is_empty() {
                return "*".to_string();
            }
            return format_wildcard(&format!("*{substr}*"));
        }
    }
    format!("~{}", quote_string(&like_to_regex(pattern)))
}

fn format_wildcard(value: &str) -> String {
    if needs_quote_for_pattern(value) {
        return quote_string(value);
    }
    value.to_string()
}

fn needs_quote_for_pattern(value: &str) -> bool {
    value.chars().any(|ch| {
        !(ch.is_ascii_alphanumeric() || matches!(ch, '*' | '_' | '-' | ':' | '/' | '.'))
    })
}

/// Converts a LIKE pattern to an anchored regex: `%` matches any run,
/// `_` a single character, `\X` the literal `X`.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(next) => push_regex_quoted(&mut out, next),
                None => out.push('\\'),
            },
            other => push_regex_quoted(&mut out, other),
        }
    }
    out.push('$');
    out
}

fn push_regex_quoted(out: &mut String, ch: char) {
    if matches!(
        ch,
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
    ) {
        out.push('\\');
    }
    out.push(ch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_spec_classification() {
        let spec = TableSpec::new("");
        assert_eq!(spec.filter, "*");
        let spec = TableSpec::new("  *  ");
        assert_eq!(spec.filter, "*");
        let spec = TableSpec::new("service:api");
        assert_eq!(spec.filter, "service:api");
        assert!(spec.pipeline.is_empty());
        let spec = TableSpec::new("* | level:ERROR");
        assert!(spec.filter.is_empty());
        assert_eq!(spec.pipeline, "* | level:ERROR");
    }

    #[test]
    fn test_format_string() {
        assert_eq!(format_string("error"), "error");
        assert_eq!(format_string("2024-01-01"), "2024-01-01");
        assert_eq!(format_string(""), "\"\"");
        assert_eq!(format_string("has space"), "\"has space\"");
        assert_eq!(format_string("one*star"), "one*star");
        assert_eq!(format_string("two*st*ars"), "\"two*st*ars\"");
        assert_eq!(format_string("quote\"me"), "\"quote\\\"me\"");
    }

    #[test]
    fn test_sanitize_alias_from_field() {
        assert_eq!(sanitize_alias_from_field("message"), "message");
        assert_eq!(sanitize_alias_from_field("abs(delta)"), "abs_delta");
        assert_eq!(sanitize_alias_from_field("UPPER"), "upper");
        assert_eq!(sanitize_alias_from_field("a..b"), "a_b");
        assert_eq!(sanitize_alias_from_field("(((%)))"), "col");
    }

    #[test]
    fn test_convert_like_pattern() {
        assert_eq!(convert_like_pattern("plain"), "plain");
        assert_eq!(convert_like_pattern("fail%"), "fail*");
        assert_eq!(convert_like_pattern("%suffix"), "*suffix");
        assert_eq!(convert_like_pattern("%inner%"), "*inner*");
        assert_eq!(convert_like_pattern("%"), "*");
        assert_eq!(convert_like_pattern("%%"), "*");
        assert_eq!(convert_like_pattern("%error_%"), "~\"^.*error..*$\"");
        assert_eq!(convert_like_pattern("_foo"), "~\"^.foo$\"");
        assert_eq!(convert_like_pattern("a\\%b"), "~\"^a%b$\"");
        assert_eq!(convert_like_pattern("50%_off"), "~\"^50.*.off$\"");
    }

    #[test]
    fn test_like_to_regex_escapes_metacharacters() {
        assert_eq!(like_to_regex("a.b%"), "^a\\.b.*$");
        assert_eq!(like_to_regex("(x)_"), "^\\(x\\).$");
    }

    #[test]
    fn test_aggregate_key() {
        assert_eq!(aggregate_key("COUNT", "*"), "COUNT(*)");
        assert_eq!(aggregate_key("count", ""), "COUNT(*)");
        assert_eq!(aggregate_key("SUM", "Duration"), "SUM(duration)");
    }

    #[test]
    fn test_make_projection_alias() {
        assert_eq!(
            make_projection_alias(Some("lvl"), "upper", "level").unwrap(),
            "lvl"
        );
        assert_eq!(
            make_projection_alias(None, "lower", "service").unwrap(),
            "lower_service"
        );
        assert!(make_projection_alias(Some("has space"), "upper", "x").is_err());
    }

    #[test]
    fn test_build_trim_pattern() {
        assert_eq!(
            build_trim_pattern("TRIM", "t"),
            "(?s)^\\s*(?P<t>.*?\\S)?\\s*$"
        );
        assert_eq!(build_trim_pattern("LTRIM", "t"), "(?s)^\\s*(?P<t>.*)$");
        assert_eq!(build_trim_pattern("RTRIM", "t"), "(?s)^(?P<t>.*?\\S)?\\s*$");
    }

    #[test]
    fn test_parse_substring_int_arg() {
        assert_eq!(
            parse_substring_int_arg(&Expr::Numeric("12".to_string()), "start").unwrap(),
            12
        );
        assert!(parse_substring_int_arg(&Expr::Numeric("1.5".to_string()), "start").is_err());
        assert!(parse_substring_int_arg(&Expr::String("1".to_string()), "start").is_err());
    }
}
