use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(col, _) | Self::In(col, _) => col,
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Read/update target in PostgREST terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Eq(column.into(), value.to_string()));
        self
    }

    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filters.push(Filter::In(column.into(), values));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &str {
        &self.select
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Query-string pairs for a read.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Query-string pairs for an update; only the filters apply.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| match f {
                Filter::Eq(col, v) => (col.clone(), format!("eq.{v}")),
                Filter::In(col, vs) => {
                    let quoted = vs
                        .iter()
                        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                        .collect::<Vec<_>>()
                        .join(",");
                    (col.clone(), format!("in.({quoted})"))
                }
            })
            .collect()
    }
}

/// Text form of a scalar JSON value, as PostgREST would compare it.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_read_params() {
        let q = Query::table("environmental_data")
            .is_in("degradation_level", ["high", "severe"])
            .eq("region_id", "sector-12")
            .order("ndvi_value", true)
            .order("measurement_date", false)
            .limit(10);

        assert_eq!(
            q.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                (
                    "degradation_level".to_string(),
                    "in.(\"high\",\"severe\")".to_string()
                ),
                ("region_id".to_string(), "eq.sector-12".to_string()),
                (
                    "order".to_string(),
                    "ndvi_value.asc,measurement_date.desc".to_string()
                ),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn update_params_skip_select_and_order() {
        let q = Query::table("notifications")
            .eq("id", 7)
            .eq("user_id", "u-1")
            .order("created_at", false);
        assert_eq!(
            q.filter_params(),
            vec![
                ("id".to_string(), "eq.7".to_string()),
                ("user_id".to_string(), "eq.u-1".to_string()),
            ]
        );
    }
}
