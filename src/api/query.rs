//! Row filters in the backend's `column=op.value` query dialect.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, format!("eq.{value}"))
    }

    pub fn neq(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, format!("neq.{value}"))
    }

    pub fn gte(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, format!("gte.{value}"))
    }

    pub fn lt(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, format!("lt.{value}"))
    }

    pub fn in_list<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, format!("in.({joined})"))
    }

    /// Matches rows where any `(column, value)` pair is equal.
    pub fn any_eq(self, pairs: &[(&str, &str)]) -> Self {
        let inner = pairs
            .iter()
            .map(|(col, val)| format!("{col}.eq.{val}"))
            .collect::<Vec<_>>()
            .join(",");
        self.filter("or", format!("({inner})"))
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn filter(mut self, column: &str, expr: String) -> Self {
        self.filters.push((column.to_string(), expr));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Value of the first filter on `column`, e.g. `"eq.abc"`.
    pub fn filter_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(col, _)| col == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        params.push((
            "select".to_string(),
            self.select.clone().unwrap_or_else(|| "*".to_string()),
        ));
        params.extend(self.filters.iter().cloned());
        if let Some((col, order)) = &self.order {
            let dir = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            params.push(("order".to_string(), format!("{col}.{dir}")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_params_in_order() {
        let q = Query::new()
            .select("id")
            .in_list("conversation_id", ["a", "b"])
            .neq("sender_id", "u1")
            .eq("is_read", false)
            .order("created_at", Order::Desc)
            .limit(20);
        let params = q.to_params();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "id".to_string()),
                ("conversation_id".to_string(), "in.(a,b)".to_string()),
                ("sender_id".to_string(), "neq.u1".to_string()),
                ("is_read".to_string(), "eq.false".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn any_eq_renders_or_group() {
        let q = Query::new().any_eq(&[("coach_id", "u1"), ("client_id", "u1")]);
        assert_eq!(q.filter_value("or"), Some("(coach_id.eq.u1,client_id.eq.u1)"));
        assert_eq!(q.to_params()[0], ("select".to_string(), "*".to_string()));
    }
}
