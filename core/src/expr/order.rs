//! Ordering (spec.md §4.5): `ORDER BY column [ASC|DESC] [NULLS FIRST|LAST]`,
//! emitted in insertion order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    Default,
    First,
    Last,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expression: String,
    pub direction: OrderDirection,
    pub nulls: NullsOrder,
}

impl OrderBy {
    pub fn asc(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            direction: OrderDirection::Asc,
            nulls: NullsOrder::Default,
        }
    }

    pub fn desc(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            direction: OrderDirection::Desc,
            nulls: NullsOrder::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrder::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullsOrder::Last;
        self
    }

    pub fn render(&self) -> String {
        let dir = match self.direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        };
        let nulls = match self.nulls {
            NullsOrder::Default => "",
            NullsOrder::First => " NULLS FIRST",
            NullsOrder::Last => " NULLS LAST",
        };
        format!("{}{}{}", self.expression, dir, nulls)
    }
}
