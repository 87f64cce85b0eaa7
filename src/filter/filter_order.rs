use super::types::SortDirection;

pub struct FilterOrder;

impl FilterOrder {
    /// ORDER BY an allow-listed column, with `id` as a tie-breaker so pages are stable
    pub fn generate(column: &'static str, direction: SortDirection) -> String {
        if column == "id" {
            format!("ORDER BY \"id\" {}", direction.to_sql())
        } else {
            format!(
                "ORDER BY \"{}\" {}, \"id\" {}",
                column,
                direction.to_sql(),
                direction.to_sql()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_id_tie_breaker() {
        assert_eq!(
            FilterOrder::generate("created_at", SortDirection::Desc),
            "ORDER BY \"created_at\" DESC, \"id\" DESC"
        );
        assert_eq!(FilterOrder::generate("id", SortDirection::Asc), "ORDER BY \"id\" ASC");
    }
}
