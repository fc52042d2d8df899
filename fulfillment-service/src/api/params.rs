//! List query parameters. Numbers arrive as strings, so they are parsed here
//! and range-checked with the same validator rules as request bodies.

use shared::{
    normalize_email, InventoryFilter, OrderFilter, OrderStatus, Page, DEFAULT_PAGE, DEFAULT_PER_PAGE,
    MAX_PER_PAGE,
};
use std::collections::HashMap;
use std::str::FromStr;
use validator::Validate;

use super::error::{field_errors, ApiError, FieldError};

const MAX_PAGE: i64 = u32::MAX as i64;
const MAX_QUANTITY: i64 = i32::MAX as i64;

#[derive(Debug, Default, Validate)]
struct InventoryListQuery {
    #[validate(range(min = 1, max = MAX_PAGE, message = "\"page\" must be a positive 32-bit integer"))]
    page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "\"perPage\" must be between 1 and 100"))]
    per_page: Option<i64>,
    #[validate(length(max = 256, message = "\"name\" length must be less than or equal to 256 characters long"))]
    name: Option<String>,
    description: Option<String>,
    #[validate(range(min = 0.0, message = "\"price\" must be larger than or equal to 0"))]
    price: Option<f64>,
    #[validate(range(min = 0, max = MAX_QUANTITY, message = "\"quantity\" must be larger than or equal to 0"))]
    quantity: Option<i64>,
}

#[derive(Debug, Default, Validate)]
struct OrderListQuery {
    #[validate(range(min = 1, max = MAX_PAGE, message = "\"page\" must be a positive 32-bit integer"))]
    page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "\"perPage\" must be between 1 and 100"))]
    per_page: Option<i64>,
    email: Option<String>,
    status: Option<String>,
}

fn page_of(page: Option<i64>, per_page: Option<i64>) -> Page {
    Page::new(
        page.and_then(|p| u32::try_from(p).ok()).unwrap_or(DEFAULT_PAGE),
        per_page
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE),
    )
}

fn text(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).cloned()
}

fn number<T: FromStr>(
    params: &HashMap<String, String>,
    key: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = params.get(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError {
                field: key.to_string(),
                location: "query",
                messages: vec![format!("\"{key}\" must be a number")],
            });
            None
        }
    }
}

fn finish(query: &impl Validate, mut errors: Vec<FieldError>) -> Result<(), ApiError> {
    if let Err(invalid) = query.validate() {
        errors.extend(field_errors(&invalid, "query"));
    }
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(ApiError::Invalid { errors })
}

pub fn inventory_list(params: &HashMap<String, String>) -> Result<(InventoryFilter, Page), ApiError> {
    let mut errors = Vec::new();
    let query = InventoryListQuery {
        page: number(params, "page", &mut errors),
        per_page: number(params, "perPage", &mut errors),
        name: text(params, "name"),
        description: text(params, "description"),
        price: number(params, "price", &mut errors),
        quantity: number(params, "quantity", &mut errors),
    };
    finish(&query, errors)?;

    let filter = InventoryFilter {
        name: query.name,
        description: query.description,
        price: query.price,
        quantity: query.quantity.and_then(|q| i32::try_from(q).ok()),
    };
    Ok((filter, page_of(query.page, query.per_page)))
}

pub fn order_list(params: &HashMap<String, String>) -> Result<(OrderFilter, Page), ApiError> {
    let mut errors = Vec::new();
    let query = OrderListQuery {
        page: number(params, "page", &mut errors),
        per_page: number(params, "perPage", &mut errors),
        email: text(params, "email"),
        status: text(params, "status"),
    };

    let status = match query.status.as_deref().map(str::parse::<OrderStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(_)) => {
            errors.push(FieldError {
                field: "status".to_string(),
                location: "query",
                messages: vec![format!(
                    "\"status\" must be one of [{}]",
                    OrderStatus::allowed_values()
                )],
            });
            None
        }
        None => None,
    };
    finish(&query, errors)?;

    let filter = OrderFilter {
        email: query.email.as_deref().map(normalize_email),
        status,
    };
    Ok((filter, page_of(query.page, query.per_page)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn invalid_fields(result: Result<impl std::fmt::Debug, ApiError>) -> Vec<(String, &'static str)> {
        match result {
            Err(ApiError::Invalid { errors }) => errors
                .into_iter()
                .map(|e| (e.field, e.location))
                .collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_query_uses_default_page() {
        let (filter, page) = inventory_list(&HashMap::new()).unwrap();
        assert_eq!(filter, InventoryFilter::default());
        assert_eq!(page, Page::default());
    }

    #[test]
    fn filters_and_paging_are_parsed() {
        let (filter, page) = inventory_list(&params(&[
            ("page", "2"),
            ("perPage", "10"),
            ("name", "Widget"),
            ("quantity", "4"),
        ]))
        .unwrap();
        assert_eq!(page, Page::new(2, 10));
        assert_eq!(filter.name.as_deref(), Some("Widget"));
        assert_eq!(filter.quantity, Some(4));
        assert_eq!(filter.price, None);
    }

    #[test]
    fn non_numeric_paging_is_rejected() {
        let fields = invalid_fields(order_list(&params(&[("page", "one"), ("perPage", "ten")])));
        assert_eq!(
            fields,
            vec![
                ("page".to_string(), "query"),
                ("perPage".to_string(), "query"),
            ]
        );
    }

    #[test]
    fn out_of_range_paging_is_rejected() {
        let fields = invalid_fields(inventory_list(&params(&[("page", "0"), ("perPage", "101")])));
        assert_eq!(
            fields,
            vec![
                ("page".to_string(), "query"),
                ("perPage".to_string(), "query"),
            ]
        );
    }

    #[test]
    fn page_past_u32_is_rejected() {
        let fields = invalid_fields(inventory_list(&params(&[("page", "4294967296")])));
        assert_eq!(fields, vec![("page".to_string(), "query")]);

        let (_, page) = inventory_list(&params(&[("page", "4294967295")])).unwrap();
        assert_eq!(page.page, u32::MAX);
    }

    #[test]
    fn order_status_filter_must_be_known() {
        let fields = invalid_fields(order_list(&params(&[("status", "shipped")])));
        assert_eq!(fields, vec![("status".to_string(), "query")]);

        let (filter, _) = order_list(&params(&[("status", "canceled"), ("email", "A@B.io")])).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Canceled));
        assert_eq!(filter.email.as_deref(), Some("a@b.io"));
    }
}
