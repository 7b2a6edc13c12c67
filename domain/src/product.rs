use crate::error::{Error, FieldErrors};
use crate::products::Model;
use events::{DomainEvent, EventPublisher};
use log::*;
use sea_orm::{prelude::Decimal, DatabaseConnection};
use serde_json::{json, Value};
use service::config::PublishFailurePolicy;

/// Maximum length of a product name, in characters.
pub const MAX_NAME_LEN: usize = 255;
/// Total significant digits a price may have (`NUMERIC(10, 2)`).
pub const PRICE_MAX_DIGITS: u32 = 10;
/// Digits allowed after the decimal point.
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Validates and persists a new product, then publishes exactly one
/// `ProductCreated` event built from the persisted record.
///
/// Publishing only queues the event; fan-out to websocket subscribers happens
/// on the dispatcher task. If the event can't be queued, `publish_failure_policy`
/// decides whether the caller sees an error. The record is written either way.
pub async fn create(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    publish_failure_policy: PublishFailurePolicy,
    product_model: Model,
) -> Result<Model, Error> {
    let product_model = validate(product_model)?;

    let product = entity_api::product::create(db, product_model).await?;
    debug!("Created Product: {product:?}");

    let event = DomainEvent::ProductCreated {
        product_id: product.id,
        message: notification_message(&product),
    };

    if let Err(err) = event_publisher.publish(event) {
        match publish_failure_policy {
            PublishFailurePolicy::Propagate => {
                error!(
                    "Failed to publish notification for product {}: {err}",
                    product.id
                );
                return Err(err.into());
            }
            PublishFailurePolicy::Swallow => {
                warn!("Dropping notification for product {}: {err}", product.id);
            }
        }
    }

    Ok(product)
}

/// The `{name, price, description}` payload subscribers receive. `price` is
/// rendered as a decimal string so no precision is lost in JSON.
pub fn notification_message(product: &Model) -> Value {
    json!({
        "name": product.name,
        "price": product.price.to_string(),
        "description": product.description,
    })
}

/// Checks a product for creation and returns it normalized: surrounding
/// whitespace trimmed from text fields and the price rescaled to two decimal
/// places. All failing fields are reported together.
pub fn validate(mut product_model: Model) -> Result<Model, Error> {
    let mut field_errors = FieldErrors::new();

    product_model.name = product_model.name.trim().to_owned();
    product_model.description = product_model.description.trim().to_owned();

    if product_model.name.is_empty() {
        field_errors
            .entry("name".to_owned())
            .or_default()
            .push("This field may not be blank.".to_owned());
    } else if product_model.name.chars().count() > MAX_NAME_LEN {
        field_errors
            .entry("name".to_owned())
            .or_default()
            .push(format!(
                "Ensure this field has no more than {MAX_NAME_LEN} characters."
            ));
    }

    let price_errors = price_errors(&product_model.price);
    if !price_errors.is_empty() {
        field_errors.insert("price".to_owned(), price_errors);
    }

    if !field_errors.is_empty() {
        debug!("Product failed validation: {field_errors:?}");
        return Err(Error::validation(field_errors));
    }

    product_model.price.rescale(PRICE_DECIMAL_PLACES);
    Ok(product_model)
}

fn price_errors(price: &Decimal) -> Vec<String> {
    let mut errors = Vec::new();

    if price.is_sign_negative() && !price.is_zero() {
        errors.push("Ensure this value is greater than or equal to 0.".to_owned());
    }

    // Trailing zeros don't count towards precision: 9.90 and 9.9 are equal.
    let normalized = price.normalize();
    let decimal_places = normalized.scale();
    let whole_digits = whole_digit_count(&normalized);
    let max_whole_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;

    if decimal_places > PRICE_DECIMAL_PLACES {
        errors.push(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    if whole_digits > max_whole_digits {
        errors.push(format!(
            "Ensure that there are no more than {max_whole_digits} digits before the decimal point."
        ));
    }

    errors
}

fn whole_digit_count(price: &Decimal) -> u32 {
    let whole = price.trunc().abs();
    if whole.is_zero() {
        0
    } else {
        whole.to_string().len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, EntityErrorKind, ExternalErrorKind, InternalErrorKind};
    use crate::Id;
    use async_trait::async_trait;
    use events::EventHandler;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, event: &DomainEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    fn product(name: &str, price: &str, description: &str) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            name: name.to_owned(),
            price: Decimal::from_str(price).unwrap(),
            description: description.to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn field_errors_of(err: Error) -> FieldErrors {
        match err.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Validation(
                field_errors,
            ))) => field_errors,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_and_normalizes_a_valid_product() {
        let validated = validate(product("  Widget ", "9.9", " A widget ")).unwrap();

        assert_eq!(validated.name, "Widget");
        assert_eq!(validated.description, "A widget");
        assert_eq!(validated.price.to_string(), "9.90");
    }

    #[test]
    fn validate_allows_a_zero_price_and_empty_description() {
        let validated = validate(product("Freebie", "0", "")).unwrap();
        assert_eq!(validated.price.to_string(), "0.00");
    }

    #[test]
    fn validate_rejects_blank_name() {
        let field_errors = field_errors_of(validate(product("   ", "1.00", "x")).unwrap_err());

        assert_eq!(
            field_errors.get("name"),
            Some(&vec!["This field may not be blank.".to_owned()])
        );
        assert!(!field_errors.contains_key("price"));
    }

    #[test]
    fn validate_rejects_overlong_name() {
        let long_name = "n".repeat(MAX_NAME_LEN + 1);
        let field_errors = field_errors_of(validate(product(&long_name, "1", "")).unwrap_err());

        assert!(field_errors.contains_key("name"));
    }

    #[test]
    fn validate_reports_every_bad_price_rule_and_field() {
        let field_errors =
            field_errors_of(validate(product("", "-123456789.123", "")).unwrap_err());

        assert!(field_errors.contains_key("name"));
        assert_eq!(
            field_errors.get("price"),
            Some(&vec![
                "Ensure this value is greater than or equal to 0.".to_owned(),
                "Ensure that there are no more than 2 decimal places.".to_owned(),
                "Ensure that there are no more than 8 digits before the decimal point.".to_owned(),
            ])
        );
    }

    #[test]
    fn validate_ignores_trailing_zeros_when_counting_decimal_places() {
        assert!(validate(product("Widget", "9.990", "")).is_ok());
        assert!(validate(product("Widget", "99999999.99", "")).is_ok());
    }

    #[test]
    fn notification_message_renders_price_as_a_string() {
        let message = notification_message(&product("Widget", "9.99", "A widget"));

        assert_eq!(
            message,
            json!({"name": "Widget", "price": "9.99", "description": "A widget"})
        );
    }

    #[test]
    fn numeric_json_price_is_broadcast_as_its_decimal_string() {
        let parsed: Model = serde_json::from_str(
            r#"{"name": "Widget", "price": 9.99, "description": "A widget"}"#,
        )
        .unwrap();

        let message = notification_message(&validate(parsed).unwrap());

        assert_eq!(
            message,
            json!({"name": "Widget", "price": "9.99", "description": "A widget"})
        );
    }

    #[test]
    fn whole_number_json_price_gains_two_decimal_places() {
        let parsed: Model =
            serde_json::from_str(r#"{"name": "Widget", "price": 10, "description": ""}"#).unwrap();

        assert_eq!(notification_message(&validate(parsed).unwrap())["price"], json!("10.00"));
    }

    #[tokio::test]
    async fn create_publishes_exactly_one_event_matching_the_persisted_record() {
        let persisted = product("Widget", "9.99", "A widget");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![persisted.clone()]])
            .into_connection();
        let handler = Arc::new(RecordingHandler::default());
        let (publisher, dispatcher) = EventPublisher::channel();
        let dispatcher = dispatcher.with_handler(handler.clone());

        let created = create(
            &db,
            &publisher,
            PublishFailurePolicy::Propagate,
            product("Widget", "9.99", "A widget"),
        )
        .await
        .unwrap();
        assert_eq!(created, persisted);

        drop(publisher);
        dispatcher.run().await;
        assert_eq!(
            *handler.seen.lock().unwrap(),
            vec![DomainEvent::ProductCreated {
                product_id: persisted.id,
                message: json!({"name": "Widget", "price": "9.99", "description": "A widget"}),
            }]
        );
    }

    #[tokio::test]
    async fn create_with_invalid_input_neither_writes_nor_publishes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let handler = Arc::new(RecordingHandler::default());
        let (publisher, dispatcher) = EventPublisher::channel();
        let dispatcher = dispatcher.with_handler(handler.clone());

        let result = create(
            &db,
            &publisher,
            PublishFailurePolicy::Propagate,
            product("", "1.00", ""),
        )
        .await;

        assert!(result.is_err());
        drop(publisher);
        dispatcher.run().await;
        assert!(handler.seen.lock().unwrap().is_empty());
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn create_propagates_publish_failure_when_configured() {
        let persisted = product("Widget", "9.99", "A widget");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![persisted.clone()]])
            .into_connection();
        let (publisher, dispatcher) = EventPublisher::channel();
        drop(dispatcher);

        let err = create(
            &db,
            &publisher,
            PublishFailurePolicy::Propagate,
            persisted.clone(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Broker)
        );
    }

    #[tokio::test]
    async fn create_swallows_publish_failure_when_configured() {
        let persisted = product("Widget", "9.99", "A widget");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![persisted.clone()]])
            .into_connection();
        let (publisher, dispatcher) = EventPublisher::channel();
        drop(dispatcher);

        let created = create(
            &db,
            &publisher,
            PublishFailurePolicy::Swallow,
            persisted.clone(),
        )
        .await
        .unwrap();

        assert_eq!(created, persisted);
    }
}
