use super::error::Error;
use entity::products::{ActiveModel, Model};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, TryIntoModel};

use log::*;

/// Inserts a new product. Only `name`, `price` and `description` are taken from
/// `product_model`; the id and timestamps are assigned here and by the database.
pub async fn create(db: &DatabaseConnection, product_model: Model) -> Result<Model, Error> {
    debug!("New Product Model to be inserted: {product_model:?}");

    let now = chrono::Utc::now();

    let product_active_model: ActiveModel = ActiveModel {
        name: Set(product_model.name),
        price: Set(product_model.price),
        description: Set(product_model.description),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(product_active_model.save(db).await?.try_into_model()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::Id;
    use sea_orm::{prelude::Decimal, DatabaseBackend, MockDatabase};
    use std::str::FromStr;

    fn widget() -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            name: "Widget".to_owned(),
            price: Decimal::from_str("9.99").unwrap(),
            description: "A widget".to_owned(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn create_returns_the_inserted_product_model() -> Result<(), Error> {
        let product_model = widget();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![product_model.clone()]])
            .into_connection();

        let product = create(&db, product_model.clone()).await?;

        assert_eq!(product.id, product_model.id);
        assert_eq!(product.price, product_model.price);

        Ok(())
    }

    #[tokio::test]
    async fn create_issues_a_single_insert() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![widget()]])
            .into_connection();

        create(&db, widget()).await?;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{log:?}").contains("INSERT INTO"));

        Ok(())
    }
}
