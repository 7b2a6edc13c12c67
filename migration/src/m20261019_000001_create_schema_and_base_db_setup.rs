use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS product_notify;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO product_notify, public;")
            .await?;

        // The application connects as `product_notify` and owns nothing outside its schema
        manager
            .get_connection()
            .execute_unprepared(r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA product_notify TO product_notify;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA product_notify GRANT ALL ON TABLES TO product_notify;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA product_notify GRANT ALL ON SEQUENCES TO product_notify;
                END $$;
            "#)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA product_notify REVOKE ALL ON SEQUENCES FROM product_notify;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA product_notify REVOKE ALL ON TABLES FROM product_notify;
                    REVOKE ALL ON SCHEMA product_notify FROM product_notify;
                END $$;
            "#)
            .await?;

        // CASCADE removes every table in the schema
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS product_notify CASCADE;")
            .await?;

        Ok(())
    }
}
