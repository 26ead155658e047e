use sea_orm::entity::prelude::*;

/// A captured payment that has already paid for a checkout.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_claims")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub payment_reference: String,
    pub user_id: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
