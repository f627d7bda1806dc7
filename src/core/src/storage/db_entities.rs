//! SeaORM entity models used by the database activity store.
//!
//! - `attempts`: one row per captured credential attempt, in write order

/// Attempts table entity models.
pub mod attempts {
    use sea_orm::entity::prelude::*;

    /// A captured credential attempt.
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "attempts")]
    pub struct Model {
        /// Auto-increment row id, gives the write order
        #[sea_orm(primary_key)]
        pub id: i32,
        pub user: String,
        pub pass: String,
        /// RFC3339 timestamp with nanoseconds
        pub ts: String,
        /// Remote endpoint string
        pub origin: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
