use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::FilmWorkType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "film_work")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_name = "type")]
    pub kind: FilmWorkType,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub creation_date: Option<Date>,
    pub certificate: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
