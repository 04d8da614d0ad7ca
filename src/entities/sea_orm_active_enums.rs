use sea_orm::entity::prelude::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum FilmWorkType {
    #[sea_orm(string_value = "movie")]
    Movie,
    #[sea_orm(string_value = "tv_show")]
    TvShow,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PersonRole {
    #[sea_orm(string_value = "actor")]
    Actor,
    #[sea_orm(string_value = "director")]
    Director,
    #[sea_orm(string_value = "writer")]
    Writer,
}
