pub mod film_work;
pub mod genre;
pub mod genre_film_work;
pub mod person;
pub mod person_film_work;
pub mod sea_orm_active_enums;
