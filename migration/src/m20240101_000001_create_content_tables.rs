use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FilmWork::Table)
                    .if_not_exists()
                    .col(uuid(FilmWork::Id).primary_key())
                    .col(string_len(FilmWork::Title, 255))
                    .col(text_null(FilmWork::Description))
                    .col(date_null(FilmWork::CreationDate))
                    .col(text_null(FilmWork::Certificate))
                    .col(string_null(FilmWork::FilePath))
                    .col(double_null(FilmWork::Rating))
                    .col(string_len(FilmWork::Type, 20))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(uuid(Genre::Id).primary_key())
                    .col(string_len(Genre::Name, 255))
                    .col(text_null(Genre::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genre_name_unique")
                    .table(Genre::Table)
                    .col(Genre::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(uuid(Person::Id).primary_key())
                    .col(string_len(Person::FullName, 255))
                    .col(date_null(Person::BirthDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_person_full_name")
                    .table(Person::Table)
                    .col(Person::FullName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GenreFilmWork::Table)
                    .if_not_exists()
                    .col(uuid(GenreFilmWork::Id).primary_key())
                    .col(uuid(GenreFilmWork::FilmWorkId))
                    .col(uuid(GenreFilmWork::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genre_film_work_film_work")
                            .from(GenreFilmWork::Table, GenreFilmWork::FilmWorkId)
                            .to(FilmWork::Table, FilmWork::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genre_film_work_genre")
                            .from(GenreFilmWork::Table, GenreFilmWork::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genre_film_work_unique")
                    .table(GenreFilmWork::Table)
                    .col(GenreFilmWork::FilmWorkId)
                    .col(GenreFilmWork::GenreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PersonFilmWork::Table)
                    .if_not_exists()
                    .col(uuid(PersonFilmWork::Id).primary_key())
                    .col(uuid(PersonFilmWork::FilmWorkId))
                    .col(uuid(PersonFilmWork::PersonId))
                    .col(string_len(PersonFilmWork::Role, 255))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_film_work_film_work")
                            .from(PersonFilmWork::Table, PersonFilmWork::FilmWorkId)
                            .to(FilmWork::Table, FilmWork::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_film_work_person")
                            .from(PersonFilmWork::Table, PersonFilmWork::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_person_film_work_unique")
                    .table(PersonFilmWork::Table)
                    .col(PersonFilmWork::FilmWorkId)
                    .col(PersonFilmWork::PersonId)
                    .col(PersonFilmWork::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PersonFilmWork::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(GenreFilmWork::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Person::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FilmWork::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum FilmWork {
    Table,
    Id,
    Title,
    Description,
    CreationDate,
    Certificate,
    FilePath,
    Rating,
    Type,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Person {
    Table,
    Id,
    FullName,
    BirthDate,
}

#[derive(DeriveIden)]
enum GenreFilmWork {
    Table,
    Id,
    FilmWorkId,
    GenreId,
}

#[derive(DeriveIden)]
enum PersonFilmWork {
    Table,
    Id,
    FilmWorkId,
    PersonId,
    Role,
}
