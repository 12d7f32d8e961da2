//! SQLite schema definitions for the IMDb dataset tables.
//!
//! Column names follow the TSV headers of the public dumps so files map onto
//! tables without renaming. Composite identities are UNIQUE constraints, which
//! is what `INSERT OR REPLACE` keys on during re-imports.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema};

const TITLE_FK: ForeignKey = ForeignKey {
    foreign_table: "title_basics",
    foreign_column: "tconst",
};

const PERSON_FK: ForeignKey = ForeignKey {
    foreign_table: "name_basics",
    foreign_column: "nconst",
};

/// Titles: movies, series, episodes, shorts...
const TITLE_BASICS_TABLE: Table = Table {
    name: "title_basics",
    columns: &[
        sqlite_column!("tconst", &SqlType::Text, is_primary_key = true),
        sqlite_column!("titleType", &SqlType::Text, non_null = true),
        sqlite_column!("primaryTitle", &SqlType::Text, non_null = true),
        sqlite_column!("originalTitle", &SqlType::Text),
        sqlite_column!("isAdult", &SqlType::Boolean, default_value = Some("0")),
        sqlite_column!("startYear", &SqlType::Integer),
        sqlite_column!("endYear", &SqlType::Integer),
        sqlite_column!("runtimeMinutes", &SqlType::Integer),
        sqlite_column!("genres", &SqlType::Text), // comma separated
    ],
    indices: &[
        ("idx_title_type", "titleType"),
        ("idx_title_year", "startYear"),
        ("idx_title_genre", "genres"),
        ("idx_title_primary", "primaryTitle"),
    ],
    unique_constraints: &[],
};

/// People credited anywhere in the dataset
const NAME_BASICS_TABLE: Table = Table {
    name: "name_basics",
    columns: &[
        sqlite_column!("nconst", &SqlType::Text, is_primary_key = true),
        sqlite_column!("primaryName", &SqlType::Text, non_null = true),
        sqlite_column!("birthYear", &SqlType::Integer),
        sqlite_column!("deathYear", &SqlType::Integer),
        sqlite_column!("primaryProfession", &SqlType::Text),
        sqlite_column!("knownForTitles", &SqlType::Text),
    ],
    indices: &[("idx_name_primary", "primaryName")],
    unique_constraints: &[],
};

const TITLE_RATINGS_TABLE: Table = Table {
    name: "title_ratings",
    columns: &[
        sqlite_column!(
            "tconst",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("averageRating", &SqlType::Real, non_null = true),
        sqlite_column!("numVotes", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_ratings_score", "averageRating DESC"),
        ("idx_ratings_votes", "numVotes DESC"),
    ],
    unique_constraints: &[],
};

const TITLE_CREW_TABLE: Table = Table {
    name: "title_crew",
    columns: &[
        sqlite_column!(
            "tconst",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("directors", &SqlType::Text), // comma separated nconst list
        sqlite_column!("writers", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};

const TITLE_EPISODE_TABLE: Table = Table {
    name: "title_episode",
    columns: &[
        sqlite_column!(
            "tconst",
            &SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!(
            "parentTconst",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("seasonNumber", &SqlType::Integer),
        sqlite_column!("episodeNumber", &SqlType::Integer),
    ],
    indices: &[("idx_episode_parent", "parentTconst")],
    unique_constraints: &[],
};

const TITLE_AKAS_TABLE: Table = Table {
    name: "title_akas",
    columns: &[
        sqlite_column!(
            "titleId",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("ordering", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("region", &SqlType::Text),
        sqlite_column!("language", &SqlType::Text),
        sqlite_column!("types", &SqlType::Text),
        sqlite_column!("attributes", &SqlType::Text),
        sqlite_column!("isOriginalTitle", &SqlType::Boolean),
    ],
    indices: &[("idx_akas_title", "titleId")],
    unique_constraints: &[&["titleId", "ordering"]],
};

const TITLE_PRINCIPALS_TABLE: Table = Table {
    name: "title_principals",
    columns: &[
        sqlite_column!(
            "tconst",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TITLE_FK)
        ),
        sqlite_column!("ordering", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "nconst",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&PERSON_FK)
        ),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("job", &SqlType::Text),
        sqlite_column!("characters", &SqlType::Text), // JSON-ish list, stored verbatim
    ],
    indices: &[
        ("idx_principals_title", "tconst"),
        ("idx_principals_person", "nconst"),
        ("idx_principals_category", "category"),
    ],
    unique_constraints: &[&["tconst", "ordering"]],
};

/// Tables in creation order: roots first.
pub const IMDB_SCHEMA: VersionedSchema = VersionedSchema {
    version: 1,
    tables: &[
        TITLE_BASICS_TABLE,
        NAME_BASICS_TABLE,
        TITLE_RATINGS_TABLE,
        TITLE_CREW_TABLE,
        TITLE_EPISODE_TABLE,
        TITLE_AKAS_TABLE,
        TITLE_PRINCIPALS_TABLE,
    ],
};
