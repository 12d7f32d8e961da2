//! A tiny but consistent slice of the IMDb dumps.
#![allow(dead_code)]

pub const NAME_BASICS_TSV: &str = "\
nconst\tprimaryName\tbirthYear\tdeathYear\tprimaryProfession\tknownForTitles
nm0000001\tFred Astaire\t1899\t1987\tactor,miscellaneous,producer\ttt0000002,tt0000003
nm0000002\tLauren Bacall\t1924\t2014\tactress,soundtrack\ttt0000003
nm0000003\tAda Lovelace\t1815\t\\N\twriter\t\\N
";

pub const TITLE_BASICS_TSV: &str = "\
tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres
tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short
tt0000002\tmovie\tThe Film\tThe Film\t0\t1936\t\\N\t101\tComedy,Musical
tt0000003\ttvSeries\t\"Quoted\" Show\t\"Quoted\" Show\t0\t1950\t1955\t30\tDrama
tt0000004\ttvEpisode\tPilot\tPilot\t0\t1950\t\\N\t\\N\tDrama
";

pub const TITLE_RATINGS_TSV: &str = "\
tconst\taverageRating\tnumVotes
tt0000001\t5.7\t2090
tt0000002\t7.9\t15400
tt0000003\t8.4\t310
";

pub const TITLE_CREW_TSV: &str = "\
tconst\tdirectors\twriters
tt0000001\tnm0000001\t\\N
tt0000002\tnm0000001,nm0000002\tnm0000003
";

pub const TITLE_EPISODE_TSV: &str = "\
tconst\tparentTconst\tseasonNumber\tepisodeNumber
tt0000004\ttt0000003\t1\t1
";

pub const TITLE_AKAS_TSV: &str = "\
titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle
tt0000001\t1\tCarmencita\t\\N\t\\N\toriginal\t\\N\t1
tt0000001\t2\tCarmencita\tUS\t\\N\timdbDisplay\t\\N\t0
tt0000002\t1\tDer Film\tDE\tde\t\\N\t\\N\t0
";

pub const TITLE_PRINCIPALS_TSV: &str = "\
tconst\tordering\tnconst\tcategory\tjob\tcharacters
tt0000002\t1\tnm0000001\tactor\t\\N\t[\"Jerry\"]
tt0000002\t2\tnm0000002\tactress\t\\N\t[\"Dale\"]
tt0000003\t1\tnm0000002\tactress\t\\N\t\\N
tt0000002\t3\tnm0000003\twriter\tscreenplay\t\\N
";

/// Rows per file in the fixture set above.
pub const EXPECTED_COUNTS: &[(&str, u64)] = &[
    ("name_basics", 3),
    ("title_basics", 4),
    ("title_ratings", 3),
    ("title_crew", 2),
    ("title_episode", 1),
    ("title_akas", 3),
    ("title_principals", 4),
];
