use super::*;

diesel::table! {
    problem_statements (id) {
        id -> Integer,
        track -> Varchar,
        key -> Varchar,
        title -> Varchar,
    }
}

#[derive(Queryable)]
#[diesel(table_name = problem_statements)]
struct ProblemPrivate {
    id: i32,
    track: String,
    key: String,
    title: String,
}

fn private_to_public(p: ProblemPrivate) -> ProblemStatement {
    ProblemStatement {
        key: p.key,
        title: p.title,
    }
}

/// The problem statements offered on a track, in key order.
pub fn get_problem_statements(
    conn: &mut PgConnection,
    input_track: Track,
) -> Result<Vec<ProblemStatement>, String> {
    use self::problem_statements::dsl::*;

    problem_statements
        .filter(track.eq(conversions::serialize_track(input_track)))
        .order(key.asc())
        .load::<ProblemPrivate>(conn)
        .map(|rows| rows.into_iter().map(private_to_public).collect())
        .map_err(|err| err.to_string())
}
