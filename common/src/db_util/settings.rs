use super::*;

diesel::table! {
    event_settings (id) {
        id -> Integer,
        student_round1 -> Bool,
        evaluator_round1 -> Bool,
        student_round2 -> Bool,
        evaluator_round2 -> Bool,
        updated_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = event_settings)]
struct SettingsPrivate {
    id: i32,
    student_round1: bool,
    evaluator_round1: bool,
    student_round2: bool,
    evaluator_round2: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = event_settings)]
struct SettingsPrivateNew {
    student_round1: bool,
    evaluator_round1: bool,
    student_round2: bool,
    evaluator_round2: bool,
    updated_at: DateTime<Utc>,
}

fn private_to_public(p: SettingsPrivate) -> RoundGates {
    RoundGates {
        student_round1: p.student_round1,
        evaluator_round1: p.evaluator_round1,
        student_round2: p.student_round2,
        evaluator_round2: p.evaluator_round2,
    }
}

fn build_new_row(gates: RoundGates, now: DateTime<Utc>) -> SettingsPrivateNew {
    SettingsPrivateNew {
        student_round1: gates.student_round1,
        evaluator_round1: gates.evaluator_round1,
        student_round2: gates.student_round2,
        evaluator_round2: gates.evaluator_round2,
        updated_at: now,
    }
}

/// Read the round gates. The settings table holds a single row; the first
/// read after a fresh deploy seeds it with every gate open.
pub fn get_round_gates(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<RoundGates, String> {
    use self::event_settings::dsl::*;

    let row = event_settings
        .order(id.asc())
        .first::<SettingsPrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?;

    match row {
        Some(row) => Ok(private_to_public(row)),
        None => {
            let defaults = RoundGates::default();
            diesel::insert_into(event_settings)
                .values(build_new_row(defaults, now))
                .execute(conn)
                .map_err(|err| err.to_string())?;
            Ok(defaults)
        }
    }
}

/// Overwrite the round gates.
pub fn update_round_gates(
    conn: &mut PgConnection,
    gates: RoundGates,
    now: DateTime<Utc>,
) -> Result<RoundGates, String> {
    use self::event_settings::dsl::*;

    let updated = diesel::update(event_settings)
        .set((
            student_round1.eq(gates.student_round1),
            evaluator_round1.eq(gates.evaluator_round1),
            student_round2.eq(gates.student_round2),
            evaluator_round2.eq(gates.evaluator_round2),
            updated_at.eq(now),
        ))
        .execute(conn)
        .map_err(|err| err.to_string())?;

    if updated == 0 {
        diesel::insert_into(event_settings)
            .values(build_new_row(gates, now))
            .execute(conn)
            .map_err(|err| err.to_string())?;
    }
    Ok(gates)
}
