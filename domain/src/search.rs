//! Maps search criteria onto repository queries.

use tracing::debug;

use crate::{CoreError, Criteria, Entity, Repository};

/// Criterion for an exact email match.
pub const EMAIL_CRITERION: &str = "email";

fn is_recognized<E: Entity>(key: &str) -> bool {
    key == EMAIL_CRITERION || key == E::NAME_CRITERION
}

/// Run `criteria` against `repo`.
///
/// Empty criteria return everything. Otherwise unknown keys are dropped and
/// exactly one remaining key with one value is supported; every other shape
/// yields an empty list.
pub fn dispatch<E, R>(repo: &R, criteria: &Criteria) -> Result<Vec<E>, CoreError>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    if criteria.is_empty() {
        return repo.find_all();
    }

    let recognized: Vec<(&str, &[String])> = criteria
        .iter()
        .filter(|(key, _)| {
            let known = is_recognized::<E>(key);
            if !known {
                debug!(kind = E::KIND, key, "ignoring unknown search criterion");
            }
            known
        })
        .collect();

    match recognized.as_slice() {
        [(key, [value])] if *key == EMAIL_CRITERION => {
            Ok(repo.find_by_email(value)?.into_iter().collect())
        }
        [(_, [value])] => repo.find_by_name(value),
        _ => {
            debug!(kind = E::KIND, %criteria, "no supported criteria combination");
            Ok(Vec::new())
        }
    }
}
