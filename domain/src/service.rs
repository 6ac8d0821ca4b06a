use std::marker::PhantomData;

use tracing::debug;
use uuid::Uuid;

use crate::patch::{self, PatchOperation, Patchable};
use crate::search;
use crate::validate::Validate;
use crate::{Clock, CoreError, Criteria, Entity, Lookup, Repository};

/// Read-side application service: lookups and searches.
pub struct ReadService<E: Entity, R: Repository<E>> {
    repo: R,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, R: Repository<E>> ReadService<E, R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<E, CoreError> {
        debug!(kind = E::KIND, %id, "find_by_id");
        self.repo
            .find_by_id(&id)?
            .ok_or(CoreError::NotFound(Lookup::Id(id)))
    }

    /// Search by criteria. Non-empty criteria that match nothing are NotFound.
    pub fn find(&self, criteria: &Criteria) -> Result<Vec<E>, CoreError> {
        debug!(kind = E::KIND, %criteria, "find");
        let found = search::dispatch(&self.repo, criteria)?;
        if found.is_empty() && !criteria.is_empty() {
            return Err(CoreError::NotFound(Lookup::Criteria(criteria.clone())));
        }
        debug!(kind = E::KIND, count = found.len(), "find: done");
        Ok(found)
    }

    pub fn find_all(&self) -> Result<Vec<E>, CoreError> {
        self.repo.find_all()
    }

    pub fn find_names_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        debug!(kind = E::KIND, prefix, "find_names_by_prefix");
        self.repo.find_names_by_prefix(prefix)
    }
}

/// Write-side application service: validation, email uniqueness and
/// orchestration of repository writes.
///
/// The email check and the following write are separate repository calls and
/// not atomic as a pair.
pub struct WriteService<E: Entity, R: Repository<E>, C: Clock> {
    repo: R,
    clock: C,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R, C> WriteService<E, R, C>
where
    E: Entity + Validate,
    R: Repository<E>,
    C: Clock,
{
    pub fn new(repo: R, clock: C) -> Self {
        Self {
            repo,
            clock,
            _entity: PhantomData,
        }
    }

    fn validate(&self, entity: &E) -> Result<(), CoreError> {
        let violations = entity.validate(self.clock.today());
        if violations.is_empty() {
            Ok(())
        } else {
            debug!(kind = E::KIND, count = violations.len(), "validation failed");
            Err(CoreError::ConstraintViolations(violations))
        }
    }

    /// Validate and store a new entity. Returns it with its generated id.
    pub fn create(&self, entity: E) -> Result<E, CoreError> {
        debug!(kind = E::KIND, email = entity.email(), "create");
        self.validate(&entity)?;
        if self.repo.is_email_existing(entity.email())? {
            return Err(CoreError::EmailExists(entity.email().to_string()));
        }
        let created = self.repo.create(entity)?;
        debug!(kind = E::KIND, id = ?created.id(), "created");
        Ok(created)
    }

    /// Replace the entity stored under `id` with `entity`.
    pub fn update(&self, mut entity: E, id: Uuid) -> Result<(), CoreError> {
        debug!(kind = E::KIND, %id, "update");
        self.validate(&entity)?;
        let current = self
            .repo
            .find_by_id(&id)?
            .ok_or(CoreError::NotFound(Lookup::Id(id)))?;
        if current.email() != entity.email() && self.repo.is_email_existing(entity.email())? {
            return Err(CoreError::EmailExists(entity.email().to_string()));
        }
        entity.set_id(id);
        self.repo.update(entity)
    }

    /// Remove the entity if present. Deleting a missing id succeeds.
    pub fn delete_by_id(&self, id: Uuid) -> Result<(), CoreError> {
        debug!(kind = E::KIND, %id, "delete_by_id");
        self.repo.delete_by_id(&id)
    }
}

impl<E, R, C> WriteService<E, R, C>
where
    E: Patchable + Validate,
    R: Repository<E>,
    C: Clock,
{
    /// Apply `operations` to a copy of the stored entity, then store it through
    /// the regular update checks. The stored entity is untouched on failure.
    pub fn patch(&self, id: Uuid, operations: &[PatchOperation]) -> Result<E, CoreError> {
        debug!(kind = E::KIND, %id, count = operations.len(), "patch");
        let mut working = self
            .repo
            .find_by_id(&id)?
            .ok_or(CoreError::NotFound(Lookup::Id(id)))?;
        patch::apply(&mut working, operations)?;
        self.update(working.clone(), id)?;
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::adapters::memory_repo::InMemoryRepo;
    use crate::patch::PatchOp;
    use crate::{seed, Adresse, Interesse, Kunde, Verein};

    struct TestClock;
    impl Clock for TestClock {
        fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        }
    }

    type Services<E> = (
        ReadService<E, Arc<InMemoryRepo<E>>>,
        WriteService<E, Arc<InMemoryRepo<E>>, TestClock>,
    );

    fn services<E: Entity + Validate>(seed: Vec<E>) -> Services<E> {
        let repo = Arc::new(InMemoryRepo::with_seed(seed));
        (ReadService::new(repo.clone()), WriteService::new(repo, TestClock))
    }

    fn zeta() -> Verein {
        let mut v = Verein::new("Zeta", "zeta@acme.test", Adresse::new("12345", "Linz"));
        v.kategorie = 1;
        v
    }

    #[test]
    fn find_by_id_not_found_names_the_id() {
        let (read, _) = services(seed::kunden());
        let id = Uuid::from_u128(0x99);
        let err = read.find_by_id(id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(Lookup::Id(missing)) if missing == id));
    }

    #[test]
    fn empty_criteria_returns_everything() {
        let (read, _) = services(seed::kunden());
        assert_eq!(read.find(&Criteria::new()).unwrap().len(), 7);
    }

    #[test]
    fn unmatched_criteria_are_not_found() {
        let (read, _) = services(seed::kunden());
        let criteria = Criteria::from_pairs([("nachname", "Zeta")]);
        let err = read.find(&criteria).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(Lookup::Criteria(c)) if c == criteria));
    }

    #[test]
    fn create_delete_roundtrip_counts() {
        let (read, write) = services(seed::vereine());
        let created = write.create(zeta()).unwrap();
        let id = created.id.unwrap();
        assert_eq!(read.find_by_id(id).unwrap().name, "Zeta");
        assert_eq!(read.find_all().unwrap().len(), 8);

        write.delete_by_id(id).unwrap();
        write.delete_by_id(id).unwrap();
        assert_eq!(read.find_all().unwrap().len(), 7);
        assert!(matches!(read.find_by_id(id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn create_rejects_existing_email() {
        let (_, write) = services(seed::vereine());
        let mut v = zeta();
        v.email = "alpha@acme.de".into();
        let err = write.create(v).unwrap_err();
        assert!(matches!(err, CoreError::EmailExists(e) if e == "alpha@acme.de"));
    }

    #[test]
    fn create_reports_all_violations() {
        let (_, write) = services(seed::vereine());
        let mut v = zeta();
        v.name = "zeta".into();
        v.kategorie = 10;
        let CoreError::ConstraintViolations(violations) = write.create(v).unwrap_err() else {
            panic!("expected constraint violations");
        };
        let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "kategorie"]);
    }

    #[test]
    fn update_with_own_email_succeeds() {
        let (read, write) = services(seed::kunden());
        let id = Uuid::from_u128(0x40);
        let mut delta = read.find_by_id(id).unwrap();
        delta.kategorie = 8;
        delta.id = None;
        write.update(delta, id).unwrap();
        let stored = read.find_by_id(id).unwrap();
        assert_eq!(stored.kategorie, 8);
        assert_eq!(stored.id, Some(id));
    }

    #[test]
    fn update_with_foreign_email_fails() {
        let (read, write) = services(seed::kunden());
        let id = Uuid::from_u128(0x40);
        let mut delta = read.find_by_id(id).unwrap();
        delta.email = "phi@acme.cn".into();
        assert!(matches!(write.update(delta, id), Err(CoreError::EmailExists(_))));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (_, write) = services(seed::vereine());
        let err = write.update(zeta(), Uuid::from_u128(0x99)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(Lookup::Id(_))));
    }

    #[test]
    fn patch_applies_and_stores() {
        let (read, write) = services(seed::kunden());
        let id = Uuid::from_u128(0x40);
        let ops = [
            PatchOperation::new(PatchOp::Replace, "/kategorie", "2"),
            PatchOperation::new(PatchOp::Add, "/interessen", "S"),
            PatchOperation::new(PatchOp::Remove, "/interessen", "L"),
        ];
        let patched: Kunde = write.patch(id, &ops).unwrap();
        assert_eq!(patched.kategorie, 2);
        let stored = read.find_by_id(id).unwrap();
        assert_eq!(stored.interessen, Some(vec![Interesse::Reisen, Interesse::Sport]));
    }

    #[test]
    fn failed_patch_leaves_store_untouched() {
        let (read, write) = services(seed::kunden());
        let id = Uuid::from_u128(0x40);
        let before = read.find_by_id(id).unwrap();

        let invalid = [
            PatchOperation::new(PatchOp::Replace, "/kategorie", "3"),
            PatchOperation::new(PatchOp::Add, "/interessen", "L"),
        ];
        assert!(matches!(
            write.patch(id, &invalid),
            Err(CoreError::InvalidPatchOperation(_))
        ));

        let out_of_range = [PatchOperation::new(PatchOp::Replace, "/kategorie", "42")];
        assert!(matches!(
            write.patch(id, &out_of_range),
            Err(CoreError::ConstraintViolations(_))
        ));

        assert_eq!(read.find_by_id(id).unwrap(), before);
    }

    #[test]
    fn patch_unknown_id_is_not_found() {
        let (_, write) = services::<Verein>(Vec::new());
        let ops = [PatchOperation::new(PatchOp::Replace, "/name", "Neu")];
        assert!(matches!(
            write.patch(Uuid::from_u128(1), &ops),
            Err(CoreError::NotFound(_))
        ));
    }
}
