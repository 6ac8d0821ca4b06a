//! PATCH support: a small closed command set applied to one entity.
//!
//! Operations are applied in three phases regardless of their input order:
//! all `replace` ops, then all `add` ops, then all `remove` ops. The applier
//! works on the value it is given; callers pass a copy and only store it once
//! the whole batch succeeded.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::{CoreError, Entity, Interesse};

/// Kind of a PATCH operation, lower-case on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Replace a scalar value.
    Replace,
    /// Add an element to a list-valued property.
    Add,
    /// Remove an element from a list-valued property.
    Remove,
}

/// One operation, e.g. `{"op": "replace", "path": "/email", "value": "new@acme.de"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default)]
    pub value: String,
}

impl PatchOperation {
    pub fn new<P: Into<String>, V: Into<String>>(op: PatchOp, path: P, value: V) -> Self {
        Self {
            op,
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Scalar properties that `replace` can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarField {
    Name,
    Email,
    Kategorie,
    HasNewsletter,
    Homepage,
}

impl ScalarField {
    pub fn parse<E: Patchable>(path: &str) -> Option<Self> {
        match path {
            p if p == E::NAME_PATH => Some(ScalarField::Name),
            "/email" => Some(ScalarField::Email),
            "/kategorie" => Some(ScalarField::Kategorie),
            "/hasNewsletter" => Some(ScalarField::HasNewsletter),
            "/homepage" => Some(ScalarField::Homepage),
            _ => None,
        }
    }
}

/// List properties that `add` and `remove` can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListField {
    Interessen,
}

impl ListField {
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            "/interessen" => Some(ListField::Interessen),
            _ => None,
        }
    }
}

/// Entities that accept PATCH operations.
pub trait Patchable: Entity {
    /// JSON pointer of the name property, e.g. `/nachname`.
    const NAME_PATH: &'static str;

    fn set_name(&mut self, name: String);
    fn set_email(&mut self, email: String);
    fn set_kategorie(&mut self, kategorie: i32);
    fn set_has_newsletter(&mut self, has_newsletter: bool);
    fn set_homepage(&mut self, homepage: Option<Url>);
    fn interessen_mut(&mut self) -> &mut Option<Vec<Interesse>>;
}

fn invalid(op: &PatchOperation, reason: &str) -> CoreError {
    CoreError::InvalidPatchOperation(format!(
        "{:?} {} {:?}: {}",
        op.op, op.path, op.value, reason
    ))
}

/// Apply `operations` to `entity`. Fails on the first invalid operation;
/// `entity` may then be partially modified.
pub fn apply<E: Patchable>(entity: &mut E, operations: &[PatchOperation]) -> Result<(), CoreError> {
    let by_kind = |kind: PatchOp| operations.iter().filter(move |o| o.op == kind);

    let replace_ops: Vec<_> = by_kind(PatchOp::Replace).collect();
    debug!(count = replace_ops.len(), "patch: replace ops");
    for op in replace_ops {
        let field = ScalarField::parse::<E>(&op.path).ok_or_else(|| invalid(op, "unknown path"))?;
        replace(entity, field, op)?;
    }

    let add_ops: Vec<_> = by_kind(PatchOp::Add).collect();
    debug!(count = add_ops.len(), "patch: add ops");
    for op in add_ops {
        let interesse = interesse_for(op)?;
        let interessen = entity.interessen_mut().get_or_insert_with(Vec::new);
        if interessen.contains(&interesse) {
            return Err(invalid(op, "value already present"));
        }
        interessen.push(interesse);
    }

    let remove_ops: Vec<_> = by_kind(PatchOp::Remove).collect();
    debug!(count = remove_ops.len(), "patch: remove ops");
    if let Some(first) = remove_ops.first() {
        let interessen = entity
            .interessen_mut()
            .as_mut()
            .ok_or_else(|| invalid(first, "no interessen to remove from"))?;
        for op in remove_ops {
            let interesse = interesse_for(op)?;
            interessen.retain(|i| *i != interesse);
        }
    }

    trace!(id = ?entity.id(), "patch applied");
    Ok(())
}

fn replace<E: Patchable>(entity: &mut E, field: ScalarField, op: &PatchOperation) -> Result<(), CoreError> {
    let value = op.value.as_str();
    match field {
        ScalarField::Name => entity.set_name(value.to_string()),
        ScalarField::Email => entity.set_email(value.to_string()),
        ScalarField::Kategorie => {
            let kategorie = value
                .trim()
                .parse::<i32>()
                .map_err(|_| invalid(op, "kategorie must be an integer"))?;
            entity.set_kategorie(kategorie);
        }
        ScalarField::HasNewsletter => {
            let flag = match value.trim() {
                "true" => true,
                "false" => false,
                _ => return Err(invalid(op, "hasNewsletter must be true or false")),
            };
            entity.set_has_newsletter(flag);
        }
        ScalarField::Homepage => {
            let homepage = if value.trim().is_empty() {
                None
            } else {
                Some(Url::parse(value.trim()).map_err(|_| invalid(op, "homepage must be a URL"))?)
            };
            entity.set_homepage(homepage);
        }
    }
    Ok(())
}

fn interesse_for(op: &PatchOperation) -> Result<Interesse, CoreError> {
    match ListField::parse(&op.path) {
        Some(ListField::Interessen) => {
            Interesse::parse(&op.value).ok_or_else(|| invalid(op, "unknown interesse"))
        }
        None => Err(invalid(op, "unsupported path")),
    }
}
