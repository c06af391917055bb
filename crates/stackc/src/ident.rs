//! `IdentDesc` and the arena that owns every identifier resolved during a
//! compilation, addressed by `IdentId` rather than by reference, so that
//! scopes (see `scope.rs`) can hold indices instead of borrows.

use crate::types::TypeDesc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    GlobalLocal,
    Param,
    Local,
}

#[derive(Debug, Clone)]
pub struct IdentDesc {
    pub name: String,
    pub type_desc: TypeDesc,
    pub scope_kind: ScopeKind,
    pub index: u32,
    pub built_in: bool,
    /// Byte offset assigned by the JBC backend (`JBC_TYPE_SIZES`-packed);
    /// unused by SIL, which addresses locals/params by plain index.
    pub jbc_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentId(u32);

impl IdentId {
    const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct IdentArena {
    idents: Vec<IdentDesc>,
}

impl IdentArena {
    pub fn insert(&mut self, desc: IdentDesc) -> IdentId {
        let id = IdentId::new(self.idents.len());
        self.idents.push(desc);
        id
    }

    pub fn get(&self, id: IdentId) -> &IdentDesc {
        &self.idents[id.index()]
    }

    pub fn get_mut(&mut self, id: IdentId) -> &mut IdentDesc {
        &mut self.idents[id.index()]
    }

    /// All idents in insertion order, paired with their id — backends use
    /// this to find every `GLOBAL`/`GLOBAL_LOCAL` ident for static-field
    /// emission without walking the scope tree again.
    pub fn iter(&self) -> impl Iterator<Item = (IdentId, &IdentDesc)> {
        self.idents.iter().enumerate().map(|(i, d)| (IdentId::new(i), d))
    }
}
