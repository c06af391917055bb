//! `IdentScope` as an arena of `ScopeFrame`s addressed by `ScopeId`.
//!
//! A tree of scopes holding borrowed (non-owning) back-references to parents
//! does not survive contact with `Func` checking: installing the function's
//! own ident into the *global* scope has to happen while a *child* scope (the
//! function's parameter scope) is already alive, which a borrowed-parent tree
//! cannot express without aliasing a mutable and an immutable borrow of the
//! same frame. An arena of frames addressed by index sidesteps the conflict
//! entirely: every frame lives in one `Vec` owned by `Scopes`, and parents
//! are looked up by id rather than followed by reference.

use indexmap::IndexMap;

use crate::ident::{IdentArena, IdentDesc, IdentId, ScopeKind};
use crate::types::TypeDesc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct ScopeFrame {
    parent: Option<ScopeId>,
    idents: IndexMap<String, IdentId>,
    /// Set to the enclosing function's ident on the scope that opens that
    /// function's body (its parameter scope); `None` everywhere else.
    func: Option<IdentId>,
    /// Meaningful only on the root scope: shared GLOBAL/GLOBAL_LOCAL counter.
    var_index: u32,
    /// Meaningful only on a function's own scope: PARAM ordinal counter.
    param_index: u32,
    /// Meaningful only on a function's own scope: LOCAL counter, shared by
    /// every nested block inside that function.
    local_index: u32,
}

impl ScopeFrame {
    fn root() -> Self {
        Self {
            parent: None,
            idents: IndexMap::new(),
            func: None,
            var_index: 0,
            param_index: 0,
            local_index: 0,
        }
    }

    fn child(parent: ScopeId) -> Self {
        Self {
            parent: Some(parent),
            idents: IndexMap::new(),
            func: None,
            var_index: 0,
            param_index: 0,
            local_index: 0,
        }
    }
}

#[derive(Debug)]
pub struct Scopes {
    frames: Vec<ScopeFrame>,
}

impl Scopes {
    pub fn new() -> Self {
        Self { frames: vec![ScopeFrame::root()] }
    }

    pub const fn root(&self) -> ScopeId {
        ScopeId::new(0)
    }

    pub fn new_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId::new(self.frames.len());
        self.frames.push(ScopeFrame::child(parent));
        id
    }

    /// Marks `scope` as the body scope of `func_ident` — subsequent `Param`
    /// adds into `scope` route to `ScopeKind::Param` via `curr_func`.
    pub fn set_func(&mut self, scope: ScopeId, func_ident: IdentId) {
        self.frames[scope.index()].func = Some(func_ident);
    }

    fn frame(&self, scope: ScopeId) -> &ScopeFrame {
        &self.frames[scope.index()]
    }

    /// Nearest ancestor (including `scope` itself) whose `func` is set.
    pub fn curr_func(&self, scope: ScopeId) -> Option<IdentId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let frame = self.frame(s);
            if let Some(ident) = frame.func {
                return Some(ident);
            }
            cur = frame.parent;
        }
        None
    }

    /// The scope frame whose `func` is the nearest enclosing function, i.e.
    /// the frame that owns that function's PARAM/LOCAL counters.
    fn curr_func_scope(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let frame = self.frame(s);
            if frame.func.is_some() {
                return Some(s);
            }
            cur = frame.parent;
        }
        None
    }

    /// Root scope of the whole chain.
    pub fn curr_global(&self, scope: ScopeId) -> ScopeId {
        let mut cur = scope;
        while let Some(parent) = self.frame(cur).parent {
            cur = parent;
        }
        cur
    }

    /// Looks up `name` in `scope`, then recursively in ancestors.
    pub fn get_ident(&self, scope: ScopeId, name: &str) -> Option<IdentId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let frame = self.frame(s);
            if let Some(&id) = frame.idents.get(name) {
                return Some(id);
            }
            cur = frame.parent;
        }
        None
    }

    /// Resets the root's GLOBAL/GLOBAL_LOCAL counter to 0 — called once
    /// after seeding the built-in signatures, so user globals start at 0.
    pub fn reset_root_var_index(&mut self) {
        self.frames[self.root().index()].var_index = 0;
    }

    /// Declares `name: type_desc` in `scope`. `forced_kind` lets a caller
    /// (the `Param` checker) explicitly signal `ScopeKind::Param` rather than
    /// leaving it to be inferred from nesting depth — without this, a
    /// parameter declared directly in a function's own scope would be
    /// indistinguishable from a `LOCAL` declared there.
    pub fn add_ident(
        &mut self,
        scope: ScopeId,
        name: String,
        type_desc: TypeDesc,
        built_in: bool,
        forced_kind: Option<ScopeKind>,
        idents: &mut IdentArena,
    ) -> Result<IdentId, String> {
        if self.frame(scope).idents.contains_key(&name) {
            return Err(format!("identifier '{name}' already declared in this scope"));
        }

        let in_function = self.curr_func(scope).is_some();
        let is_root = scope == self.root();

        let (scope_kind, index) = match forced_kind {
            Some(ScopeKind::Param) => {
                let func_scope = self.curr_func_scope(scope).unwrap_or(scope);
                let frame = &mut self.frames[func_scope.index()];
                let idx = frame.param_index;
                frame.param_index += 1;
                (ScopeKind::Param, idx)
            }
            _ if !in_function && is_root => {
                let frame = &mut self.frames[self.root().index()];
                let idx = frame.var_index;
                frame.var_index += 1;
                (ScopeKind::Global, idx)
            }
            _ if !in_function => {
                let frame = &mut self.frames[self.root().index()];
                let idx = frame.var_index;
                frame.var_index += 1;
                (ScopeKind::GlobalLocal, idx)
            }
            _ => {
                let func_scope = self.curr_func_scope(scope).expect("in_function implies a func scope");
                let frame = &mut self.frames[func_scope.index()];
                let idx = frame.local_index;
                frame.local_index += 1;
                (ScopeKind::Local, idx)
            }
        };

        let ident = IdentDesc { name: name.clone(), type_desc, scope_kind, index, built_in, jbc_offset: 0 };
        let id = idents.insert(ident);
        self.frames[scope.index()].idents.insert(name, id);
        Ok(id)
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDesc;

    #[test]
    fn globals_get_dense_ascending_indices() {
        let mut scopes = Scopes::new();
        let mut idents = IdentArena::default();
        let root = scopes.root();
        let a = scopes.add_ident(root, "a".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        let b = scopes.add_ident(root, "b".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        assert_eq!(idents.get(a).index, 0);
        assert_eq!(idents.get(b).index, 1);
        assert_eq!(idents.get(a).scope_kind, ScopeKind::Global);
    }

    #[test]
    fn duplicate_in_same_scope_fails() {
        let mut scopes = Scopes::new();
        let mut idents = IdentArena::default();
        let root = scopes.root();
        scopes.add_ident(root, "a".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        assert!(scopes.add_ident(root, "a".into(), TypeDesc::INT, false, None, &mut idents).is_err());
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut scopes = Scopes::new();
        let mut idents = IdentArena::default();
        let root = scopes.root();
        scopes.add_ident(root, "a".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        let child = scopes.new_child(root);
        assert!(scopes.add_ident(child, "a".into(), TypeDesc::FLOAT, false, None, &mut idents).is_ok());
    }

    #[test]
    fn params_and_locals_use_disjoint_dense_counters() {
        let mut scopes = Scopes::new();
        let mut idents = IdentArena::default();
        let root = scopes.root();
        let func_ident = scopes.add_ident(
            root,
            "f".into(),
            TypeDesc::func(TypeDesc::VOID, vec![]),
            false,
            None,
            &mut idents,
        )
        .unwrap();
        let func_scope = scopes.new_child(root);
        scopes.set_func(func_scope, func_ident);

        let p0 = scopes
            .add_ident(func_scope, "p0".into(), TypeDesc::INT, false, Some(ScopeKind::Param), &mut idents)
            .unwrap();
        let p1 = scopes
            .add_ident(func_scope, "p1".into(), TypeDesc::INT, false, Some(ScopeKind::Param), &mut idents)
            .unwrap();
        assert_eq!(idents.get(p0).index, 0);
        assert_eq!(idents.get(p1).index, 1);

        let body_scope = scopes.new_child(func_scope);
        let loc = scopes.add_ident(body_scope, "x".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        assert_eq!(idents.get(loc).scope_kind, ScopeKind::Local);
        assert_eq!(idents.get(loc).index, 0);
    }

    #[test]
    fn lookup_recurses_into_parent() {
        let mut scopes = Scopes::new();
        let mut idents = IdentArena::default();
        let root = scopes.root();
        let a = scopes.add_ident(root, "a".into(), TypeDesc::INT, false, None, &mut idents).unwrap();
        let child = scopes.new_child(root);
        assert_eq!(scopes.get_ident(child, "a"), Some(a));
        assert_eq!(scopes.get_ident(child, "nope"), None);
    }
}
