//! A parent-pointer scope chain used only for name resolution; it never
//! holds values, unlike the runtime's own environment.

use std::cell::RefCell;
use std::collections::HashSet;

pub struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    vars: RefCell<HashSet<String>>,
    fns: RefCell<HashSet<String>>,
}

impl<'a> Scope<'a> {
    pub fn root() -> Self {
        Scope {
            parent: None,
            vars: RefCell::new(HashSet::new()),
            fns: RefCell::new(HashSet::new()),
        }
    }

    pub fn child(parent: &'a Scope<'a>) -> Self {
        Scope {
            parent: Some(parent),
            vars: RefCell::new(HashSet::new()),
            fns: RefCell::new(HashSet::new()),
        }
    }

    /// Declares `name` in this scope. Returns `false` if it was already
    /// bound in this exact scope (shadowing an outer scope is fine).
    pub fn declare_var(&self, name: String) -> bool {
        self.vars.borrow_mut().insert(name)
    }

    pub fn declare_fn(&self, name: String) -> bool {
        self.fns.borrow_mut().insert(name)
    }

    pub fn is_var_bound(&self, name: &str) -> bool {
        if self.vars.borrow().contains(name) {
            return true;
        }
        self.parent.map(|p| p.is_var_bound(name)).unwrap_or(false)
    }

    pub fn is_fn_bound(&self, name: &str) -> bool {
        if self.fns.borrow().contains(name) {
            return true;
        }
        self.parent.map(|p| p.is_fn_bound(name)).unwrap_or(false)
    }
}
