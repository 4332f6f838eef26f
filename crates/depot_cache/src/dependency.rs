//! Back-dependency entries.

use depot_classfile::{FieldInfo, MemberInfo, MethodInfo};
use depot_common::Symbol;

/// One class that depends on a given class, together with the members of
/// that class it uses.
///
/// A dependency with no members references the class only directly (as a
/// type, a superclass, a cast target, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    class_qualified_name: Symbol,
    members: Vec<MemberInfo>,
}

impl Dependency {
    /// Creates a dependency of `class_qualified_name` with no member uses yet.
    pub fn new(class_qualified_name: Symbol) -> Self {
        Self {
            class_qualified_name,
            members: Vec::new(),
        }
    }

    /// The depending (referencing) class.
    pub fn class_qualified_name(&self) -> Symbol {
        self.class_qualified_name
    }

    /// Records that the depending class uses `member`. Duplicates are kept.
    pub fn add_member_info(&mut self, member: MemberInfo) {
        self.members.push(member);
    }

    /// Members used, in the order they were added.
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Fields used.
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.members.iter().filter_map(|m| match m {
            MemberInfo::Field(f) => Some(f),
            MemberInfo::Method(_) => None,
        })
    }

    /// Methods used.
    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.members.iter().filter_map(|m| match m {
            MemberInfo::Method(m) => Some(m),
            MemberInfo::Field(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_common::{AccessFlags, SymbolTable};

    #[test]
    fn members_append_without_dedup() {
        let table = SymbolTable::new();
        let run = MethodInfo::new(table.intern("run"), table.intern("()V"), AccessFlags::PUBLIC);
        let count = FieldInfo::new(table.intern("count"), table.intern("I"), AccessFlags::PUBLIC);

        let mut dep = Dependency::new(table.intern("app.Client"));
        dep.add_member_info(run.clone().into());
        dep.add_member_info(run.into());
        dep.add_member_info(count.into());

        assert_eq!(table.resolve(dep.class_qualified_name()), "app.Client");
        assert_eq!(dep.members().len(), 3);
        assert_eq!(dep.methods().count(), 2);
        assert_eq!(dep.fields().count(), 1);
    }
}
