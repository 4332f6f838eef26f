//! Helpers for JVM type descriptors and internal names.
//!
//! The cache stores descriptors verbatim (interned); these helpers pull out the
//! pieces the dependency logic compares: a method's return type, its parameter
//! list, and the class a descriptor or array type ultimately names.

/// Converts an internal name (`java/lang/Object`) to a qualified name
/// (`java.lang.Object`).
pub fn internal_to_qualified(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Returns the return-type part of a method descriptor.
///
/// `(ILjava/lang/String;)V` yields `V`. Returns `None` if `descriptor` is not a
/// method descriptor.
pub fn method_return_type(descriptor: &str) -> Option<&str> {
    if !descriptor.starts_with('(') {
        return None;
    }
    let close = descriptor.find(')')?;
    Some(&descriptor[close + 1..])
}

/// Returns the parenthesised parameter part of a method descriptor.
///
/// `(ILjava/lang/String;)V` yields `(ILjava/lang/String;)`.
pub fn method_parameters(descriptor: &str) -> Option<&str> {
    if !descriptor.starts_with('(') {
        return None;
    }
    let close = descriptor.find(')')?;
    Some(&descriptor[..=close])
}

/// Returns the qualified class name a field descriptor refers to, looking
/// through any array dimensions.
///
/// `Ljava/util/List;` and `[[Ljava/util/List;` both yield `java.util.List`;
/// primitive types and primitive arrays yield `None`.
pub fn class_of_field_descriptor(descriptor: &str) -> Option<String> {
    let element = descriptor.trim_start_matches('[');
    let name = element.strip_prefix('L')?.strip_suffix(';')?;
    if name.is_empty() {
        return None;
    }
    Some(internal_to_qualified(name))
}

/// Returns the qualified class name named by a `CONSTANT_Class` entry.
///
/// Class entries hold either an internal name or, for array types, an array
/// descriptor. Arrays of primitives name no class.
pub fn class_of_class_entry(name: &str) -> Option<String> {
    if name.starts_with('[') {
        class_of_field_descriptor(name)
    } else if name.is_empty() {
        None
    } else {
        Some(internal_to_qualified(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_type_of_void_method() {
        assert_eq!(method_return_type("()V"), Some("V"));
    }

    #[test]
    fn return_type_of_object_method() {
        assert_eq!(
            method_return_type("(I[J)Ljava/lang/String;"),
            Some("Ljava/lang/String;")
        );
    }

    #[test]
    fn return_type_of_field_descriptor_is_none() {
        assert_eq!(method_return_type("I"), None);
    }

    #[test]
    fn parameters_exclude_return_type() {
        assert_eq!(method_parameters("(ILjava/lang/Object;)Z"), Some("(ILjava/lang/Object;)"));
        assert_eq!(method_parameters("()V"), Some("()"));
    }

    #[test]
    fn class_of_descriptor_handles_arrays() {
        assert_eq!(
            class_of_field_descriptor("[[Ljava/util/List;").as_deref(),
            Some("java.util.List")
        );
        assert_eq!(class_of_field_descriptor("[I"), None);
        assert_eq!(class_of_field_descriptor("J"), None);
    }

    #[test]
    fn class_entry_names() {
        assert_eq!(
            class_of_class_entry("com/acme/Outer$Inner").as_deref(),
            Some("com.acme.Outer$Inner")
        );
        assert_eq!(
            class_of_class_entry("[Lcom/acme/Item;").as_deref(),
            Some("com.acme.Item")
        );
        assert_eq!(class_of_class_entry("[B"), None);
    }
}
