//! Diagnostic codes and helper functions for resolution and type problems.
//!
//! Codes `R001`--`R011` cover name binding failures (duplicates, private
//! access, entry point shape, ambiguous imports, hierarchy cycles, constants,
//! final assignment). Codes `T001`--`T005` are static type problems; the
//! compile driver counts them apart from other errors.

use strand_diagnostics::{Category, Diagnostic, DiagnosticCode};
use strand_source::Span;

/// Duplicate top-level declaration within one library.
pub const R001: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 1,
};

/// Private name accessed from another library.
pub const R002: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 2,
};

/// `main` declared as a getter.
pub const R003: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 3,
};

/// `main` declared as a setter.
pub const R004: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 4,
};

/// `main` declared with parameters.
pub const R005: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 5,
};

/// `main` declared as something other than a function.
pub const R006: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 6,
};

/// Name visible through more than one import.
pub const R007: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 7,
};

/// Class is its own superclass or superinterface.
pub const R008: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 8,
};

/// Name used as a type does not denote a class.
pub const R009: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 9,
};

/// `const` variable without a constant initializer.
pub const R010: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 10,
};

/// Assignment to a final variable or a non-assignable element.
pub const R011: DiagnosticCode = DiagnosticCode {
    category: Category::Resolution,
    number: 11,
};

/// Value not assignable to the declared type.
pub const T001: DiagnosticCode = DiagnosticCode {
    category: Category::Type,
    number: 1,
};

/// Condition is not a `bool`.
pub const T002: DiagnosticCode = DiagnosticCode {
    category: Category::Type,
    number: 2,
};

/// Member not found on the static type of the receiver.
pub const T003: DiagnosticCode = DiagnosticCode {
    category: Category::Type,
    number: 3,
};

/// Unresolved identifier or type name.
pub const T004: DiagnosticCode = DiagnosticCode {
    category: Category::Type,
    number: 4,
};

/// `return` with a value in a `void` function.
pub const T005: DiagnosticCode = DiagnosticCode {
    category: Category::Type,
    number: 5,
};

/// Creates a duplicate declaration error.
pub fn error_duplicate_declaration(name: &str, span: Span, other: Span) -> Diagnostic {
    let diag = Diagnostic::error(R001, format!("duplicate top-level declaration '{name}'"), span);
    if other.file == span.file {
        diag.with_related(other, "also declared here")
    } else {
        diag.with_note(format!("'{name}' is also declared in another part of this library"))
    }
}

/// Creates an error for access to another library's private name.
pub fn error_private_access(name: &str, library: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        R002,
        format!("'{name}' is private to library '{library}'"),
        span,
    )
}

/// Creates an error for a `main` getter.
pub fn error_main_is_getter(span: Span) -> Diagnostic {
    Diagnostic::error(R003, "'main' cannot be a getter", span)
}

/// Creates an error for a `main` setter.
pub fn error_main_is_setter(span: Span) -> Diagnostic {
    Diagnostic::error(R004, "'main' cannot be a setter", span)
}

/// Creates an error for a `main` with parameters.
pub fn error_main_has_parameters(span: Span) -> Diagnostic {
    Diagnostic::error(R005, "'main' cannot have parameters", span)
}

/// Creates an error for a non-function `main`.
pub fn error_main_not_function(span: Span) -> Diagnostic {
    Diagnostic::error(R006, "'main' must be a function", span)
}

/// Creates an ambiguous import error naming the conflicting libraries.
pub fn error_ambiguous_import(name: &str, libraries: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        R007,
        format!(
            "'{name}' is imported from more than one library: {}",
            libraries.join(", ")
        ),
        span,
    )
    .with_help("use an import prefix or a show/hide combinator")
}

/// Creates a cyclic hierarchy error.
pub fn error_cyclic_hierarchy(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        R008,
        format!("'{name}' cannot be its own superclass or superinterface"),
        span,
    )
}

/// Creates an error for a type name that is not a class.
pub fn error_not_a_class(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R009, format!("'{name}' is not a class"), span)
}

/// Creates an error for a non-constant `const` initializer.
pub fn error_not_constant(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        R010,
        format!("'{name}' must be initialized with a constant value"),
        span,
    )
}

/// Creates an error for an assignment to a final element.
pub fn error_assign_final(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R011, format!("'{name}' cannot be assigned"), span)
        .with_help("final and const variables are set once")
}

/// Creates a not-assignable type warning.
pub fn warning_not_assignable(from: &str, to: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        T001,
        format!("'{from}' is not assignable to '{to}'"),
        span,
    )
}

/// Creates a non-bool condition warning.
pub fn warning_condition_not_bool(found: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        T002,
        format!("condition must be a 'bool', found '{found}'"),
        span,
    )
}

/// Creates a missing member warning.
pub fn warning_no_such_member(name: &str, ty: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        T003,
        format!("there is no member '{name}' in '{ty}'"),
        span,
    )
}

/// Creates an unresolved name warning.
pub fn warning_cannot_resolve(name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(T004, format!("cannot resolve '{name}'"), span)
}

/// Creates a warning for a value returned from a `void` function.
pub fn warning_void_return(span: Span) -> Diagnostic {
    Diagnostic::warning(T005, "a void function cannot return a value", span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_diagnostics::Severity;
    use strand_source::FileId;

    #[test]
    fn codes_display_with_prefix() {
        assert_eq!(format!("{R001}"), "R001");
        assert_eq!(format!("{R011}"), "R011");
        assert_eq!(format!("{T004}"), "T004");
    }

    #[test]
    fn type_problems_are_counted_apart() {
        let d = warning_cannot_resolve("hole", Span::DUMMY);
        assert!(d.is_type_problem());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!error_not_a_class("x", Span::DUMMY).is_type_problem());
    }

    #[test]
    fn duplicate_in_same_file_points_at_both() {
        let a = Span::new(FileId::from_raw(1), 0, 3);
        let b = Span::new(FileId::from_raw(1), 10, 13);
        let c = Span::new(FileId::from_raw(2), 0, 3);
        assert_eq!(error_duplicate_declaration("x", a, b).related.len(), 1);
        let other = error_duplicate_declaration("x", a, c);
        assert!(other.related.is_empty());
        assert_eq!(other.notes.len(), 1);
    }

    #[test]
    fn ambiguous_lists_libraries() {
        let d = error_ambiguous_import("foo", &["a.st".into(), "b.st".into()], Span::DUMMY);
        assert!(d.message.contains("a.st, b.st"));
        assert_eq!(d.help.len(), 1);
    }
}
