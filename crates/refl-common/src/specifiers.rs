//! Declaration and type-node modifier flags.

use serde::Serialize;

/// Modifier flags attached to a type node and to property/function/typedef events.
///
/// Encoded as a plain struct of bools rather than a `bitflags!` bitset: the set is small,
/// fixed, and every caller wants named-field access (`specifiers.is_const`), not bitwise
/// composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Specifiers {
    pub is_inline: bool,
    pub is_virtual: bool,
    pub is_constexpr: bool,
    pub is_static: bool,
    pub is_default: bool,
    pub is_const_this: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_mutable: bool,
    pub is_deleted: bool,
}

impl Specifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `spec` attribute string: one letter per set bit, in a fixed order, omitting
    /// `deleted` (it carries no letter, matching the reference emitter).
    pub fn to_spec_string(&self) -> String {
        let mut s = String::new();
        if self.is_inline {
            s.push('i');
        }
        if self.is_virtual {
            s.push('v');
        }
        if self.is_constexpr {
            s.push('x');
        }
        if self.is_static {
            s.push('s');
        }
        if self.is_default {
            s.push('d');
        }
        if self.is_const_this {
            s.push('t');
        }
        if self.is_override {
            s.push('o');
        }
        if self.is_abstract {
            s.push('a');
        }
        if self.is_const {
            s.push('c');
        }
        if self.is_volatile {
            s.push('l');
        }
        if self.is_mutable {
            s.push('m');
        }
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signedness {
    None,
    Signed,
    Unsigned,
}

impl Default for Signedness {
    fn default() -> Self {
        Signedness::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Size {
    None,
    Short,
    Long,
    LongLong,
}

impl Default for Size {
    fn default() -> Self {
        Size::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_string_follows_fixed_letter_order() {
        let mut s = Specifiers::new();
        s.is_static = true;
        s.is_const = true;
        s.is_virtual = true;
        assert_eq!(s.to_spec_string(), "vsc");
    }

    #[test]
    fn deleted_contributes_no_letter() {
        let mut s = Specifiers::new();
        s.is_deleted = true;
        s.is_mutable = true;
        assert_eq!(s.to_spec_string(), "m");
    }
}
