//! Compact representation of the GraphQL type modifiers (`!` and `[]`) wrapping a named type.
//!
//! A `Wrapping` fits in a `u16`:
//! - the highest bit tells whether the innermost named type is required,
//! - the next four bits count the list wrappers,
//! - the remaining bits hold the required flag of each list wrapper, innermost first.

mod parse;

pub use parse::parse_type;

const INNER_IS_REQUIRED: u16 = 1 << 15;
const LIST_COUNT_SHIFT: u16 = 11;
const LIST_COUNT_MASK: u16 = 0b1111 << LIST_COUNT_SHIFT;
const LIST_FLAGS_MASK: u16 = (1 << LIST_COUNT_SHIFT) - 1;

/// Deepest list nesting we can represent, `[[[[[[[[[[[Int]]]]]]]]]]]`.
pub const MAX_LIST_WRAPPINGS: usize = LIST_COUNT_SHIFT as usize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Wrapping(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListWrapping {
    ListNonNull,
    List,
}

impl ListWrapping {
    pub fn is_required(self) -> bool {
        matches!(self, ListWrapping::ListNonNull)
    }
}

impl Wrapping {
    pub const fn new(inner_is_required: bool) -> Self {
        if inner_is_required {
            Self(INNER_IS_REQUIRED)
        } else {
            Self(0)
        }
    }

    pub const fn required() -> Self {
        Self::new(true)
    }

    pub const fn nullable() -> Self {
        Self::new(false)
    }

    #[must_use]
    pub fn list(self) -> Self {
        self.wrap(ListWrapping::List)
    }

    #[must_use]
    pub fn list_non_null(self) -> Self {
        self.wrap(ListWrapping::ListNonNull)
    }

    #[must_use]
    pub fn wrap(self, list_wrapping: ListWrapping) -> Self {
        let count = self.list_count();
        assert!(count < MAX_LIST_WRAPPINGS, "Too many nested lists");
        let mut bits = (self.0 & !LIST_COUNT_MASK) | (((count + 1) as u16) << LIST_COUNT_SHIFT);
        if list_wrapping.is_required() {
            bits |= 1 << count;
        }
        Self(bits)
    }

    pub fn inner_is_required(self) -> bool {
        self.0 & INNER_IS_REQUIRED != 0
    }

    /// Whether the outermost modifier is a `!`.
    pub fn is_required(self) -> bool {
        match self.list_count() {
            0 => self.inner_is_required(),
            n => self.0 & (1 << (n - 1)) != 0,
        }
    }

    pub fn is_nullable(self) -> bool {
        !self.is_required()
    }

    pub fn is_list(self) -> bool {
        self.list_count() > 0
    }

    pub fn list_count(self) -> usize {
        ((self.0 & LIST_COUNT_MASK) >> LIST_COUNT_SHIFT) as usize
    }

    /// List wrappers from the innermost to the outermost one.
    pub fn list_wrappings(self) -> impl DoubleEndedIterator<Item = ListWrapping> + ExactSizeIterator {
        let flags = self.0 & LIST_FLAGS_MASK;
        (0..self.list_count()).map(move |i| {
            if flags & (1 << i) != 0 {
                ListWrapping::ListNonNull
            } else {
                ListWrapping::List
            }
        })
    }

    pub fn outermost_list_wrapping(self) -> Option<ListWrapping> {
        self.list_wrappings().last()
    }

    pub fn pop_outermost_list_wrapping(&mut self) -> Option<ListWrapping> {
        let list_wrapping = self.outermost_list_wrapping()?;
        let count = self.list_count();
        let flags = self.0 & LIST_FLAGS_MASK & !(1 << (count - 1));
        self.0 = (self.0 & INNER_IS_REQUIRED) | (((count - 1) as u16) << LIST_COUNT_SHIFT) | flags;
        Some(list_wrapping)
    }

    /// Wrapping of the list items if this is a list.
    pub fn without_list(self) -> Option<Wrapping> {
        let mut wrapping = self;
        wrapping.pop_outermost_list_wrapping().map(|_| wrapping)
    }

    #[must_use]
    pub fn without_non_null(self) -> Self {
        match self.list_count() {
            0 => Self(self.0 & !INNER_IS_REQUIRED),
            n => Self(self.0 & !(1 << (n - 1))),
        }
    }

    pub fn type_display<'a>(self, name: &'a str) -> impl std::fmt::Display + 'a {
        WrappingDisplay { wrapping: self, name }
    }
}

struct WrappingDisplay<'a> {
    wrapping: Wrapping,
    name: &'a str,
}

impl std::fmt::Display for WrappingDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for _ in 0..self.wrapping.list_count() {
            f.write_str("[")?;
        }
        f.write_str(self.name)?;
        if self.wrapping.inner_is_required() {
            f.write_str("!")?;
        }
        for list_wrapping in self.wrapping.list_wrappings() {
            f.write_str("]")?;
            if list_wrapping.is_required() {
                f.write_str("!")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Wrapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wrapping({})", self.type_display("?"))
    }
}
